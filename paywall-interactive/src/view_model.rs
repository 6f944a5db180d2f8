//! Package selection state driving a paywall template.

use crate::{PurchaseHandler, Result};
use paywall_lib::{
    AccountInfo, IntroEligibilityProvider, IntroEligibilityStatus, Offering, Package, PackageId,
    PurchaseError,
};
use std::collections::HashMap;

/// What a mounted paywall needs: the offering, the selected package, intro
/// eligibility per package and the shared purchase handler.
#[derive(Clone)]
pub struct PaywallViewModel {
    offering: Offering,
    handler: PurchaseHandler,
    selected: Option<PackageId>,
    eligibility: HashMap<PackageId, IntroEligibilityStatus>,
}

impl PaywallViewModel {
    /// Build a view model with the offering's default package selected.
    pub fn new(offering: Offering, handler: PurchaseHandler) -> Self {
        let selected = offering.default_package().map(|p| p.id.clone());
        Self {
            offering,
            handler,
            selected,
            eligibility: HashMap::new(),
        }
    }

    pub fn offering(&self) -> &Offering {
        &self.offering
    }

    pub fn packages(&self) -> &[Package] {
        &self.offering.packages
    }

    pub fn handler(&self) -> &PurchaseHandler {
        &self.handler
    }

    /// Select the package with `id`.
    ///
    /// Unknown ids leave the selection unchanged and yield
    /// [`PurchaseError::ProductUnavailable`].
    pub fn select(&mut self, id: &PackageId) -> Result<()> {
        if self.offering.package(id).is_none() {
            return Err(PurchaseError::product_unavailable(id.as_str()));
        }
        self.selected = Some(id.clone());
        Ok(())
    }

    pub fn selected_package(&self) -> Option<&Package> {
        self.selected
            .as_ref()
            .and_then(|id| self.offering.package(id))
    }

    pub fn is_selected(&self, id: &PackageId) -> bool {
        self.selected.as_ref() == Some(id)
    }

    /// Ask `provider` about every package in the offering.
    ///
    /// Packages without an intro offer resolve to `NoIntroOfferExists`; a
    /// failed lookup leaves the remaining packages `Unknown`.
    pub async fn load_eligibility(&mut self, provider: &dyn IntroEligibilityProvider) {
        let fetched = match provider.check_eligibility(&self.offering.packages).await {
            Ok(fetched) => fetched,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("intro eligibility unavailable: {}", _err);
                HashMap::new()
            }
        };

        self.eligibility = self
            .offering
            .packages
            .iter()
            .map(|package| {
                let status = if package.has_intro_offer() {
                    fetched.get(&package.id).copied().unwrap_or_default()
                } else {
                    IntroEligibilityStatus::NoIntroOfferExists
                };
                (package.id.clone(), status)
            })
            .collect();
    }

    pub fn intro_eligibility(&self, id: &PackageId) -> IntroEligibilityStatus {
        self.eligibility.get(id).copied().unwrap_or_default()
    }

    /// Whether the intro offer copy should be shown for `id`.
    pub fn shows_intro_offer(&self, id: &PackageId) -> bool {
        let has_offer = self
            .offering
            .package(id)
            .is_some_and(|package| package.has_intro_offer());
        has_offer && self.intro_eligibility(id).is_eligible()
    }

    /// Purchase the selected package.
    pub async fn purchase_selected(&self) -> Result<AccountInfo> {
        let package = self
            .selected_package()
            .cloned()
            .ok_or_else(|| PurchaseError::product_unavailable("no package selected"))?;
        self.handler.purchase(&package).await
    }

    pub async fn restore(&self) -> Result<AccountInfo> {
        self.handler.restore_purchases().await
    }

    /// Confirm a restore result after the user saw it.
    pub fn acknowledge_restore(&self, info: AccountInfo) {
        self.handler.set_restored(info);
    }

    /// Purchase and restore buttons are disabled while this is true.
    pub fn is_action_in_progress(&self) -> bool {
        self.handler.is_busy()
    }
}

impl std::fmt::Debug for PaywallViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaywallViewModel")
            .field("offering", &self.offering.id)
            .field("selected", &self.selected)
            .field("eligibility", &self.eligibility)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PurchaseOperationState;
    use paywall_lib::test_utils::{MockBackend, StaticEligibilityProvider, TestFixtures};
    use std::sync::Arc;

    fn view_model() -> (PaywallViewModel, Arc<MockBackend>) {
        let backend = Arc::new(MockBackend::new());
        let handler = PurchaseHandler::new(backend.clone());
        (PaywallViewModel::new(TestFixtures::offering(), handler), backend)
    }

    #[test]
    fn test_default_selection() {
        let (vm, _) = view_model();
        assert_eq!(
            vm.selected_package().map(|p| p.id.clone()),
            Some(TestFixtures::monthly_package().id)
        );
    }

    #[test]
    fn test_select_unknown_package() {
        let (mut vm, _) = view_model();
        let err = vm.select(&PackageId::new("$rc_weekly")).unwrap_err();
        assert_eq!(err, PurchaseError::product_unavailable("$rc_weekly"));
        assert!(vm.is_selected(&TestFixtures::monthly_package().id));

        vm.select(&TestFixtures::annual_package().id).unwrap();
        assert!(vm.is_selected(&TestFixtures::annual_package().id));
    }

    #[tokio::test]
    async fn test_load_eligibility() {
        let (mut vm, _) = view_model();
        let annual = TestFixtures::annual_package().id;
        let monthly = TestFixtures::monthly_package().id;
        let provider = StaticEligibilityProvider::new()
            .with_status(annual.clone(), IntroEligibilityStatus::Eligible);

        vm.load_eligibility(&provider).await;

        assert_eq!(vm.intro_eligibility(&annual), IntroEligibilityStatus::Eligible);
        assert!(vm.shows_intro_offer(&annual));
        assert_eq!(
            vm.intro_eligibility(&monthly),
            IntroEligibilityStatus::NoIntroOfferExists
        );
        assert!(!vm.shows_intro_offer(&monthly));
    }

    #[tokio::test]
    async fn test_failed_eligibility_is_unknown() {
        let (mut vm, _) = view_model();
        let provider =
            StaticEligibilityProvider::new().failing(PurchaseError::Network("offline".into()));

        vm.load_eligibility(&provider).await;

        let annual = TestFixtures::annual_package().id;
        assert_eq!(vm.intro_eligibility(&annual), IntroEligibilityStatus::Unknown);
        assert!(!vm.shows_intro_offer(&annual));
    }

    #[tokio::test]
    async fn test_purchase_selected_uses_selection() {
        let (mut vm, backend) = view_model();
        let lifetime = TestFixtures::lifetime_package().id;
        vm.select(&lifetime).unwrap();

        vm.purchase_selected().await.unwrap();
        assert_eq!(backend.purchased(), vec![lifetime]);
        assert!(!vm.is_action_in_progress());
    }

    #[tokio::test]
    async fn test_restore_and_acknowledge() {
        let (vm, backend) = view_model();
        let info = vm.restore().await.unwrap();
        assert_eq!(backend.restore_calls(), 1);

        vm.acknowledge_restore(info.clone());
        assert_eq!(
            vm.handler().state(),
            PurchaseOperationState::Restored { info }
        );
    }
}
