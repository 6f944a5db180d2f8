//! Mock collaborators for purchase flow testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::TestFixtures;
use crate::{
    AccountInfo, AccountInfoFetcher, CommerceBackend, EntitlementInfo, IntroEligibilityProvider,
    IntroEligibilityStatus, Package, PackageId, PurchaseError, Result,
};

/// How a mocked store operation resolves.
#[derive(Clone, Debug, PartialEq)]
pub enum MockOutcome {
    /// Resolve with a fresh snapshot granting the test entitlement.
    Succeed,
    /// Resolve with the given error.
    Fail(PurchaseError),
}

/// Commerce backend with scripted outcomes.
///
/// Purchases resolve with a new snapshot that grants
/// [`TestFixtures::ENTITLEMENT`] through the purchased product; restores grant
/// it through `"restored_product"`.
pub struct MockBackend {
    purchase_outcome: MockOutcome,
    restore_outcome: MockOutcome,
    delay: Duration,
    gate: Option<Arc<Notify>>,
    purchases: Mutex<Vec<PackageId>>,
    restores: AtomicUsize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Backend where every operation succeeds immediately.
    pub fn new() -> Self {
        Self {
            purchase_outcome: MockOutcome::Succeed,
            restore_outcome: MockOutcome::Succeed,
            delay: Duration::ZERO,
            gate: None,
            purchases: Mutex::new(Vec::new()),
            restores: AtomicUsize::new(0),
        }
    }

    /// Backend where every operation fails with `error`.
    pub fn failing(error: PurchaseError) -> Self {
        Self::new()
            .with_purchase_outcome(MockOutcome::Fail(error.clone()))
            .with_restore_outcome(MockOutcome::Fail(error))
    }

    /// Backend where the user dismisses every store sheet.
    pub fn cancelling() -> Self {
        Self::failing(PurchaseError::UserCancelled)
    }

    /// Sleep for `delay` before resolving.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Hold every operation until [`MockBackend::release`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    pub fn with_purchase_outcome(mut self, outcome: MockOutcome) -> Self {
        self.purchase_outcome = outcome;
        self
    }

    pub fn with_restore_outcome(mut self, outcome: MockOutcome) -> Self {
        self.restore_outcome = outcome;
        self
    }

    /// Let one held operation proceed. A release before the operation starts
    /// is remembered.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// Packages passed to `purchase`, in call order.
    pub fn purchased(&self) -> Vec<PackageId> {
        self.purchases
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of restore calls.
    pub fn restore_calls(&self) -> usize {
        self.restores.load(Ordering::SeqCst)
    }

    async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }

    fn resolve(outcome: &MockOutcome, product_id: &str) -> Result<AccountInfo> {
        match outcome {
            MockOutcome::Succeed => Ok(AccountInfo::new(TestFixtures::APP_USER_ID)
                .with_entitlement(EntitlementInfo::active(TestFixtures::ENTITLEMENT, product_id))),
            MockOutcome::Fail(err) => Err(err.clone()),
        }
    }
}

#[async_trait]
impl CommerceBackend for MockBackend {
    async fn purchase(&self, package: &Package) -> Result<AccountInfo> {
        self.purchases
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(package.id.clone());
        self.wait().await;
        Self::resolve(&self.purchase_outcome, &package.product_id)
    }

    async fn restore_purchases(&self) -> Result<AccountInfo> {
        self.restores.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        Self::resolve(&self.restore_outcome, "restored_product")
    }
}

/// Account fetcher returning a replaceable scripted result.
pub struct MockAccountFetcher {
    result: Mutex<Result<AccountInfo>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockAccountFetcher {
    /// Fetcher that returns `info`.
    pub fn returning(info: AccountInfo) -> Self {
        Self {
            result: Mutex::new(Ok(info)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fetcher that fails with `error`.
    pub fn failing(error: PurchaseError) -> Self {
        Self {
            result: Mutex::new(Err(error)),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replace the snapshot returned by later fetches.
    pub fn set(&self, info: AccountInfo) {
        *self.result.lock().unwrap_or_else(|e| e.into_inner()) = Ok(info);
    }

    /// Number of fetches performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountInfoFetcher for MockAccountFetcher {
    async fn fetch_account_info(&self) -> Result<AccountInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Eligibility provider answering from a fixed table.
#[derive(Default)]
pub struct StaticEligibilityProvider {
    statuses: HashMap<PackageId, IntroEligibilityStatus>,
    failure: Option<PurchaseError>,
    calls: AtomicUsize,
}

impl StaticEligibilityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `status` for `id`.
    pub fn with_status(mut self, id: PackageId, status: IntroEligibilityStatus) -> Self {
        self.statuses.insert(id, status);
        self
    }

    /// Fail every lookup with `error`.
    pub fn failing(mut self, error: PurchaseError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Number of lookups performed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntroEligibilityProvider for StaticEligibilityProvider {
    async fn check_eligibility(
        &self,
        packages: &[Package],
    ) -> Result<HashMap<PackageId, IntroEligibilityStatus>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        Ok(packages
            .iter()
            .filter_map(|p| self.statuses.get(&p.id).map(|s| (p.id.clone(), *s)))
            .collect())
    }
}
