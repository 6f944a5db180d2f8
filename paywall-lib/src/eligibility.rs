//! Introductory offer eligibility.
//!
//! Eligibility is computed outside the purchase flow by an
//! [`IntroEligibilityProvider`] and only consumed for display gating. The
//! [`IntroEligibilityCache`] decorator keeps per-package results so repeated
//! paywall presentations do not hit the store again.
//!
//! # Thread Safety
//!
//! The cache uses `RwLock` and recovers from lock poisoning by taking the
//! inner value.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{Package, PackageId, Result};

/// Whether the user qualifies for a package's introductory price.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntroEligibilityStatus {
    /// Not determined (yet, or the lookup failed).
    #[default]
    Unknown,
    Eligible,
    Ineligible,
    /// The product has no introductory offer.
    NoIntroOfferExists,
}

impl IntroEligibilityStatus {
    /// Only a positive answer shows intro pricing.
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }

    /// Whether the value is final and worth caching.
    pub fn is_determined(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

/// Capability producing eligibility per package.
#[async_trait]
pub trait IntroEligibilityProvider: Send + Sync {
    /// Determine eligibility for `packages`.
    ///
    /// Packages missing from the returned map are treated as
    /// [`IntroEligibilityStatus::Unknown`].
    async fn check_eligibility(
        &self,
        packages: &[Package],
    ) -> Result<HashMap<PackageId, IntroEligibilityStatus>>;
}

/// Caching decorator over an eligibility provider.
pub struct IntroEligibilityCache {
    provider: Arc<dyn IntroEligibilityProvider>,
    cache: RwLock<HashMap<PackageId, IntroEligibilityStatus>>,
}

impl IntroEligibilityCache {
    /// Create an empty cache in front of `provider`.
    pub fn new(provider: Arc<dyn IntroEligibilityProvider>) -> Self {
        Self {
            provider,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Cached status for a package, if any.
    pub fn cached(&self, id: &PackageId) -> Option<IntroEligibilityStatus> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache.get(id).copied()
    }

    /// Resolve eligibility for every package, querying the provider only for
    /// packages that have an intro offer and no cached answer.
    ///
    /// Provider failures degrade to `Unknown` and are not cached.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, packages), fields(count = packages.len())))]
    pub async fn eligibility(
        &self,
        packages: &[Package],
    ) -> HashMap<PackageId, IntroEligibilityStatus> {
        let mut resolved = HashMap::with_capacity(packages.len());
        let mut missing = Vec::new();

        for package in packages {
            if !package.has_intro_offer() {
                resolved.insert(package.id.clone(), IntroEligibilityStatus::NoIntroOfferExists);
            } else if let Some(status) = self.cached(&package.id) {
                resolved.insert(package.id.clone(), status);
            } else {
                missing.push(package.clone());
            }
        }

        if missing.is_empty() {
            return resolved;
        }

        let fetched = match self.provider.check_eligibility(&missing).await {
            Ok(fetched) => fetched,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("intro eligibility lookup failed: {}", _err);
                HashMap::new()
            }
        };

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        for package in missing {
            let status = fetched.get(&package.id).copied().unwrap_or_default();
            if status.is_determined() {
                cache.insert(package.id.clone(), status);
            }
            resolved.insert(package.id, status);
        }

        resolved
    }

    /// Drop all cached answers, e.g. after the user changed.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.clear();
    }
}

#[async_trait]
impl IntroEligibilityProvider for IntroEligibilityCache {
    async fn check_eligibility(
        &self,
        packages: &[Package],
    ) -> Result<HashMap<PackageId, IntroEligibilityStatus>> {
        Ok(self.eligibility(packages).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{StaticEligibilityProvider, TestFixtures};
    use crate::PurchaseError;

    #[tokio::test]
    async fn test_packages_without_offer_skip_provider() {
        let provider = Arc::new(StaticEligibilityProvider::new());
        let cache = IntroEligibilityCache::new(provider.clone());

        let monthly = TestFixtures::monthly_package();
        let result = cache.eligibility(std::slice::from_ref(&monthly)).await;

        assert_eq!(
            result.get(&monthly.id),
            Some(&IntroEligibilityStatus::NoIntroOfferExists)
        );
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_results_are_cached() {
        let annual = TestFixtures::annual_package();
        let provider = Arc::new(
            StaticEligibilityProvider::new().with_status(annual.id.clone(), IntroEligibilityStatus::Eligible),
        );
        let cache = IntroEligibilityCache::new(provider.clone());

        let first = cache.eligibility(std::slice::from_ref(&annual)).await;
        let second = cache.eligibility(std::slice::from_ref(&annual)).await;

        assert_eq!(first, second);
        assert!(first[&annual.id].is_eligible());
        assert_eq!(provider.calls(), 1);
        assert_eq!(cache.cached(&annual.id), Some(IntroEligibilityStatus::Eligible));

        cache.invalidate();
        assert_eq!(cache.cached(&annual.id), None);
        cache.eligibility(std::slice::from_ref(&annual)).await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_is_not_cached() {
        let annual = TestFixtures::annual_package();
        let provider = Arc::new(StaticEligibilityProvider::new());
        let cache = IntroEligibilityCache::new(provider.clone());

        let result = cache.eligibility(std::slice::from_ref(&annual)).await;
        assert_eq!(result[&annual.id], IntroEligibilityStatus::Unknown);
        assert_eq!(cache.cached(&annual.id), None);
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_unknown() {
        let annual = TestFixtures::annual_package();
        let provider = Arc::new(
            StaticEligibilityProvider::new()
                .failing(PurchaseError::Network("offline".into())),
        );
        let cache = IntroEligibilityCache::new(provider);

        let result = cache.check_eligibility(std::slice::from_ref(&annual)).await.unwrap();
        assert_eq!(result[&annual.id], IntroEligibilityStatus::Unknown);
    }

    #[test]
    fn test_status_helpers() {
        assert!(IntroEligibilityStatus::Eligible.is_eligible());
        assert!(!IntroEligibilityStatus::NoIntroOfferExists.is_eligible());
        assert!(!IntroEligibilityStatus::Unknown.is_determined());
        assert_eq!(IntroEligibilityStatus::default(), IntroEligibilityStatus::Unknown);
    }
}
