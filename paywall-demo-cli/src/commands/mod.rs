//! CLI command implementations

pub mod init_config;
pub mod offering;
pub mod present;

use crate::config::DemoConfig;
use clap::ValueEnum;
use paywall_lib::test_utils::{MockAccountFetcher, MockBackend, StaticEligibilityProvider};
use paywall_lib::{
    AccountInfoFetcher, IntroEligibilityCache, IntroEligibilityProvider, IntroEligibilityStatus,
    PurchaseError,
};
use std::sync::Arc;
use std::time::Duration;

/// Store failure to simulate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FailureMode {
    /// Connection lost while talking to the store
    Network,
    /// Store rejected the payment
    Store,
    /// Product not available in this storefront
    Unavailable,
    /// User dismissed the purchase sheet
    Cancel,
}

impl FailureMode {
    pub fn error(&self, product_id: &str) -> PurchaseError {
        match self {
            Self::Network => PurchaseError::Network("connection reset by store".to_string()),
            Self::Store => PurchaseError::StoreProblem("payment declined".to_string()),
            Self::Unavailable => PurchaseError::product_unavailable(product_id),
            Self::Cancel => PurchaseError::UserCancelled,
        }
    }
}

/// Simulated store backend honoring the configured latency.
pub fn backend(
    config: &DemoConfig,
    failure: Option<FailureMode>,
    delay_ms: Option<u64>,
    product_id: &str,
) -> MockBackend {
    let backend = match failure {
        Some(mode) => MockBackend::failing(mode.error(product_id)),
        None => MockBackend::new(),
    };
    backend.with_delay(Duration::from_millis(delay_ms.unwrap_or(config.store_delay_ms)))
}

/// Simulated account lookup.
pub fn fetcher(config: &DemoConfig, entitled: bool) -> Arc<dyn AccountInfoFetcher> {
    if config.account_lookup_fails {
        Arc::new(MockAccountFetcher::failing(PurchaseError::Network(
            "account lookup timed out".to_string(),
        )))
    } else {
        Arc::new(MockAccountFetcher::returning(config.account(entitled)))
    }
}

/// Cached eligibility answers for the configured packages.
pub fn eligibility(config: &DemoConfig) -> Arc<dyn IntroEligibilityProvider> {
    let provider = config
        .offering
        .packages
        .iter()
        .filter(|package| package.has_intro_offer())
        .fold(StaticEligibilityProvider::new(), |provider, package| {
            let status = if config.eligible_packages.contains(&package.id) {
                IntroEligibilityStatus::Eligible
            } else {
                IntroEligibilityStatus::Ineligible
            };
            provider.with_status(package.id.clone(), status)
        });
    Arc::new(IntroEligibilityCache::new(Arc::new(provider)))
}

/// Human readable eligibility label.
pub fn describe_eligibility(status: IntroEligibilityStatus) -> &'static str {
    match status {
        IntroEligibilityStatus::Unknown => "unknown",
        IntroEligibilityStatus::Eligible => "eligible",
        IntroEligibilityStatus::Ineligible => "not eligible",
        IntroEligibilityStatus::NoIntroOfferExists => "no intro offer",
    }
}
