//! Paywall library.
//!
//! This crate holds the data model shared by every paywall component and the
//! trait seams through which the commerce backend is reached. It stays
//! stateless; the purchase state machine lives in `paywall-interactive`.
//!
//! # Features
//!
//! - **Data model**: packages, offerings and account snapshots
//! - **Error taxonomy**: [`PurchaseError`] with stable codes for FFI callers
//! - **Backend seams**: [`CommerceBackend`] and [`AccountInfoFetcher`]
//! - **Intro eligibility**: provider trait plus a per-package cache
//!
//! # Example
//!
//! ```
//! use paywall_lib::{Offering, Package, PackageType, Price};
//!
//! let monthly = Package::new("$rc_monthly", "pro_monthly", PackageType::Monthly, Price::new(4_990_000, "USD"));
//! let offering = Offering::new("default", "Standard paywall", vec![monthly]);
//!
//! assert_eq!(offering.default_package().unwrap().id.as_str(), "$rc_monthly");
//! ```

pub mod account;
pub mod backend;
pub mod config;
pub mod eligibility;
pub mod errors;
pub mod offering;

/// Mock backends and fixtures for integration testing.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use account::{AccountInfo, EntitlementInfo};
pub use backend::{AccountInfoFetcher, CommerceBackend};
pub use config::HandlerConfig;
pub use eligibility::{IntroEligibilityCache, IntroEligibilityProvider, IntroEligibilityStatus};
pub use errors::{PurchaseError, PurchaseErrorCode};
pub use offering::{IntroOffer, Offering, Package, PackageType, Price};

/// Common result alias for paywall operations.
pub type Result<T> = std::result::Result<T, PurchaseError>;

/// Stable identifier of a package inside an offering.
///
/// # Example
///
/// ```
/// use paywall_lib::PackageId;
///
/// let id: PackageId = "$rc_annual".into();
/// assert_eq!(id.as_str(), "$rc_annual");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct PackageId(pub String);

impl PackageId {
    /// Create a new PackageId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the package ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PackageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PackageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fetches the current account snapshot through the injected fetcher.
///
/// Errors are passed through untouched; callers decide what a failed fetch
/// means for them.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(fetcher)))]
pub async fn fetch_account_info<F>(fetcher: &F) -> Result<AccountInfo>
where
    F: AccountInfoFetcher + ?Sized,
{
    let result = fetcher.fetch_account_info().await;

    #[cfg(feature = "tracing")]
    if let Err(err) = &result {
        tracing::warn!("account info fetch failed: {err}");
    }

    result
}
