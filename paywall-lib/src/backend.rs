use async_trait::async_trait;

use crate::{AccountInfo, Package, Result};

/// Commerce backend that performs store operations.
///
/// Implementations talk to the platform store and the account service; the
/// purchase handler is the only caller and owns all state tracking.
#[async_trait]
pub trait CommerceBackend: Send + Sync {
    /// Purchases `package` and returns the refreshed account snapshot.
    ///
    /// A dismissed store sheet must resolve to [`crate::PurchaseError::UserCancelled`].
    async fn purchase(&self, package: &Package) -> Result<AccountInfo>;

    /// Re-associates prior purchases with the current account.
    async fn restore_purchases(&self) -> Result<AccountInfo>;
}

/// Source of truth for the current account snapshot.
#[async_trait]
pub trait AccountInfoFetcher: Send + Sync {
    /// Fetches a fresh snapshot.
    async fn fetch_account_info(&self) -> Result<AccountInfo>;
}
