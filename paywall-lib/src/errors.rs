//! Error types for purchase and restore operations.
//!
//! Errors are plain values (`Clone + PartialEq`) so the same error that
//! resolves a call can also be published in the observable purchase state.

/// Error codes for FFI and mobile integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PurchaseErrorCode {
    /// User dismissed the store purchase sheet
    UserCancelled = 1000,
    /// Store or backend rejected the operation
    StoreProblem = 2000,
    /// Network layer error
    Network = 3000,
    /// Product cannot be purchased
    ProductUnavailable = 4000,
    /// Unclassified backend error
    Unknown = 9999,
}

/// Failure of a purchase or restore.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseError {
    /// The user cancelled the purchase. Never surfaced to failure callbacks.
    #[error("purchase cancelled by user")]
    UserCancelled,

    /// The store or commerce backend reported a problem.
    #[error("store problem: {0}")]
    StoreProblem(String),

    /// Network failure; callers may retry.
    #[error("network error: {0}")]
    Network(String),

    /// The product is not available for purchase.
    #[error("product not available: {product_id}")]
    ProductUnavailable {
        /// Product or package identifier that was requested
        product_id: String,
    },

    /// Backend error passed through without classification.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl PurchaseError {
    /// Get the error code for FFI/mobile integration.
    pub fn code(&self) -> PurchaseErrorCode {
        match self {
            Self::UserCancelled => PurchaseErrorCode::UserCancelled,
            Self::StoreProblem(_) => PurchaseErrorCode::StoreProblem,
            Self::Network(_) => PurchaseErrorCode::Network,
            Self::ProductUnavailable { .. } => PurchaseErrorCode::ProductUnavailable,
            Self::Unknown(_) => PurchaseErrorCode::Unknown,
        }
    }

    /// Get the error message as an owned String (useful for FFI).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether this error is the user backing out rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }

    /// Returns true if retrying may succeed. No retry happens automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Create a product unavailable error.
    pub fn product_unavailable(product_id: impl Into<String>) -> Self {
        Self::ProductUnavailable {
            product_id: product_id.into(),
        }
    }

    /// Wrap any backend error as [`PurchaseError::Unknown`].
    pub fn unknown<E: std::error::Error>(err: E) -> Self {
        Self::Unknown(err.to_string())
    }
}

impl From<serde_json::Error> for PurchaseError {
    fn from(err: serde_json::Error) -> Self {
        Self::StoreProblem(format!("malformed backend response: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PurchaseError::UserCancelled.code(),
            PurchaseErrorCode::UserCancelled
        );
        assert_eq!(
            PurchaseError::product_unavailable("pro_monthly").code(),
            PurchaseErrorCode::ProductUnavailable
        );
        assert_eq!(PurchaseErrorCode::Network as i32, 3000);
    }

    #[test]
    fn test_classification() {
        assert!(PurchaseError::UserCancelled.is_cancellation());
        assert!(!PurchaseError::StoreProblem("x".into()).is_cancellation());

        assert!(PurchaseError::Network("timeout".into()).is_retryable());
        assert!(!PurchaseError::product_unavailable("p").is_retryable());
        assert!(!PurchaseError::UserCancelled.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = PurchaseError::product_unavailable("pro_annual");
        assert!(err.message().contains("pro_annual"));

        let err = PurchaseError::unknown(std::io::Error::new(
            std::io::ErrorKind::Other,
            "socket closed",
        ));
        assert_eq!(err.to_string(), "unknown error: socket closed");
    }

    #[test]
    fn test_from_serde_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PurchaseError = parse_err.into();
        assert_eq!(err.code(), PurchaseErrorCode::StoreProblem);
    }
}
