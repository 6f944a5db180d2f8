//! Configuration for purchase handlers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for a purchase handler.
///
/// Timeouts are off by default: store sheets wait on the user, and a purchase
/// may legitimately take minutes.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Upper bound for a purchase call, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_timeout_secs: Option<u64>,

    /// Upper bound for a restore call, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_timeout_secs: Option<u64>,
}

impl HandlerConfig {
    /// Create a configuration with no timeouts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the purchase timeout.
    pub fn with_purchase_timeout(mut self, secs: u64) -> Self {
        self.purchase_timeout_secs = Some(secs);
        self
    }

    /// Set the restore timeout.
    pub fn with_restore_timeout(mut self, secs: u64) -> Self {
        self.restore_timeout_secs = Some(secs);
        self
    }

    pub fn purchase_timeout(&self) -> Option<Duration> {
        self.purchase_timeout_secs.map(Duration::from_secs)
    }

    pub fn restore_timeout(&self) -> Option<Duration> {
        self.restore_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_have_no_timeouts() {
        let config = HandlerConfig::new();
        assert!(config.purchase_timeout().is_none());
        assert!(config.restore_timeout().is_none());
    }

    #[test]
    fn test_builder() {
        let config = HandlerConfig::new()
            .with_purchase_timeout(120)
            .with_restore_timeout(30);
        assert_eq!(config.purchase_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.restore_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: HandlerConfig = serde_json::from_str(r#"{"purchase_timeout_secs": 60}"#).unwrap();
        assert_eq!(config.purchase_timeout_secs, Some(60));
        assert_eq!(config.restore_timeout_secs, None);

        let config: HandlerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HandlerConfig::default());
    }
}
