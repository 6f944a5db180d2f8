//! Demo configuration file

use anyhow::{Context, Result};
use paywall_lib::{
    AccountInfo, EntitlementInfo, HandlerConfig, IntroOffer, Offering, Package, PackageId,
    PackageType, Price,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the simulated store and account need, stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// User the simulated account belongs to
    pub app_user_id: String,
    /// Entitlement the paywall unlocks
    pub entitlement: String,
    /// Whether the simulated account already holds the entitlement
    pub entitled: bool,
    /// Simulate a failing account lookup
    pub account_lookup_fails: bool,
    /// Show nothing when the account lookup fails instead of failing open
    pub skip_paywall_on_lookup_failure: bool,
    /// Artificial store latency in milliseconds
    pub store_delay_ms: u64,
    /// Packages whose intro offer the user qualifies for
    pub eligible_packages: Vec<PackageId>,
    /// Purchase handler timeouts
    pub handler: HandlerConfig,
    /// Offering presented by the paywall
    pub offering: Offering,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            app_user_id: "demo_user".to_string(),
            entitlement: "pro".to_string(),
            entitled: false,
            account_lookup_fails: false,
            skip_paywall_on_lookup_failure: false,
            store_delay_ms: 800,
            eligible_packages: vec![PackageId::new("$rc_annual")],
            handler: HandlerConfig::new()
                .with_purchase_timeout(30)
                .with_restore_timeout(30),
            offering: default_offering(),
        }
    }
}

fn default_offering() -> Offering {
    Offering::new(
        "default",
        "Unlock every pro feature",
        vec![
            Package::new(
                "$rc_monthly",
                "pro_monthly",
                PackageType::Monthly,
                Price::new(4_990_000, "USD"),
            ),
            Package::new(
                "$rc_annual",
                "pro_annual",
                PackageType::Annual,
                Price::new(39_990_000, "USD"),
            )
            .with_display_name("Annual (best value)")
            .with_intro_offer(IntroOffer {
                price: Price::new(0, "USD"),
                period_days: 7,
            }),
            Package::new(
                "$rc_lifetime",
                "pro_lifetime",
                PackageType::Lifetime,
                Price::new(99_990_000, "USD"),
            ),
        ],
    )
    .with_default_package("$rc_annual")
}

impl DemoConfig {
    /// Load configuration from `path`, or the defaults if the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&contents).context("Failed to parse demo configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize demo configuration")?;
        std::fs::write(path, contents).context("Failed to write demo configuration")?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.offering.is_empty() {
            anyhow::bail!("Offering '{}' has no packages", self.offering.id);
        }
        if let Some(id) = &self.offering.default_package_id {
            if self.offering.package(id).is_none() {
                anyhow::bail!("Default package '{}' is not part of the offering", id);
            }
        }
        Ok(())
    }

    /// Snapshot the simulated account lookup returns.
    pub fn account(&self, entitled: bool) -> AccountInfo {
        let account = AccountInfo::new(self.app_user_id.clone());
        if entitled {
            account.with_entitlement(EntitlementInfo::active(
                self.entitlement.clone(),
                "pro_monthly",
            ))
        } else {
            account
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = DemoConfig::load(&temp_dir.path().join("absent.json")).unwrap();
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("paywall.json");

        let config = DemoConfig {
            entitled: true,
            store_delay_ms: 0,
            ..Default::default()
        };
        config.save(&path).unwrap();

        assert_eq!(DemoConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("paywall.json");
        std::fs::write(&path, r#"{ "entitlement": "premium" }"#).unwrap();

        let config = DemoConfig::load(&path).unwrap();
        assert_eq!(config.entitlement, "premium");
        assert_eq!(config.offering, DemoConfig::default().offering);
    }

    #[test]
    fn test_rejects_unknown_default_package() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("paywall.json");

        let mut config = DemoConfig::default();
        config.offering.default_package_id = Some(PackageId::new("$rc_weekly"));
        config.save(&path).unwrap();

        assert!(DemoConfig::load(&path).is_err());
    }

    #[test]
    fn test_account_entitlement() {
        let config = DemoConfig::default();
        assert!(config.account(true).has_active_entitlement("pro"));
        assert!(!config.account(false).has_any_active_entitlement());
    }
}
