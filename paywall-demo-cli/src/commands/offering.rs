//! Offering command - show the packages a paywall would present

use anyhow::Result;
use paywall_lib::{IntroEligibilityProvider, IntroEligibilityStatus, Package};

use crate::config::DemoConfig;
use crate::ui;

/// Print the configured offering with prices and intro eligibility
pub async fn run(config: &DemoConfig, json: bool) -> Result<()> {
    let offering = &config.offering;

    if json {
        ui::json(&serde_json::to_value(offering)?);
        return Ok(());
    }

    let eligibility = super::eligibility(config)
        .check_eligibility(&offering.packages)
        .await?;

    ui::header(&format!("Offering '{}'", offering.id));
    ui::info(&offering.server_description);
    ui::separator();

    let default_id = offering.default_package().map(|p| p.id.clone());
    for package in &offering.packages {
        let status = eligibility.get(&package.id).copied().unwrap_or_default();
        let marker = if Some(&package.id) == default_id.as_ref() {
            " (default)"
        } else {
            ""
        };
        println!("  {}{}", package.display_name, marker);
        ui::key_value("Package", package.id.as_str());
        ui::key_value("Product", &package.product_id);
        ui::key_value("Price", &package.price.formatted());
        ui::key_value("Intro offer", &intro_summary(package, status));
    }

    ui::separator();
    Ok(())
}

/// One-line intro offer summary for a package.
pub fn intro_summary(package: &Package, status: IntroEligibilityStatus) -> String {
    match &package.intro_offer {
        Some(offer) if offer.is_free_trial() => format!(
            "{}-day free trial ({})",
            offer.period_days,
            super::describe_eligibility(status)
        ),
        Some(offer) => format!(
            "{} for {} days ({})",
            offer.price.formatted(),
            offer.period_days,
            super::describe_eligibility(status)
        ),
        None => "none".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paywall_lib::PackageId;

    #[test]
    fn test_intro_summary() {
        let config = DemoConfig::default();
        let annual = config.offering.package(&PackageId::new("$rc_annual")).unwrap();
        let monthly = config.offering.package(&PackageId::new("$rc_monthly")).unwrap();

        assert_eq!(
            intro_summary(annual, IntroEligibilityStatus::Eligible),
            "7-day free trial (eligible)"
        );
        assert_eq!(
            intro_summary(monthly, IntroEligibilityStatus::NoIntroOfferExists),
            "none"
        );
    }

    #[tokio::test]
    async fn test_default_eligibility() {
        let config = DemoConfig::default();
        let statuses = crate::commands::eligibility(&config)
            .check_eligibility(&config.offering.packages)
            .await
            .unwrap();

        assert_eq!(
            statuses[&PackageId::new("$rc_annual")],
            IntroEligibilityStatus::Eligible
        );
        assert_eq!(
            statuses[&PackageId::new("$rc_lifetime")],
            IntroEligibilityStatus::NoIntroOfferExists
        );
    }
}
