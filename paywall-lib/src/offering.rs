//! Packages and offerings.
//!
//! A [`Package`] is one purchasable tier; an [`Offering`] is the curated set of
//! packages a paywall presents together. Both are immutable once built.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::PackageId;

/// Duration class of a package.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    Lifetime,
    Annual,
    SixMonth,
    ThreeMonth,
    TwoMonth,
    Monthly,
    Weekly,
    Custom,
}

impl PackageType {
    /// Human readable period label used when no display name is supplied.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Lifetime => "Lifetime",
            Self::Annual => "Annual",
            Self::SixMonth => "6 Month",
            Self::ThreeMonth => "3 Month",
            Self::TwoMonth => "2 Month",
            Self::Monthly => "Monthly",
            Self::Weekly => "Weekly",
            Self::Custom => "Custom",
        }
    }
}

/// Price of a package in the store's currency.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Price {
    /// Amount in millionths of the currency unit (store convention).
    pub amount_micros: i64,
    /// ISO 4217 currency code (e.g., "USD").
    pub currency: String,
}

impl Price {
    /// Create a new price.
    pub fn new(amount_micros: i64, currency: impl Into<String>) -> Self {
        Self {
            amount_micros,
            currency: currency.into(),
        }
    }

    /// Format as `"4.99 USD"`.
    pub fn formatted(&self) -> String {
        let cents = self.amount_micros / 10_000;
        format!("{}.{:02} {}", cents / 100, (cents % 100).abs(), self.currency)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

/// Introductory offer attached to a package (free trial or discounted period).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntroOffer {
    /// Introductory price; zero for a free trial.
    pub price: Price,
    /// Length of the introductory period in days.
    pub period_days: u32,
}

impl IntroOffer {
    /// Whether the offer is a free trial.
    pub fn is_free_trial(&self) -> bool {
        self.price.amount_micros == 0
    }
}

/// A purchasable product tier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    /// Stable key of the package.
    pub id: PackageId,
    /// Offering the package belongs to; stamped by [`Offering::new`].
    #[serde(default)]
    pub offering_id: String,
    /// Name shown on the paywall.
    pub display_name: String,
    /// Store product identifier.
    pub product_id: String,
    /// Duration class.
    pub package_type: PackageType,
    /// Regular price.
    pub price: Price,
    /// Introductory offer, if the product has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro_offer: Option<IntroOffer>,
}

impl Package {
    /// Create a package without an intro offer.
    pub fn new(
        id: impl Into<PackageId>,
        product_id: impl Into<String>,
        package_type: PackageType,
        price: Price,
    ) -> Self {
        Self {
            id: id.into(),
            offering_id: String::new(),
            display_name: package_type.label().to_string(),
            product_id: product_id.into(),
            package_type,
            price,
            intro_offer: None,
        }
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Attach an introductory offer.
    pub fn with_intro_offer(mut self, offer: IntroOffer) -> Self {
        self.intro_offer = Some(offer);
        self
    }

    /// Whether the product carries an introductory offer at all.
    pub fn has_intro_offer(&self) -> bool {
        self.intro_offer.is_some()
    }
}

/// A named set of packages presented together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    /// Offering identifier.
    pub id: String,
    /// Description configured on the server.
    pub server_description: String,
    /// Packages in display order.
    pub packages: Vec<Package>,
    /// Package selected when the paywall opens; falls back to the first one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_package_id: Option<PackageId>,
}

impl Offering {
    /// Create an offering, stamping its id onto every package.
    pub fn new(
        id: impl Into<String>,
        server_description: impl Into<String>,
        packages: Vec<Package>,
    ) -> Self {
        let id = id.into();
        let packages = packages
            .into_iter()
            .map(|mut package| {
                package.offering_id = id.clone();
                package
            })
            .collect();
        Self {
            id,
            server_description: server_description.into(),
            packages,
            default_package_id: None,
        }
    }

    /// Choose the package that is selected when the paywall opens.
    pub fn with_default_package(mut self, id: impl Into<PackageId>) -> Self {
        self.default_package_id = Some(id.into());
        self
    }

    /// Look up a package by id.
    pub fn package(&self, id: &PackageId) -> Option<&Package> {
        self.packages.iter().find(|p| &p.id == id)
    }

    /// The package selected by default.
    pub fn default_package(&self) -> Option<&Package> {
        self.default_package_id
            .as_ref()
            .and_then(|id| self.package(id))
            .or_else(|| self.packages.first())
    }

    /// Whether any package has an introductory offer.
    pub fn has_intro_offers(&self) -> bool {
        self.packages.iter().any(Package::has_intro_offer)
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monthly() -> Package {
        Package::new("$rc_monthly", "pro_monthly", PackageType::Monthly, Price::new(4_990_000, "USD"))
    }

    fn annual() -> Package {
        Package::new("$rc_annual", "pro_annual", PackageType::Annual, Price::new(39_990_000, "USD"))
            .with_intro_offer(IntroOffer {
                price: Price::new(0, "USD"),
                period_days: 7,
            })
    }

    #[test]
    fn test_price_formatting() {
        assert_eq!(Price::new(4_990_000, "USD").formatted(), "4.99 USD");
        assert_eq!(Price::new(0, "EUR").to_string(), "0.00 EUR");
        assert_eq!(Price::new(120_000_000, "JPY").formatted(), "120.00 JPY");
    }

    #[test]
    fn test_offering_stamps_packages() {
        let offering = Offering::new("default", "Standard", vec![monthly(), annual()]);
        assert!(offering.packages.iter().all(|p| p.offering_id == "default"));
    }

    #[test]
    fn test_default_package() {
        let offering = Offering::new("default", "Standard", vec![monthly(), annual()]);
        assert_eq!(offering.default_package().unwrap().id, "$rc_monthly".into());

        let offering = offering.with_default_package("$rc_annual");
        assert_eq!(offering.default_package().unwrap().id, "$rc_annual".into());

        // Unknown default falls back to the first package
        let offering = offering.with_default_package("$rc_missing");
        assert_eq!(offering.default_package().unwrap().id, "$rc_monthly".into());

        let empty = Offering::new("empty", "", vec![]);
        assert!(empty.default_package().is_none());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_intro_offers() {
        assert!(annual().intro_offer.unwrap().is_free_trial());
        assert!(!monthly().has_intro_offer());
        assert!(Offering::new("o", "", vec![monthly(), annual()]).has_intro_offers());
        assert!(!Offering::new("o", "", vec![monthly()]).has_intro_offers());
    }

    #[test]
    fn test_display_name_defaults_to_period() {
        assert_eq!(monthly().display_name, "Monthly");
        assert_eq!(monthly().with_display_name("Pro").display_name, "Pro");
    }
}
