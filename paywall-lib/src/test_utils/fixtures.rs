//! Test fixtures and data generators.

use crate::{
    AccountInfo, EntitlementInfo, IntroOffer, Offering, Package, PackageType, Price,
};

/// Collection of commonly used test fixtures.
pub struct TestFixtures;

impl TestFixtures {
    /// Entitlement unlocked by every fixture package.
    pub const ENTITLEMENT: &'static str = "pro";

    /// User id used by fixture accounts.
    pub const APP_USER_ID: &'static str = "test_user";

    /// Monthly package without an intro offer.
    pub fn monthly_package() -> Package {
        Package::new(
            "$rc_monthly",
            "pro_monthly",
            PackageType::Monthly,
            Price::new(4_990_000, "USD"),
        )
    }

    /// Annual package with a one week free trial.
    pub fn annual_package() -> Package {
        Package::new(
            "$rc_annual",
            "pro_annual",
            PackageType::Annual,
            Price::new(39_990_000, "USD"),
        )
        .with_intro_offer(IntroOffer {
            price: Price::new(0, "USD"),
            period_days: 7,
        })
    }

    /// Lifetime package.
    pub fn lifetime_package() -> Package {
        Package::new(
            "$rc_lifetime",
            "pro_lifetime",
            PackageType::Lifetime,
            Price::new(99_990_000, "USD"),
        )
    }

    /// Offering with the monthly, annual and lifetime packages.
    pub fn offering() -> Offering {
        Offering::new(
            "default",
            "Standard paywall",
            vec![
                Self::monthly_package(),
                Self::annual_package(),
                Self::lifetime_package(),
            ],
        )
    }

    /// Account without entitlements.
    pub fn unentitled_account() -> AccountInfo {
        AccountInfo::new(Self::APP_USER_ID)
    }

    /// Account holding [`Self::ENTITLEMENT`] through `product_id`.
    pub fn entitled_account(product_id: &str) -> AccountInfo {
        AccountInfo::new(Self::APP_USER_ID)
            .with_entitlement(EntitlementInfo::active(Self::ENTITLEMENT, product_id))
    }
}
