//! Test utilities for paywall components.
//!
//! This module provides mock collaborators with configurable behavior and
//! fixtures for common scenarios:
//! - [`MockBackend`]: succeeding, failing, cancelling, delayed or gated store
//! - [`MockAccountFetcher`]: fixed or failing account snapshots
//! - [`StaticEligibilityProvider`]: synchronous eligibility answers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use paywall_lib::test_utils::{MockBackend, TestFixtures};
//!
//! let backend = MockBackend::new().with_delay(Duration::from_millis(50));
//! let info = backend.purchase(&TestFixtures::monthly_package()).await?;
//! assert!(info.has_active_entitlement(TestFixtures::ENTITLEMENT));
//! ```

mod fixtures;
mod mocks;

pub use fixtures::TestFixtures;
pub use mocks::{MockAccountFetcher, MockBackend, MockOutcome, StaticEligibilityProvider};
