//! Paywall Interactive Layer
//!
//! This crate implements the purchase flow behind a paywall: the
//! [`PurchaseHandler`] state machine that runs purchases and restores against a
//! commerce backend, the [`PaywallViewModel`] a paywall template is driven by,
//! and [`present_if_needed`], which decides whether a paywall is shown at all
//! and routes its outcomes to caller callbacks.
//!
//! # Example
//!
//! ```rust,ignore
//! use paywall_interactive::{present_if_needed, PaywallCallbacks, PresentationConfig, PurchaseHandler};
//!
//! let handler = PurchaseHandler::new(backend);
//! let config = PresentationConfig::new(offering, handler.clone(), fetcher, eligibility)
//!     .requiring_entitlement("pro")
//!     .with_callbacks(
//!         PaywallCallbacks::new().on_purchase_completed(|info| println!("{}", info.app_user_id)),
//!     );
//!
//! let presentation = present_if_needed(config, host);
//! // Later, when the screen goes away:
//! presentation.dispose();
//! ```

pub mod handler;
pub mod metrics;
pub mod presentation;
pub mod state;
pub mod view_model;

pub use handler::PurchaseHandler;
pub use metrics::{MetricsSnapshot, PurchaseMetrics};
pub use presentation::{
    present_if_needed, EntitlementCheck, FetchFailurePolicy, PaywallCallbacks, PaywallHost,
    PresentationConfig, PresentationDecision, PresentationHandle,
};
pub use state::{OperationKind, PurchaseOperationState, StateCallback, Subscription};
pub use view_model::PaywallViewModel;

pub use paywall_lib::PurchaseError;

/// Result type for purchase flow operations.
pub type Result<T> = std::result::Result<T, PurchaseError>;
