//! Account snapshots.
//!
//! [`AccountInfo`] is an immutable value. Every fetch, purchase or restore
//! yields a new snapshot that replaces the previous one wholesale; snapshots
//! are never merged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A granted right to a feature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementInfo {
    /// Entitlement identifier (e.g., "pro").
    pub identifier: String,
    /// Product that unlocked the entitlement.
    pub product_id: String,
    /// Whether the entitlement is active as of the snapshot.
    pub is_active: bool,
    /// Expiration; `None` for lifetime entitlements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the underlying subscription renews.
    #[serde(default)]
    pub will_renew: bool,
}

impl EntitlementInfo {
    /// Create an active entitlement without an expiration.
    pub fn active(identifier: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            product_id: product_id.into(),
            is_active: true,
            expires_at: None,
            will_renew: false,
        }
    }

    /// Set the expiration date.
    pub fn with_expiration(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self.will_renew = true;
        self
    }

    /// Whether the entitlement is active at `now`.
    ///
    /// The snapshot flag wins when it says inactive; otherwise an expiration in
    /// the past deactivates it.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map_or(true, |exp| exp > now)
    }
}

/// Snapshot of a user's entitlements at fetch time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// User the snapshot belongs to.
    pub app_user_id: String,
    /// Entitlements keyed by identifier.
    #[serde(default)]
    pub entitlements: HashMap<String, EntitlementInfo>,
    /// Product identifiers of active subscriptions.
    #[serde(default)]
    pub active_subscriptions: BTreeSet<String>,
    /// When the snapshot was produced.
    pub request_date: DateTime<Utc>,
}

impl AccountInfo {
    /// Create a snapshot with no entitlements, dated now.
    pub fn new(app_user_id: impl Into<String>) -> Self {
        Self {
            app_user_id: app_user_id.into(),
            entitlements: HashMap::new(),
            active_subscriptions: BTreeSet::new(),
            request_date: Utc::now(),
        }
    }

    /// Return a new snapshot with `entitlement` granted.
    pub fn with_entitlement(mut self, entitlement: EntitlementInfo) -> Self {
        if entitlement.is_active {
            self.active_subscriptions
                .insert(entitlement.product_id.clone());
        }
        self.entitlements
            .insert(entitlement.identifier.clone(), entitlement);
        self
    }

    /// Whether `identifier` is active as of the snapshot's request date.
    pub fn has_active_entitlement(&self, identifier: &str) -> bool {
        self.entitlements
            .get(identifier)
            .is_some_and(|e| e.is_active_at(self.request_date))
    }

    /// All entitlements active as of the snapshot's request date.
    pub fn active_entitlements(&self) -> Vec<&EntitlementInfo> {
        let mut active: Vec<_> = self
            .entitlements
            .values()
            .filter(|e| e.is_active_at(self.request_date))
            .collect();
        active.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        active
    }

    /// Whether any entitlement is active.
    pub fn has_any_active_entitlement(&self) -> bool {
        !self.active_entitlements().is_empty()
    }
}
