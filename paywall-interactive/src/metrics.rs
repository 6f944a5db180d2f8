//! Counters for purchase and paywall activity.
//!
//! Every [`crate::PurchaseHandler`] owns a [`PurchaseMetrics`] instance;
//! presentations record against the metrics of the handler they observe.
//!
//! # Example
//!
//! ```rust
//! use paywall_interactive::metrics::PurchaseMetrics;
//! use paywall_interactive::OperationKind;
//!
//! let metrics = PurchaseMetrics::new();
//! metrics.record_started(OperationKind::Purchase);
//! metrics.record_succeeded(OperationKind::Purchase);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.purchases_succeeded, 1);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::OperationKind;

/// Collected metrics for purchase flows.
///
/// Thread-safe via atomic operations.
#[derive(Debug)]
pub struct PurchaseMetrics {
    // Purchase metrics
    purchases_started: AtomicU64,
    purchases_succeeded: AtomicU64,
    purchases_failed: AtomicU64,
    purchases_cancelled: AtomicU64,

    // Restore metrics
    restores_started: AtomicU64,
    restores_succeeded: AtomicU64,
    restores_failed: AtomicU64,
    restores_cancelled: AtomicU64,
    restores_acknowledged: AtomicU64,

    // Presentation metrics
    paywalls_presented: AtomicU64,
    paywalls_skipped: AtomicU64,
    paywalls_dismissed: AtomicU64,

    start_time: Instant,
}

impl Default for PurchaseMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PurchaseMetrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            purchases_started: AtomicU64::new(0),
            purchases_succeeded: AtomicU64::new(0),
            purchases_failed: AtomicU64::new(0),
            purchases_cancelled: AtomicU64::new(0),
            restores_started: AtomicU64::new(0),
            restores_succeeded: AtomicU64::new(0),
            restores_failed: AtomicU64::new(0),
            restores_cancelled: AtomicU64::new(0),
            restores_acknowledged: AtomicU64::new(0),
            paywalls_presented: AtomicU64::new(0),
            paywalls_skipped: AtomicU64::new(0),
            paywalls_dismissed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    // === Operation Metrics ===

    /// Record an operation entering the in-progress state.
    pub fn record_started(&self, kind: OperationKind) {
        match kind {
            OperationKind::Purchase => &self.purchases_started,
            OperationKind::Restore => &self.restores_started,
        }
        .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful operation.
    pub fn record_succeeded(&self, kind: OperationKind) {
        match kind {
            OperationKind::Purchase => &self.purchases_succeeded,
            OperationKind::Restore => &self.restores_succeeded,
        }
        .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed operation.
    pub fn record_failed(&self, kind: OperationKind) {
        match kind {
            OperationKind::Purchase => &self.purchases_failed,
            OperationKind::Restore => &self.restores_failed,
        }
        .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a user cancellation.
    pub fn record_cancelled(&self, kind: OperationKind) {
        match kind {
            OperationKind::Purchase => &self.purchases_cancelled,
            OperationKind::Restore => &self.restores_cancelled,
        }
        .fetch_add(1, Ordering::Relaxed);
    }

    /// Record an acknowledged restore.
    pub fn record_restore_acknowledged(&self) {
        self.restores_acknowledged.fetch_add(1, Ordering::Relaxed);
    }

    // === Presentation Metrics ===

    pub fn record_paywall_presented(&self) {
        self.paywalls_presented.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_paywall_skipped(&self) {
        self.paywalls_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_paywall_dismissed(&self) {
        self.paywalls_dismissed.fetch_add(1, Ordering::Relaxed);
    }

    // === Snapshot ===

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),

            purchases_started: self.purchases_started.load(Ordering::Relaxed),
            purchases_succeeded: self.purchases_succeeded.load(Ordering::Relaxed),
            purchases_failed: self.purchases_failed.load(Ordering::Relaxed),
            purchases_cancelled: self.purchases_cancelled.load(Ordering::Relaxed),

            restores_started: self.restores_started.load(Ordering::Relaxed),
            restores_succeeded: self.restores_succeeded.load(Ordering::Relaxed),
            restores_failed: self.restores_failed.load(Ordering::Relaxed),
            restores_cancelled: self.restores_cancelled.load(Ordering::Relaxed),
            restores_acknowledged: self.restores_acknowledged.load(Ordering::Relaxed),

            paywalls_presented: self.paywalls_presented.load(Ordering::Relaxed),
            paywalls_skipped: self.paywalls_skipped.load(Ordering::Relaxed),
            paywalls_dismissed: self.paywalls_dismissed.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Uptime in seconds since metrics collector was created.
    pub uptime_secs: u64,

    pub purchases_started: u64,
    pub purchases_succeeded: u64,
    pub purchases_failed: u64,
    pub purchases_cancelled: u64,

    pub restores_started: u64,
    pub restores_succeeded: u64,
    pub restores_failed: u64,
    pub restores_cancelled: u64,
    pub restores_acknowledged: u64,

    pub paywalls_presented: u64,
    pub paywalls_skipped: u64,
    pub paywalls_dismissed: u64,
}

impl MetricsSnapshot {
    /// Share of finished purchases that succeeded (0.0 to 1.0).
    ///
    /// Cancellations are not counted as finished.
    pub fn purchase_success_rate(&self) -> f64 {
        let finished = self.purchases_succeeded + self.purchases_failed;
        if finished == 0 {
            return 1.0;
        }
        self.purchases_succeeded as f64 / finished as f64
    }

    /// Purchases and restores still running when the snapshot was taken.
    pub fn in_flight(&self) -> u64 {
        let purchases_done =
            self.purchases_succeeded + self.purchases_failed + self.purchases_cancelled;
        let restores_done =
            self.restores_succeeded + self.restores_failed + self.restores_cancelled;
        self.purchases_started.saturating_sub(purchases_done)
            + self.restores_started.saturating_sub(restores_done)
    }

    /// Format as JSON for logging/monitoring.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PurchaseMetrics::new();

        metrics.record_started(OperationKind::Purchase);
        metrics.record_started(OperationKind::Purchase);
        metrics.record_succeeded(OperationKind::Purchase);
        metrics.record_cancelled(OperationKind::Purchase);
        metrics.record_started(OperationKind::Restore);
        metrics.record_failed(OperationKind::Restore);
        metrics.record_paywall_presented();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.purchases_started, 2);
        assert_eq!(snapshot.purchases_succeeded, 1);
        assert_eq!(snapshot.purchases_cancelled, 1);
        assert_eq!(snapshot.restores_failed, 1);
        assert_eq!(snapshot.paywalls_presented, 1);
        assert_eq!(snapshot.in_flight(), 0);
    }

    #[test]
    fn test_success_rate() {
        let snapshot = MetricsSnapshot {
            purchases_succeeded: 3,
            purchases_failed: 1,
            purchases_cancelled: 10,
            ..Default::default()
        };
        assert!((snapshot.purchase_success_rate() - 0.75).abs() < 0.001);
        assert_eq!(MetricsSnapshot::default().purchase_success_rate(), 1.0);
    }

    #[test]
    fn test_to_json() {
        let json = MetricsSnapshot::default().to_json();
        assert!(json.contains("purchases_started"));
    }
}
