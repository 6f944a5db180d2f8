//! Observable purchase operation state.
//!
//! A purchase handler exposes one [`PurchaseOperationState`] slot. Every write
//! is pushed to registered callbacks and to `watch` receivers; new callback
//! subscribers are handed the current value first.
//!
//! # Thread Safety
//!
//! The callback registry uses `RwLock` and recovers from lock poisoning by
//! taking the inner value. Callbacks run synchronously on the task that
//! publishes, in registration order, outside of any internal lock, so a
//! callback may subscribe, unsubscribe or publish again. A panicking callback
//! is contained; later callbacks still run and the publisher is unaffected.

use paywall_lib::{AccountInfo, Package, PurchaseError};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use tokio::sync::watch;

/// Which operation a state refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Purchase,
    Restore,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Purchase => f.write_str("purchase"),
            Self::Restore => f.write_str("restore"),
        }
    }
}

/// State of the purchase handler's single operation slot.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PurchaseOperationState {
    /// Nothing running and nothing to report.
    #[default]
    Idle,
    /// An operation is running. `package` is set for purchases.
    InProgress {
        kind: OperationKind,
        package: Option<Package>,
    },
    /// The backend confirmed the operation.
    Succeeded {
        kind: OperationKind,
        info: AccountInfo,
    },
    /// The backend reported an error other than cancellation.
    Failed {
        kind: OperationKind,
        error: PurchaseError,
    },
    /// The user dismissed the store sheet.
    UserCancelled { kind: OperationKind },
    /// A restore result was acknowledged through `set_restored`.
    Restored { info: AccountInfo },
}

impl PurchaseOperationState {
    /// Operation the state refers to; `None` for `Idle`.
    pub fn kind(&self) -> Option<OperationKind> {
        match self {
            Self::Idle => None,
            Self::InProgress { kind, .. }
            | Self::Succeeded { kind, .. }
            | Self::Failed { kind, .. }
            | Self::UserCancelled { kind } => Some(*kind),
            Self::Restored { .. } => Some(OperationKind::Restore),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress { .. })
    }

    /// Check if this is a terminal state of a backend call.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Failed { .. } | Self::UserCancelled { .. }
        )
    }

    /// Account snapshot carried by the state, if any.
    pub fn account_info(&self) -> Option<&AccountInfo> {
        match self {
            Self::Succeeded { info, .. } | Self::Restored { info } => Some(info),
            _ => None,
        }
    }

    /// Error carried by the state, if any.
    pub fn error(&self) -> Option<&PurchaseError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Callback for state changes.
pub type StateCallback = Arc<dyn Fn(&PurchaseOperationState) + Send + Sync>;

/// Single-slot state holder with push notification.
pub(crate) struct StateStore {
    sender: watch::Sender<PurchaseOperationState>,
    callbacks: RwLock<Vec<(u64, StateCallback)>>,
    next_id: AtomicU64,
}

impl StateStore {
    pub(crate) fn new() -> Arc<Self> {
        let (sender, _) = watch::channel(PurchaseOperationState::Idle);
        Arc::new(Self {
            sender,
            callbacks: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    pub(crate) fn current(&self) -> PurchaseOperationState {
        self.sender.borrow().clone()
    }

    pub(crate) fn watch(&self) -> watch::Receiver<PurchaseOperationState> {
        self.sender.subscribe()
    }

    /// Register `callback`; with `replay` it first receives the current value.
    pub(crate) fn subscribe(self: &Arc<Self>, callback: StateCallback, replay: bool) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut callbacks = self.callbacks.write().unwrap_or_else(|e| e.into_inner());
            callbacks.push((id, callback.clone()));
        }

        if replay {
            notify(&callback, &self.current());
        }

        Subscription {
            store: Arc::downgrade(self),
            id: Some(id),
        }
    }

    fn unsubscribe(&self, id: u64) {
        let mut callbacks = self.callbacks.write().unwrap_or_else(|e| e.into_inner());
        callbacks.retain(|(existing, _)| *existing != id);
    }

    /// Replace the slot and notify every observer before returning.
    pub(crate) fn publish(&self, state: PurchaseOperationState) {
        self.sender.send_replace(state.clone());

        let callbacks: Vec<StateCallback> = {
            let callbacks = self.callbacks.read().unwrap_or_else(|e| e.into_inner());
            callbacks.iter().map(|(_, cb)| cb.clone()).collect()
        };
        for callback in callbacks {
            notify(&callback, &state);
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.callbacks.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn notify(callback: &StateCallback, state: &PurchaseOperationState) {
    if panic::catch_unwind(AssertUnwindSafe(|| callback(state))).is_err() {
        #[cfg(feature = "tracing")]
        tracing::warn!(?state, "state callback panicked");
    }
}

/// Registration of a state callback.
///
/// Dropping the subscription or calling [`Subscription::unsubscribe`] detaches
/// the callback; later state changes are not delivered to it.
pub struct Subscription {
    store: Weak<StateStore>,
    id: Option<u64>,
}

impl Subscription {
    /// Detach the callback. Calling this more than once is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some(id) = self.id.take() {
            if let Some(store) = self.store.upgrade() {
                store.unsubscribe(id);
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.id.is_some() && self.store.strong_count() > 0
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish()
    }
}
