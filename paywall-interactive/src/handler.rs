use crate::metrics::PurchaseMetrics;
use crate::state::{
    OperationKind, PurchaseOperationState, StateCallback, StateStore, Subscription,
};
use crate::Result;
use paywall_lib::{AccountInfo, CommerceBackend, HandlerConfig, Package, PurchaseError};
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Runs purchases and restores against a commerce backend and publishes their
/// progress through a single observable state slot.
///
/// Cloning is cheap; clones share the backend, the state slot and the metrics.
///
/// # Concurrency
///
/// Operations on one handler are serialized: a call waits until the previous
/// one has published its terminal state before publishing `InProgress`. The
/// per-call `Result` is authoritative; the state slot is a UI affordance.
///
/// Each call runs in a spawned tokio task, so dropping the caller's future
/// does not stop the backend call and its terminal state is still published.
#[derive(Clone)]
pub struct PurchaseHandler {
    inner: Arc<HandlerInner>,
}

struct HandlerInner {
    backend: Arc<dyn CommerceBackend>,
    config: HandlerConfig,
    store: Arc<StateStore>,
    operation_lock: Mutex<()>,
    last_account_info: RwLock<Option<AccountInfo>>,
    metrics: Arc<PurchaseMetrics>,
}

impl PurchaseHandler {
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self::with_config(backend, HandlerConfig::default())
    }

    pub fn with_config(backend: Arc<dyn CommerceBackend>, config: HandlerConfig) -> Self {
        Self {
            inner: Arc::new(HandlerInner {
                backend,
                config,
                store: StateStore::new(),
                operation_lock: Mutex::new(()),
                last_account_info: RwLock::new(None),
                metrics: Arc::new(PurchaseMetrics::new()),
            }),
        }
    }

    /// Purchase `package`.
    ///
    /// `InProgress` is published to every observer before the backend is
    /// called, and exactly one of `Succeeded`, `Failed` or `UserCancelled` is
    /// published before this returns.
    pub async fn purchase(&self, package: &Package) -> Result<AccountInfo> {
        let inner = self.inner.clone();
        let package = package.clone();

        self.spawn(OperationKind::Purchase, async move {
            let backend = inner.backend.clone();
            let timeout = inner.config.purchase_timeout();
            let target = package.clone();
            inner
                .perform(OperationKind::Purchase, Some(package), timeout, async move {
                    backend.purchase(&target).await
                })
                .await
        })
        .await
    }

    /// Restore previous purchases.
    ///
    /// A successful restore publishes `Succeeded { kind: Restore }`; the
    /// result counts as completed for observers only once it is acknowledged
    /// through [`PurchaseHandler::set_restored`].
    pub async fn restore_purchases(&self) -> Result<AccountInfo> {
        let inner = self.inner.clone();

        self.spawn(OperationKind::Restore, async move {
            let backend = inner.backend.clone();
            let timeout = inner.config.restore_timeout();
            inner
                .perform(OperationKind::Restore, None, timeout, async move {
                    backend.restore_purchases().await
                })
                .await
        })
        .await
    }

    /// Acknowledge a restore result, e.g. after the user dismissed the
    /// confirmation alert. Publishes `Restored { info }`.
    pub fn set_restored(&self, info: AccountInfo) {
        #[cfg(feature = "tracing")]
        tracing::debug!(app_user_id = %info.app_user_id, "restore acknowledged");
        self.inner.replace_account_info(info.clone());
        self.inner.metrics.record_restore_acknowledged();
        self.inner
            .store
            .publish(PurchaseOperationState::Restored { info });
    }

    /// Return the slot to `Idle` after an observer consumed a result.
    pub fn reset(&self) {
        self.inner.store.publish(PurchaseOperationState::Idle);
    }

    /// Current state.
    pub fn state(&self) -> PurchaseOperationState {
        self.inner.store.current()
    }

    /// Register a callback for state changes. The callback first receives the
    /// current state.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PurchaseOperationState) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(Arc::new(callback), true)
    }

    /// Register a callback that only receives changes made after registration.
    pub fn subscribe_changes(&self, callback: StateCallback) -> Subscription {
        self.inner.store.subscribe(callback, false)
    }

    /// Stream of states; the receiver starts at the current value.
    pub fn watch(&self) -> watch::Receiver<PurchaseOperationState> {
        self.inner.store.watch()
    }

    pub fn is_purchasing(&self) -> bool {
        matches!(
            self.state(),
            PurchaseOperationState::InProgress {
                kind: OperationKind::Purchase,
                ..
            }
        )
    }

    pub fn is_restoring(&self) -> bool {
        matches!(
            self.state(),
            PurchaseOperationState::InProgress {
                kind: OperationKind::Restore,
                ..
            }
        )
    }

    /// Whether any operation is running; paywall buttons are disabled meanwhile.
    pub fn is_busy(&self) -> bool {
        self.state().is_in_progress()
    }

    /// Latest snapshot produced by a purchase, restore or acknowledgment.
    pub fn last_account_info(&self) -> Option<AccountInfo> {
        self.inner
            .last_account_info
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn metrics(&self) -> Arc<PurchaseMetrics> {
        self.inner.metrics.clone()
    }

    async fn spawn<F>(&self, kind: OperationKind, operation: F) -> Result<AccountInfo>
    where
        F: Future<Output = Result<AccountInfo>> + Send + 'static,
    {
        match tokio::spawn(operation).await {
            Ok(result) => result,
            Err(join_err) => {
                // The task died before publishing; keep the one-terminal-state rule.
                let error = PurchaseError::Unknown(format!("{} task failed: {}", kind, join_err));
                self.inner.finish(kind, Err(error))
            }
        }
    }
}

impl HandlerInner {
    async fn perform<F>(
        &self,
        kind: OperationKind,
        package: Option<Package>,
        timeout: Option<Duration>,
        operation: F,
    ) -> Result<AccountInfo>
    where
        F: Future<Output = Result<AccountInfo>>,
    {
        let _guard = self.operation_lock.lock().await;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            %kind,
            package = ?package.as_ref().map(|p| p.id.as_str()),
            "operation started"
        );
        self.metrics.record_started(kind);
        self.store
            .publish(PurchaseOperationState::InProgress { kind, package });

        let result = match timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .unwrap_or_else(|_| {
                    Err(PurchaseError::Network(format!(
                        "{} timed out after {}s",
                        kind,
                        limit.as_secs()
                    )))
                }),
            None => operation.await,
        };

        self.finish(kind, result)
    }

    /// Publish the terminal state for `result` and hand it back.
    fn finish(&self, kind: OperationKind, result: Result<AccountInfo>) -> Result<AccountInfo> {
        let state = match &result {
            Ok(info) => {
                #[cfg(feature = "tracing")]
                tracing::info!(%kind, app_user_id = %info.app_user_id, "operation succeeded");
                self.metrics.record_succeeded(kind);
                self.replace_account_info(info.clone());
                PurchaseOperationState::Succeeded {
                    kind,
                    info: info.clone(),
                }
            }
            Err(PurchaseError::UserCancelled) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(%kind, "operation cancelled by user");
                self.metrics.record_cancelled(kind);
                PurchaseOperationState::UserCancelled { kind }
            }
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%kind, code = ?error.code(), "operation failed: {}", error);
                self.metrics.record_failed(kind);
                PurchaseOperationState::Failed {
                    kind,
                    error: error.clone(),
                }
            }
        };

        self.store.publish(state);
        result
    }

    fn replace_account_info(&self, info: AccountInfo) {
        let mut last = self
            .last_account_info
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *last = Some(info);
    }
}
