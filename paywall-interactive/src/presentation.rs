//! Conditional paywall presentation.
//!
//! [`present_if_needed`] fetches the account, asks the entitlement predicate
//! whether the user already has access and, if not, mounts a
//! [`PaywallViewModel`] on a [`PaywallHost`]. While mounted, handler state
//! changes are routed to [`PaywallCallbacks`]:
//!
//! | handler state                  | callback                       |
//! |--------------------------------|--------------------------------|
//! | `InProgress { Purchase }`      | `purchase_started`             |
//! | `Succeeded { Purchase, info }` | `purchase_completed`, dismiss  |
//! | `Failed { Purchase, error }`   | `purchase_failure`             |
//! | `Restored { info }`            | `restore_completed`            |
//! | `Failed { Restore, error }`    | `restore_failure`              |
//!
//! Every other state is ignored. A successful restore is only reported once it
//! has been acknowledged with [`crate::PurchaseHandler::set_restored`].

use crate::metrics::PurchaseMetrics;
use crate::{
    OperationKind, PaywallViewModel, PurchaseHandler, PurchaseOperationState, Subscription,
};
use paywall_lib::{
    AccountInfo, AccountInfoFetcher, IntroEligibilityProvider, Offering, PurchaseError,
};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Receives mount and unmount requests for the paywall.
///
/// `mount` is called at most once per presentation and must not dispose the
/// presentation synchronously.
pub trait PaywallHost: Send + Sync {
    fn mount(&self, paywall: PaywallViewModel);
    fn unmount(&self);
}

/// Decides whether an account already has access.
pub type EntitlementCheck = Arc<dyn Fn(&AccountInfo) -> bool + Send + Sync>;

type NotifyCallback = Arc<dyn Fn() + Send + Sync>;
type InfoCallback = Arc<dyn Fn(&AccountInfo) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&PurchaseError) + Send + Sync>;

/// Optional outcome callbacks. Each fires at most once per terminal outcome.
#[derive(Clone, Default)]
pub struct PaywallCallbacks {
    purchase_started: Option<NotifyCallback>,
    purchase_completed: Option<InfoCallback>,
    purchase_failure: Option<ErrorCallback>,
    restore_completed: Option<InfoCallback>,
    restore_failure: Option<ErrorCallback>,
    on_dismiss: Option<NotifyCallback>,
}

impl PaywallCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_purchase_started(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.purchase_started = Some(Arc::new(f));
        self
    }

    pub fn on_purchase_completed(
        mut self,
        f: impl Fn(&AccountInfo) + Send + Sync + 'static,
    ) -> Self {
        self.purchase_completed = Some(Arc::new(f));
        self
    }

    pub fn on_purchase_failure(
        mut self,
        f: impl Fn(&PurchaseError) + Send + Sync + 'static,
    ) -> Self {
        self.purchase_failure = Some(Arc::new(f));
        self
    }

    pub fn on_restore_completed(
        mut self,
        f: impl Fn(&AccountInfo) + Send + Sync + 'static,
    ) -> Self {
        self.restore_completed = Some(Arc::new(f));
        self
    }

    pub fn on_restore_failure(
        mut self,
        f: impl Fn(&PurchaseError) + Send + Sync + 'static,
    ) -> Self {
        self.restore_failure = Some(Arc::new(f));
        self
    }

    /// Called after the paywall dismissed itself following a purchase.
    pub fn on_dismiss(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_dismiss = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for PaywallCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaywallCallbacks")
            .field("purchase_started", &self.purchase_started.is_some())
            .field("purchase_completed", &self.purchase_completed.is_some())
            .field("purchase_failure", &self.purchase_failure.is_some())
            .field("restore_completed", &self.restore_completed.is_some())
            .field("restore_failure", &self.restore_failure.is_some())
            .field("on_dismiss", &self.on_dismiss.is_some())
            .finish()
    }
}

/// What to do when the account lookup fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchFailurePolicy {
    /// Treat the user as not entitled and show the paywall.
    #[default]
    PresentPaywall,
    /// Treat the user as entitled and show nothing.
    SkipPaywall,
}

/// Outcome of a presentation so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentationDecision {
    /// The account lookup has not finished yet.
    Pending,
    /// The paywall is mounted.
    Presented,
    /// The user is entitled; nothing was mounted.
    Skipped,
    /// The paywall dismissed itself after a purchase.
    Dismissed,
    /// The handle was disposed before any other outcome was final.
    Disposed,
}

impl PresentationDecision {
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending | Self::Presented)
    }
}

/// Inputs of [`present_if_needed`].
pub struct PresentationConfig {
    offering: Offering,
    handler: PurchaseHandler,
    fetcher: Arc<dyn AccountInfoFetcher>,
    eligibility: Arc<dyn IntroEligibilityProvider>,
    is_entitled: EntitlementCheck,
    callbacks: PaywallCallbacks,
    fetch_failure_policy: FetchFailurePolicy,
}

impl PresentationConfig {
    /// Present `offering` unless the account has any active entitlement.
    pub fn new(
        offering: Offering,
        handler: PurchaseHandler,
        fetcher: Arc<dyn AccountInfoFetcher>,
        eligibility: Arc<dyn IntroEligibilityProvider>,
    ) -> Self {
        Self {
            offering,
            handler,
            fetcher,
            eligibility,
            is_entitled: Arc::new(|info: &AccountInfo| info.has_any_active_entitlement()),
            callbacks: PaywallCallbacks::default(),
            fetch_failure_policy: FetchFailurePolicy::default(),
        }
    }

    /// Use a custom predicate to decide whether the user has access.
    pub fn with_entitlement_check(
        mut self,
        check: impl Fn(&AccountInfo) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_entitled = Arc::new(check);
        self
    }

    /// Present unless the entitlement `identifier` is active.
    pub fn requiring_entitlement(self, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        self.with_entitlement_check(move |info| info.has_active_entitlement(&identifier))
    }

    pub fn with_callbacks(mut self, callbacks: PaywallCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn with_fetch_failure_policy(mut self, policy: FetchFailurePolicy) -> Self {
        self.fetch_failure_policy = policy;
        self
    }
}

/// Present the paywall if the account is not entitled.
///
/// Returns immediately; the decision runs on a spawned task. Observe it with
/// [`PresentationHandle::decision`] or [`PresentationHandle::wait_for_decision`].
/// Dropping the handle does not dismiss the paywall. A failed account lookup,
/// or an entitlement check that panics, resolves per [`FetchFailurePolicy`].
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn present_if_needed(config: PresentationConfig, host: Arc<dyn PaywallHost>) -> PresentationHandle {
    let (decision, _) = watch::channel(PresentationDecision::Pending);
    let presentation = Arc::new(Presentation {
        host,
        callbacks: config.callbacks.clone(),
        metrics: config.handler.metrics(),
        disposed: AtomicBool::new(false),
        gate: DispatchGate::default(),
        mount: Mutex::new(MountState::default()),
        decision,
    });

    let task = tokio::spawn(decide(presentation.clone(), config));

    PresentationHandle {
        presentation,
        task: Mutex::new(Some(task)),
    }
}

async fn decide(presentation: Arc<Presentation>, config: PresentationConfig) {
    let entitled = match paywall_lib::fetch_account_info(config.fetcher.as_ref()).await {
        // A panicking predicate is handled like a failed lookup.
        Ok(info) => match panic::catch_unwind(AssertUnwindSafe(|| (config.is_entitled)(&info))) {
            Ok(entitled) => entitled,
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    policy = ?config.fetch_failure_policy,
                    "entitlement check panicked"
                );
                config.fetch_failure_policy == FetchFailurePolicy::SkipPaywall
            }
        },
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                policy = ?config.fetch_failure_policy,
                "account lookup failed: {}", _err
            );
            config.fetch_failure_policy == FetchFailurePolicy::SkipPaywall
        }
    };

    if entitled {
        presentation.skip();
        return;
    }

    let mut paywall = PaywallViewModel::new(config.offering, config.handler.clone());
    paywall.load_eligibility(config.eligibility.as_ref()).await;
    presentation.present(paywall, &config.handler);
}

#[derive(Default)]
struct MountState {
    mounted: bool,
    subscription: Option<Subscription>,
}

/// Serializes callback dispatch against `dispose`.
///
/// Re-entrant on the dispatching thread, so a callback may publish to the
/// handler or dispose the presentation without deadlocking.
#[derive(Default)]
struct DispatchGate {
    lock: Mutex<()>,
    owner: Mutex<Option<ThreadId>>,
}

impl DispatchGate {
    /// `None` when the current thread already holds the gate.
    fn enter(&self) -> Option<GateGuard<'_>> {
        let current = thread::current().id();
        if *self.owner() == Some(current) {
            return None;
        }
        let held = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        *self.owner() = Some(current);
        Some(GateGuard {
            gate: self,
            _held: held,
        })
    }

    fn owner(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.owner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct GateGuard<'a> {
    gate: &'a DispatchGate,
    _held: MutexGuard<'a, ()>,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        *self.gate.owner() = None;
    }
}

struct Presentation {
    host: Arc<dyn PaywallHost>,
    callbacks: PaywallCallbacks,
    metrics: Arc<PurchaseMetrics>,
    disposed: AtomicBool,
    gate: DispatchGate,
    mount: Mutex<MountState>,
    decision: watch::Sender<PresentationDecision>,
}

impl Presentation {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn lock_mount(&self) -> std::sync::MutexGuard<'_, MountState> {
        self.mount.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn skip(&self) {
        let _mount = self.lock_mount();
        if self.is_disposed() {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("account entitled, paywall skipped");
        self.metrics.record_paywall_skipped();
        self.decision.send_replace(PresentationDecision::Skipped);
    }

    fn present(self: &Arc<Self>, paywall: PaywallViewModel, handler: &PurchaseHandler) {
        let mut mount = self.lock_mount();
        if self.is_disposed() {
            return;
        }

        // Only changes made after mounting are reported; a stale terminal state
        // from an earlier paywall must not fire.
        let presentation = self.clone();
        mount.subscription = Some(
            handler.subscribe_changes(Arc::new(move |state: &PurchaseOperationState| {
                presentation.route(state)
            })),
        );
        mount.mounted = true;

        #[cfg(feature = "tracing")]
        tracing::info!(offering = %paywall.offering().id, "presenting paywall");
        self.host.mount(paywall);
        self.metrics.record_paywall_presented();
        self.decision.send_replace(PresentationDecision::Presented);
    }

    fn route(&self, state: &PurchaseOperationState) {
        let _gate = self.gate.enter();
        if self.is_disposed() {
            return;
        }

        let callbacks = &self.callbacks;
        match state {
            PurchaseOperationState::InProgress {
                kind: OperationKind::Purchase,
                ..
            } => {
                if let Some(cb) = &callbacks.purchase_started {
                    cb();
                }
            }
            PurchaseOperationState::Succeeded {
                kind: OperationKind::Purchase,
                info,
            } => {
                if let Some(cb) = &callbacks.purchase_completed {
                    cb(info);
                }
                self.dismiss();
            }
            PurchaseOperationState::Failed {
                kind: OperationKind::Purchase,
                error,
            } => {
                if let Some(cb) = &callbacks.purchase_failure {
                    cb(error);
                }
            }
            PurchaseOperationState::Restored { info } => {
                if let Some(cb) = &callbacks.restore_completed {
                    cb(info);
                }
            }
            PurchaseOperationState::Failed {
                kind: OperationKind::Restore,
                error,
            } => {
                if let Some(cb) = &callbacks.restore_failure {
                    cb(error);
                }
            }
            _ => {}
        }
    }

    fn dismiss(&self) {
        let subscription = {
            let mut mount = self.lock_mount();
            if self.is_disposed() || !mount.mounted {
                return;
            }
            mount.mounted = false;
            mount.subscription.take()
        };
        drop(subscription);

        #[cfg(feature = "tracing")]
        tracing::debug!("purchase completed, dismissing paywall");
        self.host.unmount();
        self.metrics.record_paywall_dismissed();
        self.decision.send_replace(PresentationDecision::Dismissed);

        if let Some(cb) = &self.callbacks.on_dismiss {
            cb();
        }
    }
}

/// Handle to a running presentation.
pub struct PresentationHandle {
    presentation: Arc<Presentation>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PresentationHandle {
    /// Stop the presentation: unmount the paywall if it is mounted, detach from
    /// the handler and cancel a pending account lookup. No callback fires once
    /// this returns. Calling it again is a no-op.
    ///
    /// A callback running on another thread is allowed to finish first, so
    /// this blocks for as long as that callback does. Calling it from inside a
    /// callback is fine.
    pub fn dispose(&self) {
        let presentation = &self.presentation;
        let _gate = presentation.gate.enter();
        let (subscription, was_mounted) = {
            let mut mount = presentation.lock_mount();
            if presentation.disposed.swap(true, Ordering::SeqCst) {
                return;
            }
            (mount.subscription.take(), std::mem::take(&mut mount.mounted))
        };

        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
        drop(subscription);

        if was_mounted {
            presentation.host.unmount();
        }

        presentation.decision.send_if_modified(|decision| {
            if decision.is_final() {
                return false;
            }
            *decision = PresentationDecision::Disposed;
            true
        });
        #[cfg(feature = "tracing")]
        tracing::debug!("presentation disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.presentation.is_disposed()
    }

    pub fn decision(&self) -> PresentationDecision {
        *self.presentation.decision.borrow()
    }

    /// Wait until the presentation either mounted the paywall or reached a
    /// final decision.
    pub async fn wait_for_decision(&self) -> PresentationDecision {
        let mut rx = self.presentation.decision.subscribe();
        let decided = rx
            .wait_for(|decision| *decision != PresentationDecision::Pending)
            .await
            .map(|decision| *decision);
        decided.unwrap_or(PresentationDecision::Disposed)
    }

    /// Whether the paywall is currently mounted.
    pub fn is_presented(&self) -> bool {
        self.presentation.lock_mount().mounted
    }
}

impl fmt::Debug for PresentationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentationHandle")
            .field("decision", &self.decision())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
