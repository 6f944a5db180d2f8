//! Property-based tests for the purchase flow
//!
//! These tests use proptest to check callback routing across arbitrary
//! sequences of store outcomes.


use mock_implementations::{
    unentitled_config, CallbackEvent, CallbackRecorder, RecordingHost, ScriptedBackend,
};
use paywall_interactive::{present_if_needed, PresentationDecision, PurchaseHandler};
use paywall_lib::test_utils::{MockOutcome, TestFixtures};
use paywall_lib::PurchaseError;
use proptest::prelude::*;
use std::sync::Arc;

fn purchase_error() -> impl Strategy<Value = PurchaseError> {
    prop_oneof![
        Just(PurchaseError::UserCancelled),
        "[a-z ]{0,16}".prop_map(PurchaseError::StoreProblem),
        "[a-z ]{0,16}".prop_map(PurchaseError::Network),
        "[a-z_]{1,12}".prop_map(|id| PurchaseError::ProductUnavailable { product_id: id }),
        "[a-z ]{0,16}".prop_map(PurchaseError::Unknown),
    ]
}

fn outcome() -> impl Strategy<Value = MockOutcome> {
    prop_oneof![
        1 => Just(MockOutcome::Succeed),
        3 => purchase_error().prop_map(MockOutcome::Fail),
    ]
}

/// Callbacks a paywall should report for `outcomes`, one purchase per outcome.
fn expected_events(outcomes: &[MockOutcome]) -> Vec<CallbackEvent> {
    let mut events = Vec::new();
    for outcome in outcomes {
        events.push(CallbackEvent::PurchaseStarted);
        match outcome {
            MockOutcome::Succeed => {
                events.push(CallbackEvent::PurchaseCompleted(
                    TestFixtures::entitled_account(&TestFixtures::monthly_package().product_id),
                ));
                events.push(CallbackEvent::Dismissed);
                break;
            }
            MockOutcome::Fail(PurchaseError::UserCancelled) => {}
            MockOutcome::Fail(err) => events.push(CallbackEvent::PurchaseFailure(err.clone())),
        }
    }
    events
}

proptest! {
    /// Each purchase reports started, then at most one terminal callback; the
    /// first success dismisses and later purchases are not reported.
    #[test]
    fn purchase_callbacks_follow_outcomes(outcomes in prop::collection::vec(outcome(), 1..8)) {
        let (events, successes, dismissed) = tokio_test::block_on(async {
            let handler = PurchaseHandler::new(Arc::new(ScriptedBackend::new(outcomes.clone())));
            let host = RecordingHost::new();
            let recorder = CallbackRecorder::new();
            let handle = present_if_needed(
                unentitled_config(&handler).with_callbacks(recorder.callbacks()),
                host.clone(),
            );
            handle.wait_for_decision().await;

            let paywall = host.paywall().unwrap();
            let mut successes = 0;
            for _ in &outcomes {
                if paywall.purchase_selected().await.is_ok() {
                    successes += 1;
                }
            }
            (recorder.events(), successes, handle.decision() == PresentationDecision::Dismissed)
        });

        let mut expected = expected_events(&outcomes);
        // Completed snapshots carry a request date; compare variants by position.
        prop_assert_eq!(events.len(), expected.len());
        for (actual, wanted) in events.iter().zip(expected.iter_mut()) {
            if let (CallbackEvent::PurchaseCompleted(a), CallbackEvent::PurchaseCompleted(w)) = (actual, &mut *wanted) {
                *w = a.clone();
            }
        }
        prop_assert_eq!(events, expected);

        let any_success = outcomes.iter().any(|o| *o == MockOutcome::Succeed);
        prop_assert_eq!(dismissed, any_success);
        prop_assert_eq!(
            successes,
            outcomes.iter().filter(|o| **o == MockOutcome::Succeed).count()
        );
    }

    /// A restore is never reported as completed before acknowledgment, and a
    /// failed restore is reported exactly once.
    #[test]
    fn restore_reports_only_acknowledged_or_failed(outcome in outcome()) {
        let events = tokio_test::block_on(async {
            let handler = PurchaseHandler::new(Arc::new(
                ScriptedBackend::new(Vec::new()).with_restores(vec![outcome.clone()]),
            ));
            let host = RecordingHost::new();
            let recorder = CallbackRecorder::new();
            let handle = present_if_needed(
                unentitled_config(&handler).with_callbacks(recorder.callbacks()),
                host.clone(),
            );
            handle.wait_for_decision().await;

            let paywall = host.paywall().unwrap();
            let before_ack = match paywall.restore().await {
                Ok(info) => {
                    let before = recorder.events();
                    paywall.acknowledge_restore(info);
                    before
                }
                Err(_) => Vec::new(),
            };
            prop_assert!(before_ack.is_empty());
            Ok(recorder.events())
        })?;

        match outcome {
            MockOutcome::Succeed => {
                prop_assert_eq!(events.len(), 1);
                prop_assert!(matches!(events[0], CallbackEvent::RestoreCompleted(_)));
            }
            MockOutcome::Fail(PurchaseError::UserCancelled) => prop_assert!(events.is_empty()),
            MockOutcome::Fail(err) => {
                prop_assert_eq!(events, vec![CallbackEvent::RestoreFailure(err)]);
            }
        }
    }

    /// Only network errors are retryable and only cancellation counts as one.
    #[test]
    fn error_classification(err in purchase_error()) {
        prop_assert_eq!(err.is_retryable(), matches!(err, PurchaseError::Network(_)));
        prop_assert_eq!(err.is_cancellation(), err == PurchaseError::UserCancelled);
        prop_assert!(!err.message().is_empty());
    }
}
