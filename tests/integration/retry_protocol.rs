//! Retry protocol: attempt generation, stop signals and status aggregation.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use timeframe::category::{IO, TIMEOUT};
use timeframe::{Action, Event, Failure, Frame, RetryOutcome, RetryPolicy, Scoped, Status, TimeFrame};

fn staged(policy: RetryPolicy) -> (TimeFrame, Event, Action) {
    let root = TimeFrame::new("Job");
    root.enter();
    let stage = root.create_event("Stage");
    stage.enter();
    let call = stage.create_action_with("Call", policy);
    (root, stage, call)
}

fn timed_out() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "upstream too slow")
}

/// Status only ever moves up, so the action keeps the ISSUE left by its
/// failed first attempt. This settles the recovered-retry scenario, which
/// otherwise contradicts the monotonic rule, in favour of that rule: ISSUE is
/// not a failure, so the event and root still end SUCCESS.
#[test]
fn test_recovery_after_one_failure() {
    let (root, stage, call) = staged(RetryPolicy::new(2));
    let mut calls = 0;
    let outcome = call.run(|_| {
        calls += 1;
        if calls == 1 {
            Err(anyhow!("flaky"))
        } else {
            Ok("done")
        }
    });
    stage.exit(None);
    root.exit(None);

    assert_eq!(outcome, RetryOutcome::Succeeded { value: "done", attempts: 2 });
    assert_eq!(call.attempts_made(), 2);
    assert_eq!(call.status(), Status::Issue);
    assert!(!call.status().is_failure());
    assert_eq!(stage.status(), Status::Success);
    assert_eq!(root.status(), Status::Success);
    assert_eq!(root.traceback_entries().len(), 1);

    let attempts = call.attempt_list();
    assert_eq!(attempts[0].status(), Status::Failed);
    assert_eq!(attempts[1].status(), Status::Success);
}

#[test]
fn test_exhausted_budget_fails_every_level() {
    let (root, stage, call) = staged(RetryPolicy::new(2));
    let outcome = call.run(|_| Err::<(), _>(anyhow!("always down")));
    stage.exit(None);
    root.exit(None);

    assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 2 });
    assert_eq!(call.status(), Status::Failed);
    assert_eq!(stage.status(), Status::Failed);
    assert_eq!(root.status(), Status::Failed);

    let entries = root.traceback_entries();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].contains("Error raised on Attempt 'Attempt #1' in 'Job' > 'Stage' > 'Call'"));
    assert!(entries[1].contains("'Attempt #2'"));
    assert!(entries[1].contains("with status FAILED:\ngeneric: always down"));
    assert_eq!(root.traceback(), entries.join("\n"));
}

#[test]
fn test_no_attempt_after_success() {
    let (_root, _stage, call) = staged(RetryPolicy::new(3));
    let mut calls = 0;
    call.run(|_| {
        calls += 1;
        if calls < 2 {
            Err(anyhow!("once"))
        } else {
            Ok(())
        }
    });
    assert_eq!(calls, 2);
    assert_eq!(call.attempts_made(), 2);
    assert_eq!(call.attempt_list().len(), 2);
    assert!(call.attempts().next().is_none());
}

#[test]
fn test_ignored_category_stops_immediately() {
    let (_root, stage, call) = staged(RetryPolicy::new(3).ignore(&TIMEOUT));
    let outcome = call.run(|_| Err::<(), _>(timed_out()));
    stage.exit(None);

    assert_eq!(outcome, RetryOutcome::Ignored { attempts: 1 });
    let attempts = call.attempt_list();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status(), Status::Fatal);
    assert_eq!(attempts[0].note().as_deref(), Some("ignored by io.timeout"));
    assert!(attempts[0].describe().ends_with("(ignored by io.timeout)"));
    assert_eq!(call.status(), Status::Failed);
    assert_eq!(stage.status(), Status::Failed);
}

#[test]
fn test_parent_category_needs_subcategory_matching() {
    let (_root, _stage, exact) = staged(RetryPolicy::new(3).ignore(&IO));
    let outcome = exact.run(|_| Err::<(), _>(timed_out()));
    assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 3 });

    let (_root, _stage, nested) = staged(RetryPolicy::new(3).ignore(&IO).match_subcategories(true));
    let outcome = nested.run(|_| Err::<(), _>(timed_out()));
    assert_eq!(outcome, RetryOutcome::Ignored { attempts: 1 });
}

#[test]
fn test_zero_budget_runs_body_once_without_attempts() {
    let (_root, _stage, call) = staged(RetryPolicy::new(0));
    let mut runs = 0;
    let outcome = call.run(|attempt| {
        assert!(attempt.is_none());
        runs += 1;
        Ok::<_, anyhow::Error>(5)
    });
    assert_eq!(runs, 1);
    assert_eq!(outcome, RetryOutcome::RanOnce { value: 5 });
    assert_eq!(call.attempts_made(), 0);
    assert!(call.attempt_list().is_empty());
    assert_eq!(call.status(), Status::Success);
}

#[test]
fn test_zero_budget_failure_is_recorded_on_the_action() {
    let (root, stage, call) = staged(RetryPolicy::new(0));
    let mut runs = 0;
    let outcome = call.run(|_| {
        runs += 1;
        Err::<(), _>(anyhow!("no second chance"))
    });
    stage.exit(None);

    assert_eq!(runs, 1);
    assert_eq!(outcome, RetryOutcome::FailedOnce);
    assert_eq!(call.status(), Status::Failed);
    assert_eq!(stage.status(), Status::Failed);
    let entries = root.traceback_entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].contains("Error raised on Action 'Call' in 'Job' > 'Stage' with status FAILED:\ngeneric: no second chance"));
}

#[tokio::test]
async fn test_zero_budget_async_runs_body_once() {
    let (_root, _stage, call) = staged(RetryPolicy::new(0));
    let outcome = call
        .run_async(|attempt| async move {
            assert!(attempt.is_none());
            Ok::<_, anyhow::Error>("once")
        })
        .await;
    assert_eq!(outcome, RetryOutcome::RanOnce { value: "once" });
    assert_eq!(call.status(), Status::Success);
}

#[test]
fn test_manual_attempt_loop() {
    let (root, stage, call) = staged(RetryPolicy::new(3));
    call.enter();
    for attempt in call.attempts() {
        attempt.enter();
        let error = (attempt.name().to_string() == "Attempt #1").then(|| anyhow!("cold cache"));
        let signal = attempt.close(error.as_ref().map(|err| err as &dyn Failure));
        if !call.handle_signal(signal) {
            break;
        }
    }
    call.exit(None);
    stage.exit(None);
    root.exit(None);

    assert_eq!(call.attempts_made(), 2);
    assert_eq!(root.status(), Status::Success);
}

#[test]
fn test_unclosed_attempt_counts_as_success() {
    let (_root, _stage, call) = staged(RetryPolicy::new(3));
    let mut attempts = call.attempts();
    let first = attempts.next().unwrap();
    first.enter();
    assert_eq!(first.status(), Status::Loading);
    assert!(attempts.next().is_none());
    assert_eq!(first.status(), Status::Success);
}

#[test]
fn test_event_scope_records_and_swallows_errors() {
    let root = TimeFrame::new("Job");
    root.enter();
    let stage = root.create_event("Stage");
    let result = stage.scope(|_| Err::<(), _>("bad input"));
    assert!(result.is_none());
    assert_eq!(stage.status(), Status::Failed);
    assert_eq!(root.status(), Status::Failed);
    let traceback = root.traceback();
    assert!(traceback.contains("Error raised on Event 'Stage' in 'Job' with status FAILED:\ngeneric: bad input"));
}

#[test]
fn test_given_up_action_fails_its_event() {
    let root = TimeFrame::new("Job");
    root.enter();
    let stage = root.create_event("Stage");
    stage.enter();
    let broken = stage.create_action_with("Broken", RetryPolicy::new(1));
    broken.run(|_| Err::<(), _>(anyhow!("nope")));
    let fine = stage.create_action_with("Fine", RetryPolicy::new(1));
    fine.run(|_| Ok::<_, anyhow::Error>(()));
    stage.exit(None);
    root.exit(None);

    // The failed action already escalated the event when it gave up.
    assert_eq!(broken.status(), Status::Failed);
    assert_eq!(fine.status(), Status::Success);
    assert_eq!(stage.status(), Status::Failed);
    assert_eq!(root.status(), Status::Failed);
}

#[test]
fn test_create_action_uses_configured_defaults() {
    let mut config = timeframe::TimeFrameConfig::default();
    config.retry.retries = 5;
    let root = TimeFrame::builder("Job").config(config).build();
    let call = root.create_event("Stage").create_action("Call");
    assert_eq!(call.retries(), 5);
    assert_eq!(call.policy().retries(), 5);
    assert_eq!(call.event().name().to_string(), "Stage");
}

#[tokio::test]
async fn test_async_retry_and_scopes() {
    let root = TimeFrame::new("Job");
    root.enter_async().await;
    let stage = root.create_event("Stage");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let value = stage
        .scope_async(move |stage| async move {
            let call = stage.create_action_with("Call", RetryPolicy::new(3));
            let outcome = call
                .run_async(move |_attempt| {
                    let counter = Arc::clone(&counter);
                    async move {
                        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err(anyhow!("warming up"))
                        } else {
                            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                            Ok(11)
                        }
                    }
                })
                .await;
            Ok::<_, anyhow::Error>(outcome.value())
        })
        .await;
    root.exit_async(None).await;

    assert_eq!(value, Some(Some(11)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(stage.status(), Status::Success);
    assert_eq!(root.status(), Status::Success);
}
