//! Property-based tests for hierarchy shape

use proptest::prelude::*;
use timeframe::{Frame, RetryOutcome, RetryPolicy, Scoped, TimeFrame};

/// Events, each a list of (retry budget, failures before success).
fn shapes() -> impl Strategy<Value = Vec<Vec<(u32, u32)>>> {
    prop::collection::vec(prop::collection::vec((0u32..4, 0u32..4), 0..4), 0..4)
}

proptest! {
    /// Every subtree counts itself plus the counts of its children, and the
    /// number of attempts matches the budget and failure pattern.
    #[test]
    fn count_is_one_plus_children(shape in shapes()) {
        let root = TimeFrame::new("Job");
        root.enter();
        let mut expected = 1;
        for (event_index, actions) in shape.iter().enumerate() {
            let event = root.create_event(format!("Event {}", event_index));
            event.enter();
            expected += 1;
            for (action_index, (budget, failures)) in actions.iter().enumerate() {
                let action = event.create_action_with(
                    format!("Action {}", action_index),
                    RetryPolicy::new(*budget),
                );
                let mut seen = 0;
                let outcome = action.run(|_| {
                    seen += 1;
                    if seen <= *failures {
                        Err(anyhow::anyhow!("failure {}", seen))
                    } else {
                        Ok(())
                    }
                });
                let attempts = (*failures + 1).min(*budget);
                prop_assert_eq!(action.attempts_made(), attempts);
                prop_assert_eq!(action.frame_count(), 1 + attempts as usize);
                if *budget == 0 {
                    prop_assert_eq!(seen, 1);
                    let expected_outcome = if *failures == 0 {
                        RetryOutcome::RanOnce { value: () }
                    } else {
                        RetryOutcome::FailedOnce
                    };
                    prop_assert_eq!(outcome, expected_outcome);
                }
                expected += 1 + attempts as usize;
            }
            let children: usize = event.actions().iter().map(|a| a.frame_count()).sum();
            prop_assert_eq!(event.frame_count(), 1 + children);
            event.exit(None);
        }
        root.exit(None);

        let children: usize = root.events().iter().map(|e| e.frame_count()).sum();
        prop_assert_eq!(root.frame_count(), 1 + children);
        prop_assert_eq!(root.frame_count(), expected);
    }
}
