//! Property-based tests for status assignment and aggregation

use proptest::prelude::*;
use timeframe::{Frame, RetryPolicy, Scoped, Status, TimeFrame};

fn any_status() -> impl Strategy<Value = Status> {
    prop::sample::select(Status::ALL.to_vec())
}

proptest! {
    /// A frame's status is always the most severe value ever assigned to it.
    #[test]
    fn status_only_moves_up(assignments in prop::collection::vec(any_status(), 0..16)) {
        let root = TimeFrame::new("Job");
        let mut highest = Status::Future;
        for status in assignments {
            let changed = root.set_status(status);
            prop_assert_eq!(changed, status > highest);
            highest = highest.max(status);
            prop_assert_eq!(root.status(), highest);
        }
    }

    /// An event ends FAILED exactly when it has actions and every one of them
    /// failed; otherwise it ends SUCCESS.
    #[test]
    fn event_fails_iff_all_actions_failed(outcomes in prop::collection::vec(any::<bool>(), 0..8)) {
        let root = TimeFrame::new("Job");
        let stage = root.create_event("Stage");
        stage.enter();
        for (index, failed) in outcomes.iter().enumerate() {
            let action = stage.create_action_with(format!("Call {}", index), RetryPolicy::new(1));
            action.set_status(if *failed { Status::Failed } else { Status::Success });
        }
        stage.exit(None);

        let expected = if !outcomes.is_empty() && outcomes.iter().all(|failed| *failed) {
            Status::Failed
        } else {
            Status::Success
        };
        prop_assert_eq!(stage.status(), expected);
    }

    /// Symbols and severities identify a status uniquely.
    #[test]
    fn status_codes_round_trip(status in any_status()) {
        prop_assert_eq!(Status::from_symbol(status.symbol()).unwrap(), status);
        prop_assert_eq!(Status::from_severity(status.severity()).unwrap(), status);
        prop_assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
    }
}
