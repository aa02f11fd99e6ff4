//! Events: named groups of actions.

use crate::action::{Action, RetryPolicy};
use crate::frame::{frame_handle, FrameKind, FrameName, FrameRef, Scoped};

/// A grouping of actions, owned by the root. Its status aggregates its
/// actions when it ends.
#[derive(Clone)]
pub struct Event {
    inner: FrameRef,
}

frame_handle!(Event);

impl Scoped for Event {}

impl Event {
    pub(crate) fn from_ref(inner: FrameRef) -> Self {
        Self { inner }
    }

    /// Create an action with the root's configured retry defaults.
    pub fn create_action(&self, name: impl Into<FrameName>) -> Action {
        let defaults = &self.inner.shared.config.retry;
        let policy = RetryPolicy::new(defaults.retries).match_subcategories(defaults.match_subcategories);
        self.create_action_with(name, policy)
    }

    pub fn create_action_with(&self, name: impl Into<FrameName>, policy: RetryPolicy) -> Action {
        let name = name.into();
        let id = self
            .inner
            .write(|tree| tree.push(self.inner.id, FrameKind::Action, name, Some(policy)));
        Action::from_ref(self.inner.at(id))
    }

    /// Actions created so far, in creation order.
    pub fn actions(&self) -> Vec<Action> {
        self.inner
            .children()
            .into_iter()
            .map(Action::from_ref)
            .collect()
    }
}
