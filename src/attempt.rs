//! Attempts: single trials of a retryable action.

use crate::action::Action;
use crate::category::Failure;
use crate::frame::{frame_handle, Frame, FrameRef};
use crate::hook;

/// Loop control emitted when an attempt scope closes.
///
/// Only the owning action's driver consumes these; they are never surfaced as
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptSignal {
    /// Failed, budget remains: produce another attempt.
    Continue,
    /// This attempt satisfied the action.
    StopSuccess,
    /// The error belongs to the action's ignore set; stop without retrying.
    StopIgnored,
    /// Failed and the retry budget is spent.
    StopExhausted,
}

impl AttemptSignal {
    pub fn should_continue(self) -> bool {
        matches!(self, AttemptSignal::Continue)
    }
}

/// One retry trial, owned by an [`Action`].
#[derive(Clone)]
pub struct Attempt {
    inner: FrameRef,
}

frame_handle!(Attempt);

impl Attempt {
    pub(crate) fn from_ref(inner: FrameRef) -> Self {
        Self { inner }
    }

    pub fn action(&self) -> Action {
        let parent = self.inner.read(|tree| tree.node(self.inner.id).parent);
        // Attempts are only ever created under an action.
        Action::from_ref(self.inner.at(parent.unwrap_or(self.inner.id)))
    }

    /// Annotation attached when the attempt stopped on an ignored error.
    pub fn note(&self) -> Option<String> {
        self.inner.read(|tree| tree.node(self.inner.id).note.clone())
    }

    /// Start the attempt. Fires the root hook first if it never fired.
    pub fn enter(&self) {
        hook::fire_blocking(&self.root());
        self.start();
    }

    /// Start the attempt, awaiting the root hook first if it never fired.
    pub async fn enter_async(&self) {
        hook::fire_async(&self.root()).await;
        self.start();
    }

    /// Close the attempt scope with the body's outcome.
    pub fn close(&self, error: Option<&dyn Failure>) -> AttemptSignal {
        let signal = self
            .inner
            .write(|tree| tree.close_attempt(self.inner.id, error));
        tracing::debug!(attempt = %self.name(), ?signal, "attempt closed");
        signal
    }
}
