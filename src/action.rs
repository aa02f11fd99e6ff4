//! Actions: retryable units of work.
//!
//! An action produces attempts on demand through [`Attempts`]. Each attempt's
//! scope closes with an [`AttemptSignal`]; the driver ([`Action::retry`] or a
//! hand-written loop using [`Action::handle_signal`]) stops on anything other
//! than `Continue`.

use std::future::Future;

use tracing::debug;

use crate::attempt::{Attempt, AttemptSignal};
use crate::category::{ErrorCategory, Failure};
use crate::event::Event;
use crate::frame::{frame_handle, Frame, FrameRef, Scoped};

/// Retry configuration of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    retries: u32,
    ignore: Vec<&'static ErrorCategory>,
    match_subcategories: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RetryPolicy {
    /// `retries` is the attempt budget; 0 produces no attempts.
    pub fn new(retries: u32) -> Self {
        Self {
            retries,
            ignore: Vec::new(),
            match_subcategories: false,
        }
    }

    /// Never retry errors of `category`.
    pub fn ignore(mut self, category: &'static ErrorCategory) -> Self {
        self.ignore.push(category);
        self
    }

    /// Also match categories nested under an ignored one.
    pub fn match_subcategories(mut self, enabled: bool) -> Self {
        self.match_subcategories = enabled;
        self
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn ignored(&self) -> &[&'static ErrorCategory] {
        &self.ignore
    }

    pub fn matches_subcategories(&self) -> bool {
        self.match_subcategories
    }

    pub fn ignores(&self, category: &ErrorCategory) -> bool {
        self.ignore.iter().any(|ignored| {
            if self.match_subcategories {
                category.is_within(ignored)
            } else {
                category == *ignored
            }
        })
    }
}

/// How a retry loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    Ignored { attempts: u32 },
    Exhausted { attempts: u32 },
    /// Zero budget: the body ran once in the action's own scope and succeeded.
    RanOnce { value: T },
    /// Zero budget: the body ran once in the action's own scope and failed.
    FailedOnce,
    /// The generator produced no attempt (zero budget, or a previous loop
    /// already succeeded).
    NotAttempted,
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. } | RetryOutcome::RanOnce { .. })
    }

    pub fn value(self) -> Option<T> {
        match self {
            RetryOutcome::Succeeded { value, .. } | RetryOutcome::RanOnce { value } => Some(value),
            _ => None,
        }
    }
}

/// A retryable unit of work, owned by an [`Event`].
#[derive(Clone)]
pub struct Action {
    inner: FrameRef,
}

frame_handle!(Action);

impl Scoped for Action {}

/// Generator of attempts for one action.
///
/// Stops once the budget is spent or the previous attempt succeeded. A
/// previous attempt still `LOADING` (its scope never closed) is forced to
/// `SUCCESS` first.
pub struct Attempts {
    action: FrameRef,
}

impl Iterator for Attempts {
    type Item = Attempt;

    fn next(&mut self) -> Option<Attempt> {
        let id = self.action.write(|tree| tree.next_attempt(self.action.id))?;
        Some(Attempt::from_ref(self.action.at(id)))
    }
}

impl Action {
    pub(crate) fn from_ref(inner: FrameRef) -> Self {
        Self { inner }
    }

    pub fn event(&self) -> Event {
        let parent = self.inner.read(|tree| tree.node(self.inner.id).parent);
        Event::from_ref(self.inner.at(parent.unwrap_or(self.inner.id)))
    }

    pub fn policy(&self) -> RetryPolicy {
        self.inner
            .read(|tree| tree.node(self.inner.id).policy.clone())
            .unwrap_or_default()
    }

    pub fn retries(&self) -> u32 {
        self.inner.read(|tree| tree.node(self.inner.id).retries())
    }

    pub fn attempts_made(&self) -> u32 {
        self.inner.read(|tree| tree.node(self.inner.id).attempts_made)
    }

    /// Attempts created so far, in creation order.
    pub fn attempt_list(&self) -> Vec<Attempt> {
        self.inner
            .children()
            .into_iter()
            .map(Attempt::from_ref)
            .collect()
    }

    pub fn attempts(&self) -> Attempts {
        Attempts {
            action: self.inner.clone(),
        }
    }

    /// Consume a signal from one of this action's attempts. Returns whether
    /// the loop should go on. Ignored and exhausted stops fail the action.
    pub fn handle_signal(&self, signal: AttemptSignal) -> bool {
        self.inner
            .write(|tree| tree.settle_action(self.inner.id, signal));
        signal.should_continue()
    }

    fn finish<T>(&self, signal: AttemptSignal, value: Option<T>) -> Option<RetryOutcome<T>> {
        let attempts = self.attempts_made();
        if self.handle_signal(signal) {
            return None;
        }
        let outcome = match (signal, value) {
            (AttemptSignal::StopSuccess, Some(value)) => RetryOutcome::Succeeded { value, attempts },
            (AttemptSignal::StopIgnored, _) => RetryOutcome::Ignored { attempts },
            (AttemptSignal::StopExhausted, _) => RetryOutcome::Exhausted { attempts },
            _ => RetryOutcome::NotAttempted,
        };
        debug!(action = %self.name(), attempts, status = %self.status(), "retry loop finished");
        Some(outcome)
    }

    /// Drive the attempt generator, running `body` inside each attempt's
    /// scope until a stop signal. Does not start or end the action itself.
    pub fn retry<T, E, F>(&self, mut body: F) -> RetryOutcome<T>
    where
        F: FnMut(&Attempt) -> Result<T, E>,
        E: Failure,
    {
        for attempt in self.attempts() {
            attempt.enter();
            let (signal, value) = match body(&attempt) {
                Ok(value) => (attempt.close(None), Some(value)),
                Err(err) => (attempt.close(Some(&err)), None),
            };
            if let Some(outcome) = self.finish(signal, value) {
                return outcome;
            }
        }
        RetryOutcome::NotAttempted
    }

    /// Async variant of [`Action::retry`].
    pub async fn retry_async<T, E, F, Fut>(&self, mut body: F) -> RetryOutcome<T>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Failure,
    {
        for attempt in self.attempts() {
            attempt.enter_async().await;
            let (signal, value) = match body(attempt.clone()).await {
                Ok(value) => (attempt.close(None), Some(value)),
                Err(err) => (attempt.close(Some(&err)), None),
            };
            if let Some(outcome) = self.finish(signal, value) {
                return outcome;
            }
        }
        RetryOutcome::NotAttempted
    }

    /// Enter the action, drive its retries, then exit it.
    ///
    /// With a zero budget no attempt is created: `body` runs once, with
    /// `None`, inside the action's own scope, and an error is recorded on
    /// the action.
    pub fn run<T, E, F>(&self, mut body: F) -> RetryOutcome<T>
    where
        F: FnMut(Option<&Attempt>) -> Result<T, E>,
        E: Failure,
    {
        self.enter();
        if self.retries() == 0 {
            let result = body(None);
            return self.finish_once(result);
        }
        let outcome = self.retry(|attempt| body(Some(attempt)));
        self.exit(None);
        outcome
    }

    /// Async variant of [`Action::run`].
    pub async fn run_async<T, E, F, Fut>(&self, mut body: F) -> RetryOutcome<T>
    where
        F: FnMut(Option<Attempt>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Failure,
    {
        self.enter_async().await;
        if self.retries() == 0 {
            let result = body(None).await;
            return self.finish_once(result);
        }
        let outcome = self.retry_async(|attempt| body(Some(attempt))).await;
        self.exit_async(None).await;
        outcome
    }

    fn finish_once<T, E: Failure>(&self, result: Result<T, E>) -> RetryOutcome<T> {
        let outcome = match result {
            Ok(value) => {
                self.exit(None);
                RetryOutcome::RanOnce { value }
            }
            Err(err) => {
                self.exit(Some(&err));
                RetryOutcome::FailedOnce
            }
        };
        debug!(action = %self.name(), status = %self.status(), "single run finished");
        outcome
    }
}
