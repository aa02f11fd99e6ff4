//! Frame arena: the append-only node store behind every handle.
//!
//! All status transitions live here so the blocking and async entry points
//! share one routine. Callers hold the root's lock for the duration of a
//! single transition; nothing in this module suspends or calls user code.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::action::RetryPolicy;
use crate::attempt::AttemptSignal;
use crate::category::Failure;
use crate::frame::{FrameKind, FrameName};
use crate::status::Status;

/// Index of a node inside its root's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FrameId(usize);

impl FrameId {
    pub(crate) const ROOT: FrameId = FrameId(0);
}

/// Seconds since the first timestamp taken in this process.
pub(crate) fn process_clock() -> f64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) kind: FrameKind,
    pub(crate) name: FrameName,
    pub(crate) parent: Option<FrameId>,
    pub(crate) children: Vec<FrameId>,
    pub(crate) started: Option<Instant>,
    pub(crate) ended: Option<Instant>,
    pub(crate) status: Status,
    /// Free-text annotation (attempts only).
    pub(crate) note: Option<String>,
    /// Retry configuration (actions only).
    pub(crate) policy: Option<RetryPolicy>,
    pub(crate) attempts_made: u32,
}

impl Node {
    fn new(kind: FrameKind, name: FrameName, parent: Option<FrameId>, policy: Option<RetryPolicy>) -> Self {
        Self {
            kind,
            name,
            parent,
            children: Vec::new(),
            started: None,
            ended: None,
            status: Status::Future,
            note: None,
            policy,
            attempts_made: 0,
        }
    }

    pub(crate) fn duration(&self) -> Duration {
        match (self.started, self.ended) {
            (None, _) => Duration::ZERO,
            (Some(started), None) => started.elapsed(),
            (Some(started), Some(ended)) => ended.saturating_duration_since(started),
        }
    }

    pub(crate) fn retries(&self) -> u32 {
        self.policy.as_ref().map(|policy| policy.retries()).unwrap_or(0)
    }
}

#[derive(Debug)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
    traceback: Vec<String>,
}

impl Tree {
    pub(crate) fn new(root_name: FrameName) -> Self {
        Self {
            nodes: vec![Node::new(FrameKind::TimeFrame, root_name, None, None)],
            traceback: Vec::new(),
        }
    }

    pub(crate) fn node(&self, id: FrameId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: FrameId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn push(
        &mut self,
        parent: FrameId,
        kind: FrameKind,
        name: FrameName,
        policy: Option<RetryPolicy>,
    ) -> FrameId {
        let id = FrameId(self.nodes.len());
        debug!(kind = %kind, name = %name, parent = ?parent, "frame created");
        self.nodes.push(Node::new(kind, name, Some(parent), policy));
        self.node_mut(parent).children.push(id);
        id
    }

    pub(crate) fn traceback(&self) -> &[String] {
        &self.traceback
    }

    pub(crate) fn set_status(&mut self, id: FrameId, status: Status) -> bool {
        self.node_mut(id).status.escalate(status)
    }

    pub(crate) fn start(&mut self, id: FrameId) {
        let node = self.node_mut(id);
        node.started = Some(Instant::now());
        node.status.escalate(Status::Loading);
    }

    pub(crate) fn end(&mut self, id: FrameId) {
        let all_children_failed = {
            let node = self.node(id);
            node.kind.is_container()
                && !node.children.is_empty()
                && node
                    .children
                    .iter()
                    .all(|child| self.node(*child).status.is_failure())
        };
        let node = self.node_mut(id);
        node.ended = Some(Instant::now());
        if all_children_failed {
            node.status.escalate(Status::Failed);
        }
        if !node.status.is_troubled() {
            node.status.escalate(Status::Success);
        }
        debug!(kind = %node.kind, name = %node.name, status = %node.status, "frame ended");
    }

    pub(crate) fn fail(&mut self, id: FrameId, is_issue: bool, detail: Option<&str>) {
        let node = self.node_mut(id);
        node.ended = Some(Instant::now());
        if !node.status.is_failure() {
            node.status.escalate(if is_issue { Status::Issue } else { Status::Failed });
        }
        if node.status == Status::Issue {
            return;
        }

        let (kind, parent) = (node.kind, node.parent);
        if let Some(parent) = parent {
            match kind {
                FrameKind::Attempt => {
                    self.set_status(parent, Status::Issue);
                }
                FrameKind::Action | FrameKind::Event => {
                    self.set_status(parent, Status::Failed);
                }
                FrameKind::TimeFrame => {}
            }
        }

        if let Some(detail) = detail {
            let record = self.format_record(id, detail);
            warn!(
                kind = %kind,
                name = %self.node(id).name,
                status = %self.node(id).status,
                "failure recorded in traceback"
            );
            self.traceback.push(record);
        }
    }

    fn format_record(&self, id: FrameId, detail: &str) -> String {
        let node = self.node(id);
        let ancestry = self.ancestry(id);
        let location = if ancestry.is_empty() {
            String::new()
        } else {
            let chain: Vec<String> = ancestry.iter().map(|name| format!("'{}'", name)).collect();
            format!(" in {}", chain.join(" > "))
        };
        format!(
            "[{:08.3}s] Error raised on {} '{}'{} with status {}:\n{}",
            process_clock(),
            node.kind,
            node.name,
            location,
            node.status,
            detail
        )
    }

    /// Names of all ancestors, root first.
    pub(crate) fn ancestry(&self, id: FrameId) -> Vec<&FrameName> {
        let mut chain = Vec::new();
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            let node = self.node(parent);
            chain.push(&node.name);
            current = node.parent;
        }
        chain.reverse();
        chain
    }

    pub(crate) fn frame_count(&self, id: FrameId) -> usize {
        1 + self
            .node(id)
            .children
            .iter()
            .map(|child| self.frame_count(*child))
            .sum::<usize>()
    }

    /// `<symbol>-<name> (<seconds>s)`, without the duration while a frame is
    /// pending and has run for less than a millisecond.
    pub(crate) fn describe(&self, id: FrameId) -> String {
        let node = self.node(id);
        let duration = node.duration();
        let mut text = format!("{}-{}", node.status.symbol(), node.name);
        if !(node.status.is_pending() && duration < Duration::from_millis(1)) {
            text.push_str(&format!(" ({:08.3}s)", duration.as_secs_f64()));
        }
        if let Some(note) = node.note.as_deref().filter(|note| !note.is_empty()) {
            text.push_str(&format!(" ({})", note));
        }
        text
    }

    /// Renderers never descend below an attempt, nor below an action whose
    /// only attempt succeeded.
    pub(crate) fn should_descend(&self, id: FrameId) -> bool {
        let node = self.node(id);
        match node.kind {
            FrameKind::Attempt => false,
            FrameKind::Action => !matches!(
                node.children.as_slice(),
                [only] if self.node(*only).status == Status::Success
            ),
            FrameKind::Event | FrameKind::TimeFrame => true,
        }
    }

    /// Produce the action's next attempt, or `None` when it must stop.
    pub(crate) fn next_attempt(&mut self, action: FrameId) -> Option<FrameId> {
        let (attempts_made, budget, last) = {
            let node = self.node(action);
            (node.attempts_made, node.retries(), node.children.last().copied())
        };
        if attempts_made >= budget {
            return None;
        }
        if let Some(last) = last {
            let previous = self.node_mut(last);
            if previous.status == Status::Loading {
                previous.status.escalate(Status::Success);
                previous.ended.get_or_insert_with(Instant::now);
            }
            if previous.status == Status::Success {
                return None;
            }
        }
        let name = FrameName::from(format!("Attempt #{}", attempts_made + 1));
        let attempt = self.push(action, FrameKind::Attempt, name, None);
        self.node_mut(action).attempts_made += 1;
        Some(attempt)
    }

    /// Close an attempt scope and translate its outcome into a loop signal.
    pub(crate) fn close_attempt(&mut self, id: FrameId, error: Option<&dyn Failure>) -> AttemptSignal {
        let Some(action) = self.node(id).parent else {
            return AttemptSignal::StopSuccess;
        };
        match error {
            None => self.end(id),
            Some(err) => {
                let category = err.category();
                let ignored = self
                    .node(action)
                    .policy
                    .as_ref()
                    .is_some_and(|policy| policy.ignores(category));
                if ignored {
                    let node = self.node_mut(id);
                    node.status.escalate(Status::Fatal);
                    node.note = Some(format!("ignored by {}", category));
                    self.fail(id, false, Some(&err.detail()));
                    return AttemptSignal::StopIgnored;
                }
                self.fail(id, false, Some(&err.detail()));
            }
        }

        if !self.node(id).status.is_failure() {
            return AttemptSignal::StopSuccess;
        }
        let action_node = self.node(action);
        if action_node.attempts_made >= action_node.retries() {
            AttemptSignal::StopExhausted
        } else {
            AttemptSignal::Continue
        }
    }

    /// Apply a stop signal to the action that drove the attempt.
    pub(crate) fn settle_action(&mut self, action: FrameId, signal: AttemptSignal) {
        match signal {
            AttemptSignal::Continue | AttemptSignal::StopSuccess => {}
            AttemptSignal::StopIgnored => {
                let recovered = self
                    .node(action)
                    .children
                    .iter()
                    .any(|child| self.node(*child).status == Status::Success);
                if !recovered {
                    self.fail(action, false, None);
                }
            }
            AttemptSignal::StopExhausted => self.fail(action, false, None),
        }
    }
}
