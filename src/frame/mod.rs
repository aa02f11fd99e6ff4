//! Frames
//!
//! Every node in a hierarchy (root, event, action, attempt) is a frame: a
//! name, a status and a start/end timing pair. Handles are cheap clones of a
//! shared pointer to the root's arena plus an index into it.

pub(crate) mod tree;

use std::fmt;
use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::category::Failure;
use crate::config::TimeFrameConfig;
use crate::hook::Hook;
use crate::status::Status;
use crate::timeframe::TimeFrame;

pub(crate) use tree::{FrameId, Tree};

/// The four node kinds of a hierarchy, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    TimeFrame,
    Event,
    Action,
    Attempt,
}

impl FrameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameKind::TimeFrame => "TimeFrame",
            FrameKind::Event => "Event",
            FrameKind::Action => "Action",
            FrameKind::Attempt => "Attempt",
        }
    }

    /// Kinds whose status aggregates their children at `end()`.
    pub fn is_container(self) -> bool {
        !matches!(self, FrameKind::Attempt)
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional frame name. Unnamed frames render as `<unnamed>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FrameName(Option<String>);

impl FrameName {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl From<&str> for FrameName {
    fn from(name: &str) -> Self {
        Self(Some(name.to_string()))
    }
}

impl From<String> for FrameName {
    fn from(name: String) -> Self {
        Self(Some(name))
    }
}

impl From<Option<&str>> for FrameName {
    fn from(name: Option<&str>) -> Self {
        Self(name.map(str::to_string))
    }
}

impl From<Option<String>> for FrameName {
    fn from(name: Option<String>) -> Self {
        Self(name)
    }
}

impl fmt::Display for FrameName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_deref().unwrap_or("<unnamed>"))
    }
}

/// State owned by one root and shared by all of its handles.
pub(crate) struct Shared {
    pub(crate) tree: Mutex<Tree>,
    pub(crate) hook: Mutex<Option<Hook>>,
    pub(crate) hook_fired: AtomicBool,
    pub(crate) hook_result: Mutex<Option<Value>>,
    pub(crate) config: TimeFrameConfig,
}

/// Pointer to one node of a hierarchy.
#[derive(Clone)]
pub struct FrameRef {
    pub(crate) shared: Arc<Shared>,
    pub(crate) id: FrameId,
}

impl FrameRef {
    pub(crate) fn read<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
        f(&self.shared.tree.lock())
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut Tree) -> R) -> R {
        f(&mut self.shared.tree.lock())
    }

    pub(crate) fn at(&self, id: FrameId) -> FrameRef {
        FrameRef {
            shared: Arc::clone(&self.shared),
            id,
        }
    }

    pub(crate) fn children(&self) -> Vec<FrameRef> {
        let ids = self.read(|tree| tree.node(self.id).children.clone());
        ids.into_iter().map(|id| self.at(id)).collect()
    }
}

/// Timing, status and representation shared by every node kind.
pub trait Frame: Clone + Send + Sync + 'static {
    #[doc(hidden)]
    fn frame_ref(&self) -> &FrameRef;

    fn kind(&self) -> FrameKind {
        let frame = self.frame_ref();
        frame.read(|tree| tree.node(frame.id).kind)
    }

    fn name(&self) -> FrameName {
        let frame = self.frame_ref();
        frame.read(|tree| tree.node(frame.id).name.clone())
    }

    fn status(&self) -> Status {
        let frame = self.frame_ref();
        frame.read(|tree| tree.node(frame.id).status)
    }

    /// Raise the status; lower or equal values are ignored. Returns whether
    /// the status changed.
    fn set_status(&self, status: Status) -> bool {
        let frame = self.frame_ref();
        frame.write(|tree| tree.set_status(frame.id, status))
    }

    /// Zero before `start()`, elapsed-so-far while running, frozen once ended.
    fn duration(&self) -> Duration {
        let frame = self.frame_ref();
        frame.read(|tree| tree.node(frame.id).duration())
    }

    /// Number of frames in this subtree, including this one.
    fn frame_count(&self) -> usize {
        let frame = self.frame_ref();
        frame.read(|tree| tree.frame_count(frame.id))
    }

    fn start(&self) {
        let frame = self.frame_ref();
        frame.write(|tree| tree.start(frame.id))
    }

    fn end(&self) {
        let frame = self.frame_ref();
        frame.write(|tree| tree.end(frame.id))
    }

    /// Mark the frame FAILED (or ISSUE), propagate to the parent and, when
    /// `detail` is given, append a record to the root's traceback log.
    fn failed(&self, is_issue: bool, detail: Option<&str>) {
        let frame = self.frame_ref();
        frame.write(|tree| tree.fail(frame.id, is_issue, detail))
    }

    fn root(&self) -> TimeFrame {
        TimeFrame::from_ref(self.frame_ref().at(FrameId::ROOT))
    }

    /// Single-line representation used by every renderer.
    fn describe(&self) -> String {
        let frame = self.frame_ref();
        frame.read(|tree| tree.describe(frame.id))
    }
}

/// Base exit transition: `end()` on success, `failed()` with the error detail
/// otherwise.
pub(crate) fn exit_frame(frame: &FrameRef, error: Option<&dyn Failure>) {
    match error {
        None => frame.write(|tree| tree.end(frame.id)),
        Some(err) => {
            let detail = err.detail();
            frame.write(|tree| tree.fail(frame.id, false, Some(&detail)))
        }
    }
}

/// Scoped execution for roots, events and actions.
///
/// Errors returned by the body are recorded on the frame and swallowed: the
/// scope yields `None` instead of propagating them.
#[async_trait]
pub trait Scoped: Frame {
    fn enter(&self) {
        self.start();
    }

    fn exit(&self, error: Option<&dyn Failure>) {
        exit_frame(self.frame_ref(), error);
    }

    async fn enter_async(&self) {
        self.enter();
    }

    async fn exit_async(&self, error: Option<&dyn Failure>) {
        self.exit(error);
    }

    fn scope<T, E, F>(&self, body: F) -> Option<T>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: Failure,
    {
        self.enter();
        match body(self) {
            Ok(value) => {
                self.exit(None);
                Some(value)
            }
            Err(err) => {
                self.exit(Some(&err));
                None
            }
        }
    }

    async fn scope_async<T, E, F, Fut>(&self, body: F) -> Option<T>
    where
        F: FnOnce(Self) -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: Failure,
    {
        self.enter_async().await;
        match body(self.clone()).await {
            Ok(value) => {
                self.exit_async(None).await;
                Some(value)
            }
            Err(err) => {
                self.exit_async(Some(&err)).await;
                None
            }
        }
    }
}

macro_rules! frame_handle {
    ($handle:ident) => {
        impl $crate::frame::Frame for $handle {
            fn frame_ref(&self) -> &$crate::frame::FrameRef {
                &self.inner
            }
        }

        impl std::fmt::Display for $handle {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&$crate::frame::Frame::describe(self))
            }
        }

        impl std::fmt::Debug for $handle {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                use $crate::frame::Frame;
                f.debug_struct(stringify!($handle))
                    .field("name", &self.name())
                    .field("status", &self.status())
                    .field("duration", &self.duration())
                    .finish()
            }
        }
    };
}

pub(crate) use frame_handle;
