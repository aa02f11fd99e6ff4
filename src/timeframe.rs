//! The root frame: owns events, the traceback log and the hook.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::category::Failure;
use crate::config::TimeFrameConfig;
use crate::error::TimeFrameError;
use crate::event::Event;
use crate::frame::{exit_frame, frame_handle, FrameId, FrameKind, FrameName, FrameRef, Scoped, Shared, Tree};
use crate::hook::{self, Hook};
use crate::render::{self, RenderStyle};

/// Root of a hierarchy.
///
/// Cloning yields another handle to the same hierarchy.
#[derive(Clone)]
pub struct TimeFrame {
    inner: FrameRef,
}

frame_handle!(TimeFrame);

/// Builder for [`TimeFrame`].
pub struct TimeFrameBuilder {
    name: FrameName,
    hook: Option<Hook>,
    config: TimeFrameConfig,
}

impl TimeFrameBuilder {
    pub fn hook(mut self, hook: Hook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn config(mut self, config: TimeFrameConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> TimeFrame {
        debug!(root = %self.name, has_hook = self.hook.is_some(), "time frame created");
        let shared = Shared {
            tree: Mutex::new(Tree::new(self.name)),
            hook: Mutex::new(self.hook),
            hook_fired: AtomicBool::new(false),
            hook_result: Mutex::new(None),
            config: self.config,
        };
        TimeFrame {
            inner: FrameRef {
                shared: Arc::new(shared),
                id: FrameId::ROOT,
            },
        }
    }
}

impl TimeFrame {
    /// A root without hook, using default configuration.
    pub fn new(name: impl Into<FrameName>) -> Self {
        Self::builder(name).build()
    }

    pub fn builder(name: impl Into<FrameName>) -> TimeFrameBuilder {
        TimeFrameBuilder {
            name: name.into(),
            hook: None,
            config: TimeFrameConfig::default(),
        }
    }

    pub(crate) fn from_ref(inner: FrameRef) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &TimeFrameConfig {
        &self.inner.shared.config
    }

    pub fn create_event(&self, name: impl Into<FrameName>) -> Event {
        let name = name.into();
        let id = self
            .inner
            .write(|tree| tree.push(self.inner.id, FrameKind::Event, name, None));
        Event::from_ref(self.inner.at(id))
    }

    /// Events created so far, in creation order.
    pub fn events(&self) -> Vec<Event> {
        self.inner
            .children()
            .into_iter()
            .map(Event::from_ref)
            .collect()
    }

    /// Whether the hook has been consumed. Stays `false` for roots built
    /// without a hook.
    pub fn hook_fired(&self) -> bool {
        self.inner.shared.hook_fired.load(Ordering::SeqCst)
    }

    /// Value returned by the hook, once it has completed.
    pub fn hook_result(&self) -> Option<Value> {
        self.inner.shared.hook_result.lock().clone()
    }

    /// Report at the deepest depth (3, 2, then 1) whose size fits
    /// `byte_budget` bytes.
    pub fn render_depth_capped(&self, byte_budget: usize) -> Result<String, TimeFrameError> {
        self.inner.read(|tree| render::depth_capped(tree, byte_budget))
    }

    /// [`render_depth_capped`](Self::render_depth_capped) with the configured budget.
    pub fn render_compact(&self) -> Result<String, TimeFrameError> {
        self.render_depth_capped(self.config().render.byte_budget)
    }

    pub fn render_indented(&self) -> String {
        self.inner.read(render::indented)
    }

    pub fn render_custom(&self, style: &RenderStyle) -> String {
        self.inner.read(|tree| render::custom(tree, style))
    }

    /// [`render_custom`](Self::render_custom) with the configured style.
    pub fn render_markdown(&self) -> String {
        let style = self.config().render.style.to_style();
        self.render_custom(&style)
    }

    pub fn print_indented(&self) {
        println!("{}", self.render_indented());
    }

    /// All recorded failures, oldest first, joined by newlines.
    pub fn traceback(&self) -> String {
        self.inner.read(|tree| tree.traceback().join("\n"))
    }

    pub fn traceback_entries(&self) -> Vec<String> {
        self.inner.read(|tree| tree.traceback().to_vec())
    }
}

#[async_trait]
impl Scoped for TimeFrame {
    /// Fires the hook if no attempt fired it, then ends the root.
    fn exit(&self, error: Option<&dyn Failure>) {
        hook::fire_blocking(self);
        exit_frame(&self.inner, error);
    }

    async fn exit_async(&self, error: Option<&dyn Failure>) {
        hook::fire_async(self).await;
        exit_frame(&self.inner, error);
    }
}
