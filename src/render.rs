//! Text reports of a hierarchy.
//!
//! Three layouts share one header line and one descent rule
//! ([`Tree::should_descend`]):
//!
//! - depth-capped: markers per depth, shrinking the depth until the report
//!   fits a byte budget (chat messages with a size limit);
//! - indented: two spaces per level, full depth;
//! - custom: caller-supplied prefix per depth, `None` hides that depth.

use crate::error::TimeFrameError;
use crate::frame::{FrameId, Tree};

/// Line markers of the depth-capped layout, indexed by depth.
const CAPPED_MARKERS: [&str; 4] = ["", "", "> ", "> - "];

/// Deepest cap tried by the depth-capped layout.
const MAX_CAPPED_DEPTH: usize = 3;

/// Per-depth line prefixes for [`render_custom`](crate::TimeFrame::render_custom).
///
/// Index 0 is the root, 1 events, 2 actions, 3 attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderStyle {
    prefixes: Vec<Option<String>>,
}

impl RenderStyle {
    pub const MAX_DEPTHS: usize = 4;

    pub fn new<I, S>(prefixes: I) -> Result<Self, TimeFrameError>
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let prefixes: Vec<Option<String>> = prefixes
            .into_iter()
            .map(|prefix| prefix.map(Into::into))
            .collect();
        if prefixes.len() > Self::MAX_DEPTHS {
            return Err(TimeFrameError::InvalidStyle(format!(
                "{} prefixes given, at most {} depths exist",
                prefixes.len(),
                Self::MAX_DEPTHS
            )));
        }
        Ok(Self { prefixes })
    }

    /// Markdown-friendly default: root hidden, blank line before events.
    pub fn markdown() -> Self {
        Self {
            prefixes: vec![
                None,
                Some("\n".to_string()),
                Some("-  ".to_string()),
                Some("> - ".to_string()),
            ],
        }
    }

    pub fn prefix(&self, depth: usize) -> Option<&str> {
        self.prefixes.get(depth).and_then(|prefix| prefix.as_deref())
    }

    pub fn depths(&self) -> usize {
        self.prefixes.len()
    }
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self::markdown()
    }
}

/// First line of every report.
pub(crate) fn header(tree: &Tree) -> String {
    let root = tree.node(FrameId::ROOT);
    let label = if root.status.is_pending() { "Current" } else { "Total" };
    format!(
        "{label}: {:08.3}s ({label} Frames: {})",
        root.duration().as_secs_f64(),
        tree.frame_count(FrameId::ROOT)
    )
}

/// The deepest layout (cap 3, then 2, then 1) whose size fits `byte_budget`.
pub(crate) fn depth_capped(tree: &Tree, byte_budget: usize) -> Result<String, TimeFrameError> {
    let mut smallest = usize::MAX;
    for cap in (1..=MAX_CAPPED_DEPTH).rev() {
        let report = capped_at(tree, cap);
        if report.len() <= byte_budget {
            return Ok(report);
        }
        smallest = smallest.min(report.len());
    }
    Err(TimeFrameError::BudgetExceeded {
        budget: byte_budget,
        smallest,
    })
}

fn capped_at(tree: &Tree, cap: usize) -> String {
    let mut lines = vec![header(tree)];
    walk_capped(tree, FrameId::ROOT, 0, cap, &mut lines);
    lines.join("\n")
}

fn walk_capped(tree: &Tree, id: FrameId, depth: usize, cap: usize, lines: &mut Vec<String>) {
    if depth != 0 {
        lines.push(format!("{}{}", CAPPED_MARKERS[depth], tree.describe(id)));
    }
    let next = depth + 1;
    if next > cap || !tree.should_descend(id) {
        return;
    }
    for child in &tree.node(id).children {
        walk_capped(tree, *child, next, cap, lines);
    }
}

pub(crate) fn indented(tree: &Tree) -> String {
    let mut lines = vec![header(tree)];
    walk_indented(tree, FrameId::ROOT, 0, &mut lines);
    lines.join("\n")
}

fn walk_indented(tree: &Tree, id: FrameId, depth: usize, lines: &mut Vec<String>) {
    lines.push(format!("{}{}", "  ".repeat(depth), tree.describe(id)));
    if !tree.should_descend(id) {
        return;
    }
    for child in &tree.node(id).children {
        walk_indented(tree, *child, depth + 1, lines);
    }
}

pub(crate) fn custom(tree: &Tree, style: &RenderStyle) -> String {
    let mut lines = vec![header(tree)];
    walk_custom(tree, FrameId::ROOT, 0, style, &mut lines);
    lines.join("\n")
}

fn walk_custom(tree: &Tree, id: FrameId, depth: usize, style: &RenderStyle, lines: &mut Vec<String>) {
    if let Some(prefix) = style.prefix(depth) {
        lines.push(format!("{}{}", prefix, tree.describe(id)));
    }
    let next = depth + 1;
    if next >= style.depths() || !tree.should_descend(id) {
        return;
    }
    for child in &tree.node(id).children {
        walk_custom(tree, *child, next, style, lines);
    }
}
