//! TimeFrame: hierarchical operation tracking
//!
//! A root [`TimeFrame`] holds [`Event`]s, events hold retryable [`Action`]s,
//! and actions produce [`Attempt`]s. Every frame tracks timing and a
//! monotonic [`Status`]; failures bubble up the hierarchy and are recorded in
//! the root's traceback log. The root renders the whole tree as a text report.
//!
//! ```no_run
//! use timeframe::{Scoped, TimeFrame};
//!
//! let root = TimeFrame::new("Job");
//! root.enter();
//! let stage = root.create_event("Stage");
//! stage.enter();
//! let call = stage.create_action("Call");
//! let outcome = call.run(|_attempt| -> Result<u32, anyhow::Error> { Ok(42) });
//! assert_eq!(outcome.value(), Some(42));
//! stage.exit(None);
//! root.exit(None);
//! println!("{}", root.render_indented());
//! ```

pub mod action;
pub mod attempt;
pub mod category;
pub mod config;
pub mod error;
pub mod event;
pub mod frame;
pub mod hook;
pub mod logging;
pub mod render;
pub mod status;
pub mod timeframe;

pub use action::{Action, Attempts, RetryOutcome, RetryPolicy};
pub use attempt::{Attempt, AttemptSignal};
pub use category::{Categorized, ErrorCategory, Failure};
pub use config::{ConfigLoader, TimeFrameConfig};
pub use error::TimeFrameError;
pub use event::Event;
pub use frame::{Frame, FrameKind, FrameName, Scoped};
pub use hook::{Hook, HOOK_BLOCKING_TIMEOUT};
pub use render::RenderStyle;
pub use status::Status;
pub use timeframe::{TimeFrame, TimeFrameBuilder};
