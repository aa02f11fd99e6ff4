//! Frame status model.
//!
//! Statuses are ordered by severity. A frame's status only ever moves up this
//! order; see [`Status::escalate`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::TimeFrameError;

/// Lifecycle stage of a frame, from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Future,
    Loading,
    Success,
    Issue,
    Failed,
    Fatal,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Future,
        Status::Loading,
        Status::Success,
        Status::Issue,
        Status::Failed,
        Status::Fatal,
    ];

    /// Severity code used for ordering.
    pub const fn severity(self) -> u16 {
        match self {
            Status::Future => 0x4000,
            Status::Loading => 0x8000,
            Status::Success => 0xb000,
            Status::Issue => 0xf000,
            Status::Failed => 0xfff0,
            Status::Fatal => 0xffff,
        }
    }

    /// Display symbol shown in rendered reports.
    pub const fn symbol(self) -> &'static str {
        match self {
            Status::Future => "🟨",
            Status::Loading => "⏳",
            Status::Success => "✅",
            Status::Issue => "⚠️",
            Status::Failed => "❌",
            Status::Fatal => "🛑",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Future => "FUTURE",
            Status::Loading => "LOADING",
            Status::Success => "SUCCESS",
            Status::Issue => "ISSUE",
            Status::Failed => "FAILED",
            Status::Fatal => "FATAL",
        }
    }

    pub fn from_symbol(symbol: &str) -> Result<Self, TimeFrameError> {
        Status::ALL
            .into_iter()
            .find(|status| status.symbol() == symbol)
            .ok_or_else(|| TimeFrameError::InvalidStatus(format!("unknown symbol '{}'", symbol)))
    }

    pub fn from_severity(code: u16) -> Result<Self, TimeFrameError> {
        Status::ALL
            .into_iter()
            .find(|status| status.severity() == code)
            .ok_or_else(|| TimeFrameError::InvalidStatus(format!("unknown severity code {:#06x}", code)))
    }

    /// Not started yet, or started and not yet terminated.
    pub fn is_pending(self) -> bool {
        matches!(self, Status::Future | Status::Loading)
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Status::Failed | Status::Fatal)
    }

    /// ISSUE, FAILED or FATAL: statuses that `end()` must not overwrite.
    pub fn is_troubled(self) -> bool {
        matches!(self, Status::Issue | Status::Failed | Status::Fatal)
    }

    /// Monotonic assignment. Returns `true` when `self` changed.
    pub fn escalate(&mut self, next: Status) -> bool {
        if next <= *self {
            return false;
        }
        *self = next;
        true
    }
}

impl PartialOrd for Status {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Status {
    fn cmp(&self, other: &Self) -> Ordering {
        self.severity().cmp(&other.severity())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = TimeFrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TimeFrameError::InvalidStatus(format!("unknown status '{}'", s)))
    }
}
