//! Error categories and the classification trait used by the retry driver.
//!
//! An [`ErrorCategory`] is a named node in a static hierarchy (`io` ->
//! `io.timeout`). Actions list the categories they refuse to retry, and every
//! caller error reports its category through [`Failure::category`].

use std::convert::Infallible;
use std::fmt;

/// A named error category, optionally nested under a parent category.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ErrorCategory {
    name: &'static str,
    parent: Option<&'static ErrorCategory>,
}

/// Fallback category for errors that carry no better classification.
pub static GENERIC: ErrorCategory = ErrorCategory::new("generic");

/// Operating-system and I/O failures.
pub static IO: ErrorCategory = ErrorCategory::new("io");

/// Deadline expiry. Nested under [`IO`].
pub static TIMEOUT: ErrorCategory = ErrorCategory::child("timeout", &IO);

impl ErrorCategory {
    pub const fn new(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    pub const fn child(name: &'static str, parent: &'static ErrorCategory) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parent(&self) -> Option<&'static ErrorCategory> {
        self.parent
    }

    /// This category followed by its parents, nearest first.
    pub fn lineage(&self) -> impl Iterator<Item = &ErrorCategory> {
        std::iter::successors(Some(self), |category| category.parent.map(|p| p as &ErrorCategory))
    }

    /// True when `self` is `other` or nested (at any depth) under it.
    pub fn is_within(&self, other: &ErrorCategory) -> bool {
        self.lineage().any(|category| category == other)
    }

    /// Attach this category to an arbitrary error value.
    pub fn wrap<E>(&'static self, error: E) -> Categorized<E>
    where
        E: fmt::Debug + fmt::Display + Send + Sync,
    {
        Categorized {
            category: self,
            error,
        }
    }
}

impl fmt::Display for ErrorCategory {
    /// Dotted path from the outermost parent, e.g. `io.timeout`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.lineage().map(|category| category.name).collect();
        names.reverse();
        f.write_str(&names.join("."))
    }
}

/// An error observed at a scope boundary.
pub trait Failure: fmt::Debug + fmt::Display + Send + Sync {
    fn category(&self) -> &'static ErrorCategory {
        &GENERIC
    }

    /// Text stored in the traceback log.
    fn detail(&self) -> String {
        format!("{}: {:?}", self.category(), self)
    }
}

/// An error value tagged with an explicit category.
#[derive(Debug)]
pub struct Categorized<E> {
    category: &'static ErrorCategory,
    error: E,
}

impl<E> Categorized<E> {
    pub fn into_inner(self) -> E {
        self.error
    }
}

impl<E: fmt::Display> fmt::Display for Categorized<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl<E> Failure for Categorized<E>
where
    E: fmt::Debug + fmt::Display + Send + Sync,
{
    fn category(&self) -> &'static ErrorCategory {
        self.category
    }
}

impl Failure for anyhow::Error {
    fn category(&self) -> &'static ErrorCategory {
        if let Some(io) = self.downcast_ref::<std::io::Error>() {
            return io.category();
        }
        if self.is::<tokio::time::error::Elapsed>() {
            return &TIMEOUT;
        }
        &GENERIC
    }
}

impl Failure for std::io::Error {
    fn category(&self) -> &'static ErrorCategory {
        match self.kind() {
            std::io::ErrorKind::TimedOut => &TIMEOUT,
            _ => &IO,
        }
    }
}

impl Failure for tokio::time::error::Elapsed {
    fn category(&self) -> &'static ErrorCategory {
        &TIMEOUT
    }
}

impl Failure for Box<dyn std::error::Error + Send + Sync> {}

impl Failure for String {
    fn detail(&self) -> String {
        format!("{}: {}", self.category(), self)
    }
}

impl Failure for &'static str {
    fn detail(&self) -> String {
        format!("{}: {}", self.category(), self)
    }
}

impl Failure for Infallible {}
