//! Core data types for bounded settle-all operations.
//!
//! This module defines the settled result record, the work item handed out by
//! work sources, the concurrency limit and its clamping rules, and the
//! configuration accepted by [`Settler`](crate::Settler).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of one transform invocation.
///
/// Serializes exactly like the settle-all convention:
/// `{"status": "fulfilled", "value": ...}` or `{"status": "rejected", "reason": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Settled<R, E> {
    /// The transform completed with a value
    Fulfilled { value: R },

    /// The transform failed; the reason is passed through unmodified
    Rejected { reason: E },
}

impl<R, E> Settled<R, E> {
    /// Tag of this record, as it appears in the serialized form.
    pub fn status(&self) -> &'static str {
        match self {
            Settled::Fulfilled { .. } => "fulfilled",
            Settled::Rejected { .. } => "rejected",
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settled::Fulfilled { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Settled::Rejected { .. })
    }

    /// Borrow the fulfilled value, if any.
    pub fn value(&self) -> Option<&R> {
        match self {
            Settled::Fulfilled { value } => Some(value),
            Settled::Rejected { .. } => None,
        }
    }

    /// Borrow the rejection reason, if any.
    pub fn reason(&self) -> Option<&E> {
        match self {
            Settled::Fulfilled { .. } => None,
            Settled::Rejected { reason } => Some(reason),
        }
    }

    /// Convert back into a plain `Result`.
    pub fn into_result(self) -> Result<R, E> {
        match self {
            Settled::Fulfilled { value } => Ok(value),
            Settled::Rejected { reason } => Err(reason),
        }
    }

    pub fn map<U, F: FnOnce(R) -> U>(self, f: F) -> Settled<U, E> {
        match self {
            Settled::Fulfilled { value } => Settled::Fulfilled { value: f(value) },
            Settled::Rejected { reason } => Settled::Rejected { reason },
        }
    }

    /// Map the rejection reason, e.g. to render errors as strings for output.
    pub fn map_reason<U, F: FnOnce(E) -> U>(self, f: F) -> Settled<R, U> {
        match self {
            Settled::Fulfilled { value } => Settled::Fulfilled { value },
            Settled::Rejected { reason } => Settled::Rejected { reason: f(reason) },
        }
    }
}

impl<R, E> From<Result<R, E>> for Settled<R, E> {
    fn from(result: Result<R, E>) -> Self {
        match result {
            Ok(value) => Settled::Fulfilled { value },
            Err(reason) => Settled::Rejected { reason },
        }
    }
}

/// One unit of work: an input value, its original position, and the whole input.
///
/// Borrowing sources yield `WorkItem<&T, &[T]>`; shared sources yield
/// `WorkItem<T, Arc<[T]>>` so the item can move into a spawned task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem<V, S> {
    pub value: V,
    pub index: usize,
    pub input: S,
}

/// Requested upper bound on concurrently running workers.
///
/// Requests are normalized against the input length `n` by [`ConcurrencyLimit::clamp`]:
/// anything below 1 becomes 1 and anything above `n` becomes `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyLimit {
    /// One worker per input
    #[default]
    Unbounded,

    /// A specific request, possibly out of range
    Requested(i64),
}

impl ConcurrencyLimit {
    /// Number of workers to launch for an input of length `len`.
    ///
    /// Always in `[1, len]` for `len > 0`. Returns 1 for `len == 0`, although
    /// orchestrators short-circuit empty input before asking.
    pub fn clamp(self, len: usize) -> usize {
        let upper = len.max(1);
        match self {
            ConcurrencyLimit::Unbounded => upper,
            ConcurrencyLimit::Requested(requested) if requested < 1 => 1,
            ConcurrencyLimit::Requested(requested) => {
                usize::try_from(requested).map_or(upper, |requested| requested.min(upper))
            }
        }
    }
}

impl From<usize> for ConcurrencyLimit {
    fn from(limit: usize) -> Self {
        i64::try_from(limit).map_or(ConcurrencyLimit::Unbounded, ConcurrencyLimit::Requested)
    }
}

impl From<u32> for ConcurrencyLimit {
    fn from(limit: u32) -> Self {
        ConcurrencyLimit::Requested(i64::from(limit))
    }
}

impl From<i32> for ConcurrencyLimit {
    fn from(limit: i32) -> Self {
        ConcurrencyLimit::Requested(i64::from(limit))
    }
}

impl From<i64> for ConcurrencyLimit {
    fn from(limit: i64) -> Self {
        ConcurrencyLimit::Requested(limit)
    }
}

impl From<Option<usize>> for ConcurrencyLimit {
    fn from(limit: Option<usize>) -> Self {
        limit.map_or(ConcurrencyLimit::Unbounded, ConcurrencyLimit::from)
    }
}

impl From<f64> for ConcurrencyLimit {
    /// Non-integer requests are truncated toward zero.
    /// NaN counts as a nonsensical request (1); positive infinity as unbounded.
    fn from(limit: f64) -> Self {
        if limit.is_nan() {
            ConcurrencyLimit::Requested(1)
        } else if limit == f64::INFINITY {
            ConcurrencyLimit::Unbounded
        } else {
            // `as` saturates at the i64 bounds
            ConcurrencyLimit::Requested(limit.trunc() as i64)
        }
    }
}

impl FromStr for ConcurrencyLimit {
    type Err = String;

    /// Accepts "max", "unbounded", "all", an integer, or a decimal number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "max" | "unbounded" | "all" => Ok(ConcurrencyLimit::Unbounded),
            _ => {
                if let Ok(requested) = s.parse::<i64>() {
                    Ok(ConcurrencyLimit::Requested(requested))
                } else if let Ok(requested) = s.parse::<f64>() {
                    Ok(ConcurrencyLimit::from(requested))
                } else {
                    Err(format!(
                        "Invalid concurrency '{}'. Use a number or 'max'",
                        s
                    ))
                }
            }
        }
    }
}

impl fmt::Display for ConcurrencyLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyLimit::Unbounded => write!(f, "max"),
            ConcurrencyLimit::Requested(requested) => write!(f, "{}", requested),
        }
    }
}

/// Configuration for a [`Settler`](crate::Settler).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleConfig {
    /// Maximum number of concurrently running workers
    /// Default: unbounded (one worker per input)
    pub concurrency: ConcurrencyLimit,

    /// Label attached to trace events as the `run` field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl SettleConfig {
    /// Set the concurrency limit. Out-of-range values are clamped per run.
    pub fn with_concurrency(mut self, concurrency: impl Into<ConcurrencyLimit>) -> Self {
        self.concurrency = concurrency.into();
        self
    }

    /// Set the label reported in trace events.
    pub fn with_label<L: Into<String>>(mut self, label: L) -> Self {
        self.label = Some(label.into());
        self
    }
}
