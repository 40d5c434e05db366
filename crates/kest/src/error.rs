//! Engine errors.
//!
//! Every failure the engine can surface is a [`KestError`]. Cluster call
//! failures carry the client's human-readable message verbatim; the
//! `(NotFound)` substring in that message is the protocol by which
//! `assert_absence` recognizes a missing resource.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::time::Duration;

use kest_types::{ErrorSummary, InvalidDuration, InvalidManifest, format_duration};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KestError>;

/// Substring the cluster client includes in "not found" error messages.
pub const NOT_FOUND_MARKER: &str = "(NotFound)";

/// Any failure surfaced by the engine.
#[derive(Debug, Error)]
pub enum KestError {
    /// A duration string did not match the grammar.
    #[error(transparent)]
    InvalidDuration(#[from] InvalidDuration),

    /// A manifest failed validation.
    #[error(transparent)]
    InvalidManifest(#[from] InvalidManifest),

    /// The cluster client reported a failure.
    #[error("{message}")]
    Cluster { message: String },

    /// A shell command exited non-zero.
    #[error("command failed with exit code {exit_code}: {stderr}")]
    Command { exit_code: i32, stderr: String },

    /// A user test callback (or an engine-side verification) failed.
    #[error("{message}")]
    Assertion {
        message: String,
        stack: Option<String>,
    },

    /// An operation expected to fail succeeded instead.
    #[error("expected {description} to fail, but it succeeded")]
    UnexpectedSuccess { description: String },

    /// The retry budget ran out. The last underlying failure, when one
    /// exists, is preserved as the cause.
    #[error("Timed out after {}", format_duration(*budget))]
    TimedOut {
        budget: Duration,
        #[source]
        cause: Option<Box<KestError>>,
    },

    /// A subprocess could not be spawned or awaited.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl KestError {
    /// An assertion failure, with a backtrace when the environment enables
    /// backtrace capture.
    pub fn assertion(message: impl Into<String>) -> Self {
        let backtrace = Backtrace::capture();
        let stack = matches!(backtrace.status(), BacktraceStatus::Captured)
            .then(|| backtrace.to_string());
        KestError::Assertion {
            message: message.into(),
            stack,
        }
    }

    /// A cluster failure with the given message.
    pub fn cluster(message: impl Into<String>) -> Self {
        KestError::Cluster {
            message: message.into(),
        }
    }

    /// Whether this is the cluster's "resource does not exist" failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KestError::Cluster { message } if message.contains(NOT_FOUND_MARKER))
    }

    fn kind_name(&self) -> &'static str {
        match self {
            KestError::InvalidDuration(_) => "InvalidDuration",
            KestError::InvalidManifest(_) => "InvalidManifest",
            KestError::Cluster { .. } => "Cluster",
            KestError::Command { .. } => "Command",
            KestError::Assertion { .. } => "Assertion",
            KestError::UnexpectedSuccess { .. } => "UnexpectedSuccess",
            KestError::TimedOut { .. } => "TimedOut",
            KestError::Io(_) => "Io",
        }
    }

    fn stack(&self) -> Option<&str> {
        match self {
            KestError::Assertion { stack, .. } => stack.as_deref(),
            _ => None,
        }
    }

    /// Converts into the serializable summary recorded in events, keeping
    /// the cause chain and per-link stacks.
    pub fn summary(&self) -> ErrorSummary {
        let cause = match self {
            KestError::TimedOut { cause, .. } => {
                cause.as_deref().map(|c| Box::new(c.summary()))
            }
            other => std::error::Error::source(other)
                .map(|src| Box::new(ErrorSummary::from_error(src))),
        };
        ErrorSummary {
            name: Some(self.kind_name().to_string()),
            message: self.to_string(),
            stack: self.stack().map(ToString::to_string),
            cause,
        }
    }
}
