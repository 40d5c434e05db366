//! The scenario event stream.
//!
//! Every observable step of a scenario run appends one [`Event`] to the
//! recorder, in program order. The stream is the single source of truth:
//! the report model is derived from it and from nothing else.
//!
//! The set of kinds is closed. Stream well-formedness (balanced action
//! brackets, retry brackets only inside actions, cleanup after all forward
//! actions) is guaranteed by the scenario runtime and checked by tests, not
//! enforced here.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Error summaries
// ============================================================================

/// A serializable summary of an error, with its cause chain.
///
/// `cause` mirrors `std::error::Error::source`: each link carries its own
/// message and optional stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSummary {
    /// Error type name, when one is known (e.g. `Assertion`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Captured stack trace, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// The underlying error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ErrorSummary>>,
}

impl ErrorSummary {
    /// Builds a summary with just a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            name: None,
            message: message.into(),
            stack: None,
            cause: None,
        }
    }

    /// Builds a summary from an error value, walking its source chain into
    /// nested `cause` links.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self {
            name: None,
            message: err.to_string(),
            stack: None,
            cause: err.source().map(|src| Box::new(Self::from_error(src))),
        }
    }

    /// The innermost cause, or `self` when there is none.
    pub fn root_cause(&self) -> &ErrorSummary {
        match &self.cause {
            Some(cause) => cause.root_cause(),
            None => self,
        }
    }
}

// ============================================================================
// BDD keywords
// ============================================================================

/// Gherkin-style keyword partitioning actions into sections for reporting.
///
/// Keywords have no execution effect; they only shape the rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BddKeyword {
    Given,
    When,
    Then,
    And,
    But,
}

impl fmt::Display for BddKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BddKeyword::Given => "Given",
            BddKeyword::When => "When",
            BddKeyword::Then => "Then",
            BddKeyword::And => "And",
            BddKeyword::But => "But",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Retry outcome
// ============================================================================

/// Why a retry bracket ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryReason {
    /// An attempt succeeded before the deadline.
    Success,
    /// The time budget ran out.
    Timeout,
}

// ============================================================================
// Events
// ============================================================================

/// One record of the scenario event stream.
///
/// Serialized with an explicit `kind` tag so event dumps stay readable as
/// YAML and stable across field additions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Event {
    /// A scenario began. Precedes every other event of that scenario.
    ScenarioStart { name: String },
    /// The scenario's body and cleanup are complete.
    ScenarioEnd,

    /// `given(...)` annotation.
    #[serde(rename = "BDDGiven")]
    BddGiven { description: String },
    /// `when(...)` annotation.
    #[serde(rename = "BDDWhen")]
    BddWhen { description: String },
    /// `then(...)` annotation.
    #[serde(rename = "BDDThen")]
    BddThen { description: String },
    /// `and(...)` annotation.
    #[serde(rename = "BDDAnd")]
    BddAnd { description: String },
    /// `but(...)` annotation.
    #[serde(rename = "BDDBut")]
    BddBut { description: String },

    /// An action's forward (or revert) phase began.
    ActionStart { description: String },
    /// The matching end of the innermost open action.
    #[serde(rename_all = "camelCase")]
    ActionEnd {
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorSummary>,
    },

    /// A subprocess was invoked.
    #[serde(rename_all = "camelCase")]
    CommandRun {
        cmd: String,
        args: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stdin: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stdin_language: Option<String>,
    },
    /// The subprocess from the preceding `CommandRun` finished.
    #[serde(rename_all = "camelCase")]
    CommandResult {
        exit_code: i32,
        stdout: String,
        stderr: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stdout_language: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stderr_language: Option<String>,
    },

    /// The first invocation failed; the retry loop is engaged.
    RetryStart,
    /// One paced re-invocation (1-based).
    RetryAttempt { attempt: u32 },
    /// The retry loop ended, by success or by exhausting the budget.
    RetryEnd {
        attempts: u32,
        success: bool,
        reason: RetryReason,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<ErrorSummary>,
    },

    /// Cleanup began draining the reverting stack.
    RevertingsStart,
    /// Cleanup finished (cleanly, or after restoring a failed callback).
    RevertingsEnd,
    /// Cleanup was suppressed; no revert callbacks ran.
    RevertingsSkipped,
}

impl Event {
    /// Builds the BDD event for a keyword.
    pub fn bdd(keyword: BddKeyword, description: impl Into<String>) -> Self {
        let description = description.into();
        match keyword {
            BddKeyword::Given => Event::BddGiven { description },
            BddKeyword::When => Event::BddWhen { description },
            BddKeyword::Then => Event::BddThen { description },
            BddKeyword::And => Event::BddAnd { description },
            BddKeyword::But => Event::BddBut { description },
        }
    }

    /// The BDD keyword and description, when this is a BDD event.
    pub fn as_bdd(&self) -> Option<(BddKeyword, &str)> {
        match self {
            Event::BddGiven { description } => Some((BddKeyword::Given, description)),
            Event::BddWhen { description } => Some((BddKeyword::When, description)),
            Event::BddThen { description } => Some((BddKeyword::Then, description)),
            Event::BddAnd { description } => Some((BddKeyword::And, description)),
            Event::BddBut { description } => Some((BddKeyword::But, description)),
            _ => None,
        }
    }
}
