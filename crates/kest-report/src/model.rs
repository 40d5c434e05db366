//! The report model.
//!
//! A [`Report`] is derived from the scenario event stream and from nothing
//! else; it is a plain value with no behavior beyond status accounting. The
//! renderer turns it into Markdown, but the model itself stays
//! format-neutral so other renderers can consume it.

use kest_types::BddKeyword;
use serde::Serialize;

// ============================================================================
// Status
// ============================================================================

/// Outcome of one action, as shown in overview and cleanup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Started but no end recorded (the scenario died inside it).
    Pending,
    Success,
    Failure,
}

impl Status {
    /// The emoji rendered for this status.
    pub fn emoji(self) -> &'static str {
        match self {
            Status::Pending => "⏳",
            Status::Success => "✅",
            Status::Failure => "❌",
        }
    }
}

// ============================================================================
// Report shape
// ============================================================================

/// The whole report: one entry per scenario, in event order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub scenarios: Vec<ScenarioReport>,
}

/// Everything recorded for one scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub name: String,
    /// One row per forward action, in execution order.
    pub overview: Vec<OverviewItem>,
    /// BDD sections and standalone actions, in execution order.
    pub details: Vec<Detail>,
    /// One row per revert action.
    pub cleanup: Vec<CleanupItem>,
    /// Whether cleanup was suppressed entirely.
    pub cleanup_skipped: bool,
}

impl ScenarioReport {
    /// A scenario that recorded nothing renders to nothing.
    pub fn is_empty(&self) -> bool {
        self.overview.is_empty()
            && self.details.is_empty()
            && self.cleanup.is_empty()
            && !self.cleanup_skipped
    }
}

/// One row of the overview table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewItem {
    pub name: String,
    pub status: Status,
}

/// A detail entry: either a BDD section holding actions, or a standalone
/// action recorded outside any section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Detail {
    Section(BddSection),
    Action(ActionReport),
}

/// Actions grouped under one `Given`/`When`/`Then`/`And`/`But` annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BddSection {
    pub keyword: BddKeyword,
    pub description: String,
    pub actions: Vec<ActionReport>,
}

/// One forward action: its commands (last retry attempt only) and outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReport {
    pub name: String,
    pub status: Status,
    /// Retry attempts, when the action retried at least once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    pub commands: Vec<CommandReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorText>,
}

impl ActionReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: Status::Pending,
            attempts: None,
            commands: Vec::new(),
            error: None,
        }
    }
}

/// A piece of text with an optional language tag for highlighting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedText {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl TaggedText {
    pub fn new(text: impl Into<String>, language: Option<String>) -> Self {
        Self {
            text: text.into(),
            language,
        }
    }

    /// Whether the text is effectively empty (whitespace only).
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One subprocess invocation of a forward action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandReport {
    pub cmd: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdin: Option<TaggedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<TaggedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<TaggedText>,
}

/// How a failed action's message should be fenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLanguage {
    /// Looks like a unified diff or `+`/`-` hunk.
    Diff,
    Text,
}

impl MessageLanguage {
    pub fn fence_tag(self) -> &'static str {
        match self {
            MessageLanguage::Diff => "diff",
            MessageLanguage::Text => "text",
        }
    }
}

/// A failed action's error, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorText {
    pub message: String,
    pub language: MessageLanguage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// One row of the cleanup table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanupItem {
    pub action: String,
    pub status: Status,
    pub command: CleanupCommand,
}

/// The command a cleanup item ran, condensed for the shellsession block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupCommand {
    pub cmd: String,
    pub args: Vec<String>,
    pub output: String,
}
