//! # kest-report: Reports for kest scenario runs
//!
//! Turns a recorded scenario event stream into a human- and machine-readable
//! report:
//!
//! 1. [`parse_report`] folds the events into the [`Report`] model in one
//!    pass — the model is determined by the event sequence alone.
//! 2. [`render_markdown`] renders the model as plain Markdown.
//! 3. [`render_ansi`] layers ANSI colors on top; stripping them restores the
//!    plain Markdown byte-for-byte.
//!
//! Stack traces attached to failed actions are rendered by the [`trace`]
//! module: frames are parsed, the first user-code frame is located, and a
//! few lines of source context are shown when the file is readable.
//!
//! ```
//! use kest_types::Event;
//! use kest_report::{parse_report, render_markdown};
//!
//! let events = vec![
//!     Event::ScenarioStart { name: "demo".into() },
//!     Event::ActionStart { description: "Apply ConfigMap cm".into() },
//!     Event::ActionEnd { ok: true, error: None },
//!     Event::ScenarioEnd,
//! ];
//! let report = parse_report(&events);
//! assert!(render_markdown(&report).contains("| 1 | Apply ConfigMap cm | ✅ |"));
//! ```

mod ansi;
mod model;
mod parser;
mod render;
pub mod style;
pub mod trace;

pub use ansi::{colorize_markdown, render_ansi};
pub use model::{
    ActionReport, BddSection, CleanupCommand, CleanupItem, CommandReport, Detail, ErrorText,
    MessageLanguage, OverviewItem, Report, ScenarioReport, Status, TaggedText,
};
pub use parser::parse_report;
pub use render::render_markdown;
