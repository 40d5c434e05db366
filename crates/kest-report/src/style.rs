//! Semantic styles for the ANSI report layer.
//!
//! The colorizer never hard-codes colors; it asks this module for the
//! style of a semantic role (heading, command, added line, ...). Swapping
//! the theme means editing one place. A global switch turns all styling
//! off for consumers that want ANSI-free output without changing call
//! sites.

use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::Style;

/// Global flag to disable all styling.
static NO_COLOR: AtomicBool = AtomicBool::new(false);

/// Disables (or re-enables) all styling process-wide.
pub fn set_no_color(value: bool) {
    NO_COLOR.store(value, Ordering::SeqCst);
}

/// Whether styling is currently disabled.
pub fn no_color() -> bool {
    NO_COLOR.load(Ordering::SeqCst)
}

/// Markdown headings.
pub fn heading_style() -> Style {
    Style::new().bold().cyan()
}

/// Bold action lines.
pub fn emphasis_style() -> Style {
    Style::new().bold()
}

/// Fence markers, table separators, stack frames.
pub fn muted_style() -> Style {
    Style::new().dimmed()
}

/// The `Error:` marker.
pub fn error_style() -> Style {
    Style::new().red().bold()
}

/// Shell command lines.
pub fn command_style() -> Style {
    Style::new().bold()
}

/// YAML mapping keys.
pub fn key_style() -> Style {
    Style::new().cyan()
}

/// Added diff lines.
pub fn added_style() -> Style {
    Style::new().green()
}

/// Removed diff lines.
pub fn removed_style() -> Style {
    Style::new().red()
}

/// Diff hunk headers.
pub fn hunk_style() -> Style {
    Style::new().cyan()
}

/// Diff file headers.
pub fn file_header_style() -> Style {
    Style::new().bold()
}
