//! ANSI colorization of the rendered Markdown.
//!
//! The colorizer only ever inserts SGR escape sequences: stripping them
//! yields the plain Markdown byte-for-byte. Heredoc stdin bodies are
//! highlighted by their own declared language, not as shell; to keep line
//! correspondence they are swapped out for opaque placeholder tokens before
//! the Markdown pass and spliced back highlighted afterwards.

use std::collections::HashMap;

use owo_colors::{OwoColorize, Style};

use crate::model::{Detail, Report, TaggedText};
use crate::render::render_markdown;
use crate::style;

/// Renders the report as ANSI-colored Markdown.
///
/// `console::strip_ansi_codes(&render_ansi(r)) == render_markdown(r)` holds
/// for every report.
pub fn render_ansi(report: &Report) -> String {
    let markdown = render_markdown(report);
    colorize_markdown(&markdown, &collect_stdins(report))
}

/// Stdin blocks in the order the renderer emits their heredocs.
fn collect_stdins(report: &Report) -> Vec<TaggedText> {
    let mut stdins = Vec::new();
    for scenario in &report.scenarios {
        for detail in &scenario.details {
            let actions = match detail {
                Detail::Section(section) => section.actions.as_slice(),
                Detail::Action(action) => std::slice::from_ref(action),
            };
            for action in actions {
                for command in &action.commands {
                    if let Some(stdin) = &command.stdin {
                        if !stdin.is_blank() {
                            stdins.push(stdin.clone());
                        }
                    }
                }
            }
        }
    }
    stdins
}

// ============================================================================
// Placeholder substitution
// ============================================================================

/// Placeholder marker; a private-use character that never occurs in real
/// report text.
const MARKER: char = '\u{f8ff}';

fn placeholder(index: usize) -> String {
    format!("{MARKER}{index}{MARKER}")
}

/// Colorizes Markdown, highlighting heredoc bodies by the language of the
/// corresponding stdin block.
pub fn colorize_markdown(markdown: &str, stdins: &[TaggedText]) -> String {
    // Pass 1: swap heredoc body lines for placeholders, remembering the
    // original line and its language.
    let mut substituted = Vec::new();
    let mut replacements: HashMap<String, String> = HashMap::new();
    let mut fence: Option<String> = None;
    let mut in_heredoc = false;
    let mut stdin_index = 0usize;
    let mut token = 0usize;

    for line in markdown.lines() {
        // Heredoc bodies are opaque: even a line that looks like a fence
        // belongs to the stdin text.
        if in_heredoc {
            if line == "EOF" {
                in_heredoc = false;
                stdin_index += 1;
                substituted.push(line.to_string());
            } else {
                let key = placeholder(token);
                token += 1;
                let language = stdins.get(stdin_index).and_then(|s| s.language.clone());
                replacements.insert(key.clone(), highlight_code(line, language.as_deref()));
                substituted.push(key);
            }
            continue;
        }
        if let Some(tag) = line.strip_prefix("```") {
            if fence.is_none() {
                fence = Some(tag.to_string());
            } else {
                fence = None;
            }
            substituted.push(line.to_string());
            continue;
        }
        if fence.as_deref() == Some("shell") && line.ends_with("<<EOF") {
            in_heredoc = true;
        }
        substituted.push(line.to_string());
    }

    // Pass 2: highlight everything that is not a placeholder line.
    let mut fence: Option<String> = None;
    let mut out = String::new();
    for line in &substituted {
        let highlighted = if line.starts_with(MARKER) {
            replacements.remove(line).unwrap_or_else(|| line.clone())
        } else if let Some(tag) = line.strip_prefix("```") {
            let opening = fence.is_none();
            if opening {
                fence = Some(tag.to_string());
            } else {
                fence = None;
            }
            dimmed(line)
        } else if let Some(tag) = fence.as_deref() {
            highlight_fenced(line, tag)
        } else {
            highlight_prose(line)
        };
        out.push_str(&highlighted);
        out.push('\n');
    }
    // `lines()` dropped at most one trailing newline; restore parity.
    if !markdown.ends_with('\n') && out.ends_with('\n') {
        out.pop();
    }
    out
}

// ============================================================================
// Line highlighters
// ============================================================================

fn styled(line: &str, style: Style) -> String {
    if line.is_empty() || style::no_color() {
        return line.to_string();
    }
    line.style(style).to_string()
}

fn dimmed(line: &str) -> String {
    styled(line, style::muted_style())
}

fn highlight_prose(line: &str) -> String {
    if line.starts_with('#') {
        styled(line, style::heading_style())
    } else if line.starts_with("**") {
        styled(line, style::emphasis_style())
    } else if line.starts_with("| ---") {
        dimmed(line)
    } else if line == "Error:" {
        styled(line, style::error_style())
    } else {
        line.to_string()
    }
}

fn highlight_fenced(line: &str, tag: &str) -> String {
    match tag {
        "shell" => highlight_shell(line),
        "shellsession" => {
            if line.starts_with("$ ") {
                styled(line, style::command_style())
            } else {
                line.to_string()
            }
        }
        "yaml" => highlight_yaml(line),
        "diff" => highlight_diff(line),
        "trace" => {
            if line.trim_start().starts_with("at ") {
                dimmed(line)
            } else {
                line.to_string()
            }
        }
        _ => line.to_string(),
    }
}

fn highlight_shell(line: &str) -> String {
    if line == "EOF" {
        dimmed(line)
    } else {
        styled(line, style::command_style())
    }
}

/// Highlights one line of a language-tagged stdin block.
fn highlight_code(line: &str, language: Option<&str>) -> String {
    match language {
        Some("yaml") => highlight_yaml(line),
        Some("diff") => highlight_diff(line),
        _ => line.to_string(),
    }
}

fn highlight_yaml(line: &str) -> String {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        return dimmed(line);
    }
    // Color the key of `key: value` lines; leave everything else alone.
    if let Some(colon) = line.find(':') {
        let (key, rest) = line.split_at(colon);
        let bare = key.trim_start().trim_start_matches("- ");
        let is_key = !bare.is_empty()
            && bare
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'));
        if is_key {
            return format!("{}{rest}", styled(key, style::key_style()));
        }
    }
    line.to_string()
}

fn highlight_diff(line: &str) -> String {
    if line.starts_with("+++") || line.starts_with("---") {
        styled(line, style::file_header_style())
    } else if line.starts_with('+') {
        styled(line, style::added_style())
    } else if line.starts_with('-') {
        styled(line, style::removed_style())
    } else if line.starts_with("@@") {
        styled(line, style::hunk_style())
    } else {
        line.to_string()
    }
}
