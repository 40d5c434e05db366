//! Folding the event stream into the report model.
//!
//! The parser is a single pass over the events; it never looks ahead or
//! re-reads. Per-scenario state is a handful of "current" slots (section,
//! action, cleanup item) plus the cleanup flag, all reset on scenario
//! boundaries.
//!
//! Two rules are worth calling out:
//!
//! - **Retry command collapsing.** `RetryAttempt` clears the current
//!   action's commands, so a retried action reports only the commands of its
//!   final attempt — what a user would see rerunning it once.
//! - **Timeout cause unwrapping.** The retry engine wraps the last failure
//!   in a `Timed out after ...` error. For reporting, an action error with
//!   that message and a non-empty cause is replaced by the cause, message
//!   and stack both.

use kest_types::{ErrorSummary, Event};

use crate::model::{
    ActionReport, BddSection, CleanupCommand, CleanupItem, CommandReport, Detail, ErrorText,
    MessageLanguage, OverviewItem, Report, ScenarioReport, Status, TaggedText,
};

/// Folds an event stream into a [`Report`].
pub fn parse_report(events: &[Event]) -> Report {
    let mut parser = Parser::default();
    for event in events {
        parser.push(event);
    }
    parser.finish()
}

// ============================================================================
// Fold state
// ============================================================================

#[derive(Default)]
struct Parser {
    scenarios: Vec<ScenarioReport>,
    current: Option<ScenarioReport>,
    /// Actions attach to the last section while one is open.
    in_section: bool,
    /// Set between RevertingsStart and RevertingsEnd.
    in_cleanup: bool,
    /// Whether an action bracket is currently open (non-cleanup path).
    action_open: bool,
}

impl Parser {
    fn push(&mut self, event: &Event) {
        match event {
            Event::ScenarioStart { name } => {
                self.flush_scenario();
                self.current = Some(ScenarioReport {
                    name: name.clone(),
                    ..ScenarioReport::default()
                });
            }
            Event::ScenarioEnd => {
                self.in_section = false;
                self.in_cleanup = false;
                self.action_open = false;
            }

            Event::BddGiven { .. }
            | Event::BddWhen { .. }
            | Event::BddThen { .. }
            | Event::BddAnd { .. }
            | Event::BddBut { .. } => {
                let Some((keyword, description)) = event.as_bdd() else {
                    return;
                };
                if let Some(scenario) = self.current.as_mut() {
                    scenario.details.push(Detail::Section(BddSection {
                        keyword,
                        description: description.to_string(),
                        actions: Vec::new(),
                    }));
                    self.in_section = true;
                }
            }

            Event::ActionStart { description } => {
                if self.in_cleanup {
                    if let Some(scenario) = self.current.as_mut() {
                        scenario.cleanup.push(CleanupItem {
                            action: description.clone(),
                            status: Status::Success,
                            command: CleanupCommand::default(),
                        });
                    }
                } else if let Some(scenario) = self.current.as_mut() {
                    scenario.overview.push(OverviewItem {
                        name: description.clone(),
                        status: Status::Pending,
                    });
                    let action = ActionReport::new(description.clone());
                    if self.in_section {
                        if let Some(Detail::Section(section)) = scenario.details.last_mut() {
                            section.actions.push(action);
                        }
                    } else {
                        scenario.details.push(Detail::Action(action));
                    }
                    self.action_open = true;
                }
            }

            Event::ActionEnd { ok, error } => {
                let status = if *ok { Status::Success } else { Status::Failure };
                if self.in_cleanup {
                    if let Some(item) =
                        self.current.as_mut().and_then(|s| s.cleanup.last_mut())
                    {
                        item.status = status;
                    }
                } else if let Some(scenario) = self.current.as_mut() {
                    if let Some(item) = scenario.overview.last_mut() {
                        item.status = status;
                    }
                    if let Some(action) = current_action(scenario, self.in_section) {
                        action.status = status;
                        action.error = error.as_ref().map(error_text);
                    }
                    self.action_open = false;
                }
            }

            Event::CommandRun {
                cmd,
                args,
                stdin,
                stdin_language,
            } => {
                if self.in_cleanup {
                    if let Some(item) =
                        self.current.as_mut().and_then(|s| s.cleanup.last_mut())
                    {
                        item.command = CleanupCommand {
                            cmd: cmd.clone(),
                            args: args.clone(),
                            output: String::new(),
                        };
                    }
                } else if self.action_open {
                    if let Some(scenario) = self.current.as_mut() {
                        if let Some(action) = current_action(scenario, self.in_section) {
                            action.commands.push(CommandReport {
                                cmd: cmd.clone(),
                                args: args.clone(),
                                stdin: stdin
                                    .as_ref()
                                    .map(|text| TaggedText::new(text, stdin_language.clone())),
                                stdout: None,
                                stderr: None,
                            });
                        }
                    }
                }
            }

            Event::CommandResult {
                stdout,
                stderr,
                stdout_language,
                stderr_language,
                ..
            } => {
                if self.in_cleanup {
                    if let Some(item) =
                        self.current.as_mut().and_then(|s| s.cleanup.last_mut())
                    {
                        item.command.output = join_output(stdout, stderr);
                    }
                } else if self.action_open {
                    if let Some(scenario) = self.current.as_mut() {
                        if let Some(command) = current_action(scenario, self.in_section)
                            .and_then(|action| action.commands.last_mut())
                        {
                            command.stdout =
                                Some(TaggedText::new(stdout, stdout_language.clone()));
                            command.stderr =
                                Some(TaggedText::new(stderr, stderr_language.clone()));
                        }
                    }
                }
            }

            Event::RetryAttempt { .. } => {
                if !self.in_cleanup && self.action_open {
                    if let Some(scenario) = self.current.as_mut() {
                        if let Some(action) = current_action(scenario, self.in_section) {
                            action.commands.clear();
                        }
                    }
                }
            }

            Event::RetryEnd { attempts, .. } => {
                if !self.in_cleanup && self.action_open {
                    if let Some(scenario) = self.current.as_mut() {
                        if let Some(action) = current_action(scenario, self.in_section) {
                            action.attempts = Some(*attempts);
                        }
                    }
                }
            }
            Event::RetryStart => {}

            Event::RevertingsStart => {
                self.in_cleanup = true;
                self.action_open = false;
            }
            Event::RevertingsEnd => {
                self.in_cleanup = false;
            }
            Event::RevertingsSkipped => {
                if let Some(scenario) = self.current.as_mut() {
                    scenario.cleanup_skipped = true;
                }
            }
        }
    }

    fn flush_scenario(&mut self) {
        if let Some(scenario) = self.current.take() {
            self.scenarios.push(scenario);
        }
        self.in_section = false;
        self.in_cleanup = false;
        self.action_open = false;
    }

    fn finish(mut self) -> Report {
        self.flush_scenario();
        Report {
            scenarios: self.scenarios,
        }
    }
}

/// The action new commands and outcomes attach to: the last action of the
/// open section, or the last standalone detail entry.
fn current_action(scenario: &mut ScenarioReport, in_section: bool) -> Option<&mut ActionReport> {
    if in_section {
        match scenario.details.last_mut() {
            Some(Detail::Section(section)) => section.actions.last_mut(),
            _ => None,
        }
    } else {
        match scenario.details.last_mut() {
            Some(Detail::Action(action)) => Some(action),
            _ => None,
        }
    }
}

fn join_output(stdout: &str, stderr: &str) -> String {
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
        (false, true) => stdout.trim_end().to_string(),
        (true, false) => stderr.trim_end().to_string(),
        (true, true) => String::new(),
    }
}

// ============================================================================
// Error text
// ============================================================================

/// Prefix the retry engine stamps on synthesized timeout errors.
const TIMEOUT_PREFIX: &str = "Timed out after ";

fn error_text(summary: &ErrorSummary) -> ErrorText {
    // A timeout wrapper with a real underlying failure reports the failure.
    let effective = match (&summary.cause, summary.message.starts_with(TIMEOUT_PREFIX)) {
        (Some(cause), true) if !cause.message.is_empty() => cause.as_ref(),
        _ => summary,
    };

    ErrorText {
        message: effective.message.clone(),
        language: classify_message(&effective.message),
        stack: effective.stack.as_deref().map(strip_stack_header),
    }
}

/// Drops leading non-frame lines (`Error: ...` headers) from a stack.
fn strip_stack_header(stack: &str) -> String {
    stack
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("at "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Classifies an error message as diff-like or plain text.
///
/// Diff-like means: after ANSI stripping, at least one `+` line that is not
/// a `+++` file header AND at least one `-` line by the same rule.
fn classify_message(message: &str) -> MessageLanguage {
    let stripped = console::strip_ansi_codes(message);
    let mut has_plus = false;
    let mut has_minus = false;
    for line in stripped.lines() {
        if let Some(rest) = line.strip_prefix('+') {
            if !rest.starts_with('+') {
                has_plus = true;
            }
        } else if let Some(rest) = line.strip_prefix('-') {
            if !rest.starts_with('-') {
                has_minus = true;
            }
        }
    }
    if has_plus && has_minus {
        MessageLanguage::Diff
    } else {
        MessageLanguage::Text
    }
}
