//! Markdown rendering of the report model.
//!
//! The output is plain GitHub-flavored Markdown: an overview table, a
//! details section mirroring the BDD structure, and a cleanup table with a
//! single shellsession transcript. The ANSI layer (`ansi`) colors this
//! output without changing a byte of it.

use std::fmt::Write;

use crate::model::{
    ActionReport, CleanupItem, CommandReport, Detail, Report, ScenarioReport, TaggedText,
};
use crate::trace;

/// Notice shown in place of the cleanup table when cleanup was suppressed.
const CLEANUP_SKIPPED_NOTICE: &str =
    "Cleanup was skipped; the resources created by this scenario were left in place.";

/// Renders the whole report as Markdown. Empty scenarios contribute nothing;
/// an empty report renders to the empty string.
pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();
    for scenario in &report.scenarios {
        if scenario.is_empty() {
            continue;
        }
        render_scenario(&mut out, scenario);
    }
    out
}

fn render_scenario(out: &mut String, scenario: &ScenarioReport) {
    let _ = writeln!(out, "# {}", scenario.name);
    let _ = writeln!(out);

    if !scenario.overview.is_empty() {
        let _ = writeln!(out, "## Scenario Overview");
        let _ = writeln!(out);
        let _ = writeln!(out, "| # | Action | Status |");
        let _ = writeln!(out, "| --- | --- | --- |");
        for (i, item) in scenario.overview.iter().enumerate() {
            let _ = writeln!(out, "| {} | {} | {} |", i + 1, item.name, item.status.emoji());
        }
        let _ = writeln!(out);
    }

    if !scenario.details.is_empty() {
        let _ = writeln!(out, "## Scenario Details");
        let _ = writeln!(out);
        for detail in &scenario.details {
            match detail {
                Detail::Section(section) => {
                    let _ = writeln!(out, "### {}: {}", section.keyword, section.description);
                    let _ = writeln!(out);
                    for action in &section.actions {
                        render_action(out, action);
                    }
                }
                Detail::Action(action) => render_action(out, action),
            }
        }
    }

    if scenario.cleanup_skipped {
        let _ = writeln!(out, "## Cleanup (skipped)");
        let _ = writeln!(out);
        let _ = writeln!(out, "{CLEANUP_SKIPPED_NOTICE}");
        let _ = writeln!(out);
    } else if !scenario.cleanup.is_empty() {
        render_cleanup(out, &scenario.cleanup);
    }
}

// ============================================================================
// Actions
// ============================================================================

fn render_action(out: &mut String, action: &ActionReport) {
    let failed_suffix = match (action.error.is_some(), action.attempts) {
        (true, Some(attempts)) => format!(" (Failed after {attempts} attempts)"),
        _ => String::new(),
    };
    let _ = writeln!(
        out,
        "**{} {}{}**",
        action.status.emoji(),
        action.name,
        failed_suffix
    );
    let _ = writeln!(out);

    for command in &action.commands {
        render_command(out, command);
    }

    if let Some(error) = &action.error {
        let _ = writeln!(out, "Error:");
        let _ = writeln!(out);
        let _ = writeln!(out, "```{}", error.language.fence_tag());
        let _ = writeln!(out, "{}", error.message.trim_end());
        let _ = writeln!(out, "```");
        let _ = writeln!(out);
        if let Some(stack) = &error.stack {
            let rendered = trace::render_trace(stack);
            if !rendered.is_empty() {
                let _ = writeln!(out, "```trace");
                let _ = writeln!(out, "{rendered}");
                let _ = writeln!(out, "```");
                let _ = writeln!(out);
            }
        }
    }
}

/// Joins `cmd` and its args the way a user would retype them.
pub(crate) fn shell_line(cmd: &str, args: &[String]) -> String {
    let mut line = String::from(cmd);
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.chars().any(char::is_whitespace) {
            let _ = write!(line, "'{arg}'");
        } else {
            line.push_str(arg);
        }
    }
    line
}

fn render_command(out: &mut String, command: &CommandReport) {
    let line = shell_line(&command.cmd, &command.args);

    let _ = writeln!(out, "```shell");
    match &command.stdin {
        Some(stdin) if !stdin.is_blank() => {
            let _ = writeln!(out, "{line} <<EOF");
            let _ = writeln!(out, "{}", stdin.text.trim_end_matches('\n'));
            let _ = writeln!(out, "EOF");
        }
        _ => {
            let _ = writeln!(out, "{line}");
        }
    }
    let _ = writeln!(out, "```");
    let _ = writeln!(out);

    render_stream(out, "stdout", command.stdout.as_ref());
    render_stream(out, "stderr", command.stderr.as_ref());
}

fn render_stream(out: &mut String, label: &str, text: Option<&TaggedText>) {
    let Some(text) = text else { return };
    if text.is_blank() {
        return;
    }
    let _ = writeln!(out, "{label}:");
    let _ = writeln!(out);
    let _ = writeln!(out, "```{}", text.language.as_deref().unwrap_or_default());
    let _ = writeln!(out, "{}", text.text.trim_end());
    let _ = writeln!(out, "```");
    let _ = writeln!(out);
}

// ============================================================================
// Cleanup
// ============================================================================

fn render_cleanup(out: &mut String, cleanup: &[CleanupItem]) {
    let _ = writeln!(out, "## Cleanup");
    let _ = writeln!(out);
    let _ = writeln!(out, "| # | Action | Status |");
    let _ = writeln!(out, "| --- | --- | --- |");
    for (i, item) in cleanup.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | {} | {} |",
            i + 1,
            item.action,
            item.status.emoji()
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "```shellsession");
    for (i, item) in cleanup.iter().enumerate() {
        if i > 0 {
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "$ {}", shell_line(&item.command.cmd, &item.command.args));
        if !item.command.output.trim().is_empty() {
            let _ = writeln!(out, "{}", item.command.output.trim_end());
        }
    }
    let _ = writeln!(out, "```");
    let _ = writeln!(out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BddSection, CleanupCommand, ErrorText, MessageLanguage, OverviewItem, Status,
    };
    use kest_types::BddKeyword;

    fn sample_command() -> CommandReport {
        CommandReport {
            cmd: "kubectl".into(),
            args: vec!["apply".into(), "-f".into(), "-".into()],
            stdin: Some(TaggedText::new(
                "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\n",
                Some("yaml".into()),
            )),
            stdout: Some(TaggedText::new("configmap/cm created\n", None)),
            stderr: Some(TaggedText::new("", None)),
        }
    }

    #[test]
    fn empty_report_renders_to_the_empty_string() {
        assert_eq!(render_markdown(&Report::default()), "");
        let report = Report {
            scenarios: vec![ScenarioReport {
                name: "nothing happened".into(),
                ..ScenarioReport::default()
            }],
        };
        assert_eq!(render_markdown(&report), "");
    }

    #[test]
    fn renders_overview_table_with_status_emoji() {
        let report = Report {
            scenarios: vec![ScenarioReport {
                name: "demo".into(),
                overview: vec![
                    OverviewItem {
                        name: "Apply ConfigMap cm".into(),
                        status: Status::Success,
                    },
                    OverviewItem {
                        name: "Assert ConfigMap cm".into(),
                        status: Status::Failure,
                    },
                ],
                ..ScenarioReport::default()
            }],
        };
        let md = render_markdown(&report);
        assert!(md.starts_with("# demo\n"));
        assert!(md.contains("## Scenario Overview"));
        assert!(md.contains("| 1 | Apply ConfigMap cm | ✅ |"));
        assert!(md.contains("| 2 | Assert ConfigMap cm | ❌ |"));
    }

    #[test]
    fn renders_bdd_sections_and_heredoc_commands() {
        let report = Report {
            scenarios: vec![ScenarioReport {
                name: "demo".into(),
                details: vec![Detail::Section(BddSection {
                    keyword: BddKeyword::When,
                    description: "applying a config map".into(),
                    actions: vec![ActionReport {
                        commands: vec![sample_command()],
                        status: Status::Success,
                        ..ActionReport::new("Apply ConfigMap cm")
                    }],
                })],
                ..ScenarioReport::default()
            }],
        };
        let md = render_markdown(&report);
        assert!(md.contains("### When: applying a config map"));
        assert!(md.contains("**✅ Apply ConfigMap cm**"));
        assert!(md.contains("kubectl apply -f - <<EOF\n"));
        assert!(md.contains("\nEOF\n```"));
        assert!(md.contains("stdout:\n\n```\nconfigmap/cm created\n```"));
        // Blank stderr is omitted entirely.
        assert!(!md.contains("stderr:"));
    }

    #[test]
    fn failed_actions_show_attempts_and_error_fences() {
        let report = Report {
            scenarios: vec![ScenarioReport {
                name: "demo".into(),
                details: vec![Detail::Action(ActionReport {
                    status: Status::Failure,
                    attempts: Some(24),
                    error: Some(ErrorText {
                        message: "+mode: demo\n-mode: prod".into(),
                        language: MessageLanguage::Diff,
                        stack: None,
                    }),
                    ..ActionReport::new("Assert ConfigMap cm")
                })],
                ..ScenarioReport::default()
            }],
        };
        let md = render_markdown(&report);
        assert!(md.contains("**❌ Assert ConfigMap cm (Failed after 24 attempts)**"));
        assert!(md.contains("Error:\n\n```diff\n+mode: demo\n-mode: prod\n```"));
    }

    #[test]
    fn renders_the_cleanup_table_and_shellsession() {
        let report = Report {
            scenarios: vec![ScenarioReport {
                name: "demo".into(),
                cleanup: vec![
                    CleanupItem {
                        action: "Delete ConfigMap cm".into(),
                        status: Status::Success,
                        command: CleanupCommand {
                            cmd: "kubectl".into(),
                            args: vec!["delete".into(), "ConfigMap".into(), "cm".into()],
                            output: "configmap \"cm\" deleted".into(),
                        },
                    },
                    CleanupItem {
                        action: "Delete Namespace ns1".into(),
                        status: Status::Success,
                        command: CleanupCommand {
                            cmd: "kubectl".into(),
                            args: vec!["delete".into(), "Namespace".into(), "ns1".into()],
                            output: "namespace \"ns1\" deleted".into(),
                        },
                    },
                ],
                ..ScenarioReport::default()
            }],
        };
        let md = render_markdown(&report);
        assert!(md.contains("## Cleanup\n"));
        assert!(md.contains("| 1 | Delete ConfigMap cm | ✅ |"));
        assert!(md.contains(
            "```shellsession\n$ kubectl delete ConfigMap cm\nconfigmap \"cm\" deleted\n\n$ kubectl delete Namespace ns1\nnamespace \"ns1\" deleted\n```"
        ));
    }

    #[test]
    fn skipped_cleanup_renders_the_fixed_notice() {
        let report = Report {
            scenarios: vec![ScenarioReport {
                name: "demo".into(),
                cleanup_skipped: true,
                ..ScenarioReport::default()
            }],
        };
        let md = render_markdown(&report);
        assert!(md.contains("## Cleanup (skipped)"));
        assert!(md.contains(CLEANUP_SKIPPED_NOTICE));
    }

    #[test]
    fn shell_line_quotes_arguments_with_whitespace() {
        assert_eq!(
            shell_line("sh", &["-c".into(), "echo hello world".into()]),
            "sh -c 'echo hello world'"
        );
    }
}
