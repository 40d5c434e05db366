//! The shell adapter.
//!
//! Free-form `exec` actions run their commands through [`Shell`]: a thin
//! `sh -c` wrapper that records the invocation and its output as events.
//! By default captured output is streamed to the test's stdout/stderr;
//! [`Shell::quiet`] suppresses the streaming (the events still record
//! everything).

use std::process::Stdio;

use kest_types::Event;
use tracing::debug;

use crate::error::{KestError, Result};
use crate::recorder::Recorder;

/// Captured output of one shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs shell scripts, recording them as command events.
#[derive(Clone)]
pub struct Shell {
    recorder: Recorder,
    quiet: bool,
}

impl Shell {
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder,
            quiet: false,
        }
    }

    /// A copy of this shell that does not stream captured output.
    pub fn quiet(&self) -> Self {
        Self {
            recorder: self.recorder.clone(),
            quiet: true,
        }
    }

    /// Runs `script` under `sh -c`, failing on non-zero exit.
    pub async fn run(&self, script: &str) -> Result<ShellOutput> {
        debug!(script, "sh -c");
        self.recorder.record(Event::CommandRun {
            cmd: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            stdin: None,
            stdin_language: None,
        });

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        self.recorder.record(Event::CommandResult {
            exit_code,
            stdout: stdout.clone(),
            stderr: stderr.clone(),
            stdout_language: None,
            stderr_language: None,
        });

        if !self.quiet {
            if !stdout.is_empty() {
                print!("{stdout}");
            }
            if !stderr.is_empty() {
                eprint!("{stderr}");
            }
        }

        if output.status.success() {
            Ok(ShellOutput {
                exit_code,
                stdout,
                stderr,
            })
        } else {
            Err(KestError::Command {
                exit_code,
                stderr: stderr.trim_end().to_string(),
            })
        }
    }
}
