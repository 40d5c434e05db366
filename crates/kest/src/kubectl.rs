//! The cluster-client port and its `kubectl` implementation.
//!
//! The engine talks to the cluster through [`ClusterClient`], a narrow
//! capability trait. The production implementation shells out to `kubectl`;
//! tests swap in the in-memory [`crate::testing::FakeCluster`]. Both record
//! every invocation as a `CommandRun`/`CommandResult` pair so the report
//! shows exactly what ran.
//!
//! Error protocol: failures surface as human-readable messages, and a
//! missing resource's message contains the literal `(NotFound)` (which
//! `kubectl` emits verbatim). `assert_absence` relies on it.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use kest_types::{ClusterContext, Event, Manifest};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{KestError, Result};
use crate::recorder::Recorder;

/// Label changes: `Some(value)` sets, `None` removes.
pub type LabelMap = BTreeMap<String, Option<String>>;

/// Options for [`ClusterClient::delete`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Treat a missing resource as success.
    pub ignore_not_found: bool,
}

/// Options for [`ClusterClient::label`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelOptions {
    /// Allow overwriting existing label values.
    pub overwrite: bool,
}

/// Options for [`ClusterClient::patch`].
#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    /// Patch strategy (`merge`, `json`, `strategic`); the client's default
    /// when unset.
    pub patch_type: Option<String>,
}

/// Capability surface the engine needs from a cluster.
///
/// `type_name` arguments are the strings produced by
/// [`kest_types::kubectl_type`].
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// The context this client is bound to.
    fn context(&self) -> &ClusterContext;

    /// A client bound to `self`'s context with `overlay` layered on top.
    fn extend(&self, overlay: &ClusterContext) -> Arc<dyn ClusterClient>;

    /// Server-side apply.
    async fn apply(&self, manifest: &Manifest) -> Result<String>;

    /// Server-side apply against the status subresource. Requires a field
    /// manager in the context.
    async fn apply_status(&self, manifest: &Manifest) -> Result<String>;

    /// Create; fails if the resource already exists.
    async fn create(&self, manifest: &Manifest) -> Result<String>;

    /// Fetch one resource as YAML.
    async fn get(&self, type_name: &str, name: &str) -> Result<String>;

    /// List resources of a kind as a YAML list.
    async fn list(&self, type_name: &str) -> Result<String>;

    /// Patch one resource.
    async fn patch(
        &self,
        type_name: &str,
        name: &str,
        patch: &str,
        options: PatchOptions,
    ) -> Result<String>;

    /// Delete one resource.
    async fn delete(&self, type_name: &str, name: &str, options: DeleteOptions) -> Result<String>;

    /// Add, update or remove labels on one resource.
    async fn label(
        &self,
        type_name: &str,
        name: &str,
        labels: &LabelMap,
        options: LabelOptions,
    ) -> Result<String>;
}

// ============================================================================
// Argument shaping (shared with the fake cluster)
// ============================================================================

pub(crate) mod args {
    use super::{ClusterContext, DeleteOptions, LabelMap, LabelOptions, PatchOptions};

    /// Flags every invocation carries, derived from the context.
    pub fn context_flags(context: &ClusterContext) -> Vec<String> {
        let mut flags = Vec::new();
        if let Some(namespace) = &context.namespace {
            flags.push("-n".to_string());
            flags.push(namespace.clone());
        }
        if let Some(kubeconfig) = &context.kubeconfig {
            flags.push("--kubeconfig".to_string());
            flags.push(kubeconfig.clone());
        }
        if let Some(kube_context) = &context.context {
            flags.push("--context".to_string());
            flags.push(kube_context.clone());
        }
        flags
    }

    fn field_manager_flags(context: &ClusterContext) -> Vec<String> {
        match &context.field_manager_name {
            Some(manager) => vec!["--field-manager".to_string(), manager.clone()],
            None => Vec::new(),
        }
    }

    pub fn apply(context: &ClusterContext) -> Vec<String> {
        let mut args = vec![
            "apply".to_string(),
            "--server-side".to_string(),
            "-f".to_string(),
            "-".to_string(),
        ];
        args.extend(field_manager_flags(context));
        args.extend(context_flags(context));
        args
    }

    pub fn apply_status(context: &ClusterContext) -> Vec<String> {
        let mut args = vec![
            "apply".to_string(),
            "--server-side".to_string(),
            "--subresource=status".to_string(),
            "-f".to_string(),
            "-".to_string(),
        ];
        args.extend(field_manager_flags(context));
        args.extend(context_flags(context));
        args
    }

    pub fn create(context: &ClusterContext) -> Vec<String> {
        let mut args = vec!["create".to_string(), "-f".to_string(), "-".to_string()];
        args.extend(context_flags(context));
        args
    }

    pub fn get(context: &ClusterContext, type_name: &str, name: &str) -> Vec<String> {
        let mut args = vec![
            "get".to_string(),
            type_name.to_string(),
            name.to_string(),
            "-o".to_string(),
            "yaml".to_string(),
        ];
        args.extend(context_flags(context));
        args
    }

    pub fn list(context: &ClusterContext, type_name: &str) -> Vec<String> {
        let mut args = vec![
            "get".to_string(),
            type_name.to_string(),
            "-o".to_string(),
            "yaml".to_string(),
        ];
        args.extend(context_flags(context));
        args
    }

    pub fn patch(
        context: &ClusterContext,
        type_name: &str,
        name: &str,
        patch: &str,
        options: &PatchOptions,
    ) -> Vec<String> {
        let mut args = vec!["patch".to_string(), type_name.to_string(), name.to_string()];
        if let Some(patch_type) = &options.patch_type {
            args.push("--type".to_string());
            args.push(patch_type.clone());
        }
        args.push("-p".to_string());
        args.push(patch.to_string());
        args.extend(context_flags(context));
        args
    }

    pub fn delete(
        context: &ClusterContext,
        type_name: &str,
        name: &str,
        options: DeleteOptions,
    ) -> Vec<String> {
        let mut args = vec![
            "delete".to_string(),
            type_name.to_string(),
            name.to_string(),
        ];
        if options.ignore_not_found {
            args.push("--ignore-not-found".to_string());
        }
        args.extend(context_flags(context));
        args
    }

    pub fn label(
        context: &ClusterContext,
        type_name: &str,
        name: &str,
        labels: &LabelMap,
        options: LabelOptions,
    ) -> Vec<String> {
        let mut args = vec!["label".to_string(), type_name.to_string(), name.to_string()];
        for (key, value) in labels {
            match value {
                Some(value) => args.push(format!("{key}={value}")),
                None => args.push(format!("{key}-")),
            }
        }
        if options.overwrite {
            args.push("--overwrite".to_string());
        }
        args.extend(context_flags(context));
        args
    }
}

// ============================================================================
// kubectl
// ============================================================================

/// [`ClusterClient`] backed by the `kubectl` binary.
#[derive(Clone)]
pub struct Kubectl {
    program: String,
    context: ClusterContext,
    recorder: Recorder,
}

impl Kubectl {
    pub fn new(recorder: Recorder) -> Self {
        Self::with_context(recorder, ClusterContext::default())
    }

    pub fn with_context(recorder: Recorder, context: ClusterContext) -> Self {
        Self {
            program: "kubectl".to_string(),
            context,
            recorder,
        }
    }

    /// Ensures the context names a field manager, as server-side status
    /// apply requires one.
    fn require_field_manager(&self) -> Result<()> {
        if self.context.field_manager_name.is_none() {
            return Err(KestError::assertion(
                "applyStatus requires fieldManagerName in the cluster context",
            ));
        }
        Ok(())
    }

    async fn run(
        &self,
        args: Vec<String>,
        stdin: Option<String>,
        stdout_language: Option<&str>,
    ) -> Result<String> {
        debug!(?args, "kubectl");
        self.recorder.record(Event::CommandRun {
            cmd: self.program.clone(),
            args: args.clone(),
            stdin: stdin.clone(),
            stdin_language: stdin.as_ref().map(|_| "yaml".to_string()),
        });

        let mut child = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(text) = &stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(text.as_bytes()).await?;
            }
        }
        let output = child.wait_with_output().await?;

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        self.recorder.record(Event::CommandResult {
            exit_code,
            stdout: stdout.clone(),
            stderr: stderr.clone(),
            stdout_language: stdout_language.map(ToString::to_string),
            stderr_language: None,
        });

        if output.status.success() {
            Ok(stdout)
        } else {
            let message = if stderr.trim().is_empty() {
                format!("kubectl exited with code {exit_code}")
            } else {
                stderr.trim_end().to_string()
            };
            Err(KestError::cluster(message))
        }
    }
}

#[async_trait]
impl ClusterClient for Kubectl {
    fn context(&self) -> &ClusterContext {
        &self.context
    }

    fn extend(&self, overlay: &ClusterContext) -> Arc<dyn ClusterClient> {
        Arc::new(Self {
            program: self.program.clone(),
            context: self.context.layer(overlay),
            recorder: self.recorder.clone(),
        })
    }

    async fn apply(&self, manifest: &Manifest) -> Result<String> {
        self.run(args::apply(&self.context), Some(manifest.to_yaml()), None)
            .await
    }

    async fn apply_status(&self, manifest: &Manifest) -> Result<String> {
        self.require_field_manager()?;
        self.run(
            args::apply_status(&self.context),
            Some(manifest.to_yaml()),
            None,
        )
        .await
    }

    async fn create(&self, manifest: &Manifest) -> Result<String> {
        self.run(args::create(&self.context), Some(manifest.to_yaml()), None)
            .await
    }

    async fn get(&self, type_name: &str, name: &str) -> Result<String> {
        self.run(args::get(&self.context, type_name, name), None, Some("yaml"))
            .await
    }

    async fn list(&self, type_name: &str) -> Result<String> {
        self.run(args::list(&self.context, type_name), None, Some("yaml"))
            .await
    }

    async fn patch(
        &self,
        type_name: &str,
        name: &str,
        patch: &str,
        options: PatchOptions,
    ) -> Result<String> {
        self.run(
            args::patch(&self.context, type_name, name, patch, &options),
            None,
            None,
        )
        .await
    }

    async fn delete(&self, type_name: &str, name: &str, options: DeleteOptions) -> Result<String> {
        self.run(
            args::delete(&self.context, type_name, name, options),
            None,
            None,
        )
        .await
    }

    async fn label(
        &self,
        type_name: &str,
        name: &str,
        labels: &LabelMap,
        options: LabelOptions,
    ) -> Result<String> {
        self.run(
            args::label(&self.context, type_name, name, labels, options),
            None,
            None,
        )
        .await
    }
}
