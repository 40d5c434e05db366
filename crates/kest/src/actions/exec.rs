//! Free-form shell actions.
//!
//! `exec` runs a user closure against the shell adapter and registers the
//! matching revert closure (or a no-op) so shell-side state participates in
//! cleanup like any other mutation.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::shell::Shell;

/// A user closure run against the shell adapter.
pub type ExecFn = Arc<dyn Fn(Shell) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Input to the `exec` action: a name for the report, the forward closure,
/// and an optional revert closure.
#[derive(Clone)]
pub struct ExecInput {
    pub name: String,
    pub run: ExecFn,
    pub revert: Option<ExecFn>,
}

impl ExecInput {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(Shell) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(run),
            revert: None,
        }
    }

    pub fn with_revert<F>(mut self, revert: F) -> Self
    where
        F: Fn(Shell) -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        self.revert = Some(Arc::new(revert));
        self
    }

    pub fn describe(&self) -> String {
        format!("Exec {}", self.name)
    }

    pub fn describe_revert(&self) -> String {
        format!("Revert {}", self.name)
    }
}
