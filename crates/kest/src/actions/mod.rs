//! The action catalogue.
//!
//! An action is one named, observable step: a describe string for the
//! report, a body executed (per attempt) under the retry engine, and — for
//! mutating actions — a revert callback built after the forward phase
//! succeeds. The scenario runtime (`crate::scenario`) owns the event
//! bracketing and revert registration; these modules own the semantics.

pub mod apply;
pub mod exec;
pub mod expect_error;
pub mod namespace;
pub mod query;

use std::sync::Arc;

use serde_yaml::Value;

use crate::error::{KestError, Result};
use crate::kubectl::{ClusterClient, DeleteOptions};
use crate::reverting::RevertFn;

/// A user test callback over a fetched object. Invoked once per retry
/// attempt; return an error to keep polling.
pub type TestFn = Arc<dyn Fn(&Value) -> Result<()> + Send + Sync>;

/// A user test callback over an expected error.
pub type ErrorTestFn = Arc<dyn Fn(&KestError) -> Result<()> + Send + Sync>;

/// A predicate over list items, for `assert_one`.
pub type WhereFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Wraps a plain closure into a [`TestFn`].
pub fn test_fn<F>(f: F) -> TestFn
where
    F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The standard revert for a created or applied resource: delete it by kind
/// and name, tolerating that someone already removed it.
pub(crate) fn delete_revert(
    client: Arc<dyn ClusterClient>,
    type_name: String,
    name: String,
) -> RevertFn {
    Arc::new(move || {
        let client = client.clone();
        let type_name = type_name.clone();
        let name = name.clone();
        Box::pin(async move {
            client
                .delete(
                    &type_name,
                    &name,
                    DeleteOptions {
                        ignore_not_found: true,
                    },
                )
                .await
                .map(drop)
        })
    })
}
