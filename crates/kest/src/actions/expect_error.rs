//! Expected-failure mutations.
//!
//! `assert_apply_error` / `assert_create_error` invert the usual contract:
//! the mutation is supposed to be rejected (by validation, an admission
//! webhook, an immutable field). If the cluster admits it anyway, the
//! attempt deletes what it created and fails with an unexpected-success
//! error — which the retry wrapper then retries, covering webhooks that
//! need a moment to come up. Once the mutation is rejected, the user
//! callback judges the error.

use kest_types::Manifest;
use tracing::warn;

use super::ErrorTestFn;
use crate::error::{KestError, Result};
use crate::kubectl::{ClusterClient, DeleteOptions};

pub fn describe_apply_error(manifest: &Manifest) -> String {
    format!("Assert apply error {} {}", manifest.kind(), manifest.name())
}

pub fn describe_create_error(manifest: &Manifest) -> String {
    format!("Assert create error {} {}", manifest.kind(), manifest.name())
}

enum Mutation {
    Apply,
    Create,
}

async fn expect_error(
    client: &dyn ClusterClient,
    manifest: &Manifest,
    test: &ErrorTestFn,
    mutation: Mutation,
) -> Result<()> {
    let (outcome, verb) = match mutation {
        Mutation::Apply => (client.apply(manifest).await, "apply"),
        Mutation::Create => (client.create(manifest).await, "create"),
    };
    match outcome {
        Ok(_) => {
            // Undo the admitted mutation before failing the attempt so the
            // next attempt starts from a clean slate.
            if let Err(err) = client
                .delete(
                    &manifest.kubectl_type(),
                    manifest.name(),
                    DeleteOptions {
                        ignore_not_found: true,
                    },
                )
                .await
            {
                warn!(error = %err, "failed to undo unexpectedly admitted mutation");
            }
            Err(KestError::UnexpectedSuccess {
                description: format!(
                    "{verb} of {} {}",
                    manifest.kind(),
                    manifest.name()
                ),
            })
        }
        Err(err) => test(&err),
    }
}

/// Applies, expecting rejection; runs `test` against the rejection error.
pub async fn assert_apply_error(
    client: &dyn ClusterClient,
    manifest: &Manifest,
    test: &ErrorTestFn,
) -> Result<()> {
    expect_error(client, manifest, test, Mutation::Apply).await
}

/// Creates, expecting rejection; runs `test` against the rejection error.
pub async fn assert_create_error(
    client: &dyn ClusterClient,
    manifest: &Manifest,
    test: &ErrorTestFn,
) -> Result<()> {
    expect_error(client, manifest, test, Mutation::Create).await
}
