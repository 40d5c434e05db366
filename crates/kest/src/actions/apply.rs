//! Manifest-carrying mutations: apply, create, status apply, delete, label.

use kest_types::{Manifest, ResourceRef};

use crate::error::{KestError, Result};
use crate::kubectl::{ClusterClient, DeleteOptions, LabelMap, LabelOptions};

pub fn describe_apply(manifest: &Manifest) -> String {
    format!("Apply {} {}", manifest.kind(), manifest.name())
}

pub fn describe_create(manifest: &Manifest) -> String {
    format!("Create {} {}", manifest.kind(), manifest.name())
}

pub fn describe_apply_status(manifest: &Manifest) -> String {
    format!("Apply status {} {}", manifest.kind(), manifest.name())
}

pub fn describe_delete(resource: &ResourceRef) -> String {
    format!("Delete {} {}", resource.kind, resource.name)
}

pub fn describe_label(resource: &ResourceRef) -> String {
    format!("Label {} {}", resource.kind, resource.name)
}

/// The revert description for a mutation on `manifest`.
pub fn describe_revert(manifest: &Manifest) -> String {
    format!("Delete {} {}", manifest.kind(), manifest.name())
}

pub async fn apply(client: &dyn ClusterClient, manifest: &Manifest) -> Result<()> {
    client.apply(manifest).await.map(drop)
}

pub async fn create(client: &dyn ClusterClient, manifest: &Manifest) -> Result<()> {
    client.create(manifest).await.map(drop)
}

/// Input validation for status apply, checked before the action starts so
/// misuse fails immediately instead of being retried: the manifest must
/// carry the `status` being applied and the context must name a field
/// manager.
pub fn validate_apply_status(
    context: &kest_types::ClusterContext,
    manifest: &Manifest,
) -> Result<()> {
    if !manifest.has_status() {
        return Err(KestError::assertion(format!(
            "apply status of {} {} requires a status section in the manifest",
            manifest.kind(),
            manifest.name()
        )));
    }
    if context.field_manager_name.is_none() {
        return Err(KestError::assertion(
            "apply status requires fieldManagerName in the cluster context",
        ));
    }
    Ok(())
}

/// Status subresource apply.
pub async fn apply_status(client: &dyn ClusterClient, manifest: &Manifest) -> Result<()> {
    client.apply_status(manifest).await.map(drop)
}

pub async fn delete(client: &dyn ClusterClient, resource: &ResourceRef) -> Result<()> {
    client
        .delete(
            &resource.kubectl_type(),
            &resource.name,
            DeleteOptions::default(),
        )
        .await
        .map(drop)
}

pub async fn label(
    client: &dyn ClusterClient,
    resource: &ResourceRef,
    labels: &LabelMap,
    options: LabelOptions,
) -> Result<()> {
    client
        .label(&resource.kubectl_type(), &resource.name, labels, options)
        .await
        .map(drop)
}
