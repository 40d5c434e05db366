//! Observing actions: get, assert, absence, list and exactly-one asserts.
//!
//! All of these fetch through the cluster client and hand the parsed value
//! to engine-side verification or a user callback. They never register
//! reverts; failures are retried by the scenario's retry wrapper.

use kest_types::{KindRef, Manifest, ResourceRef};
use serde_yaml::Value;

use super::{TestFn, WhereFn};
use crate::error::{KestError, Result};
use crate::kubectl::ClusterClient;

pub fn describe_get(resource: &ResourceRef) -> String {
    format!("Get {} {}", resource.kind, resource.name)
}

pub fn describe_assert(resource: &ResourceRef) -> String {
    format!("Assert {} {}", resource.kind, resource.name)
}

pub fn describe_assert_absence(resource: &ResourceRef) -> String {
    format!("Assert absence {} {}", resource.kind, resource.name)
}

pub fn describe_assert_list(kind: &KindRef) -> String {
    format!("Assert list {}", kind.kind)
}

pub fn describe_assert_one(kind: &KindRef) -> String {
    format!("Assert one {}", kind.kind)
}

/// Fetches one resource and verifies its identity matches the reference.
pub async fn get(client: &dyn ClusterClient, resource: &ResourceRef) -> Result<Manifest> {
    let yaml = client
        .get(&resource.kubectl_type(), &resource.name)
        .await?;
    let manifest = Manifest::parse(yaml.as_str())?;
    verify_identity(&manifest, resource)?;
    Ok(manifest)
}

fn verify_identity(manifest: &Manifest, resource: &ResourceRef) -> Result<()> {
    if manifest.api_version() != resource.api_version
        || manifest.kind() != resource.kind
        || manifest.name() != resource.name
    {
        return Err(KestError::assertion(format!(
            "fetched {}/{} {} does not match the requested {}/{} {}",
            manifest.api_version(),
            manifest.kind(),
            manifest.name(),
            resource.api_version,
            resource.kind,
            resource.name,
        )));
    }
    Ok(())
}

/// Fetches the resource and runs the user callback against it.
pub async fn assert_object(
    client: &dyn ClusterClient,
    resource: &ResourceRef,
    test: &TestFn,
) -> Result<()> {
    let manifest = get(client, resource).await?;
    test(manifest.value())
}

/// Succeeds only when the fetch fails with the `(NotFound)` signal.
pub async fn assert_absence(client: &dyn ClusterClient, resource: &ResourceRef) -> Result<()> {
    match client.get(&resource.kubectl_type(), &resource.name).await {
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => Err(err),
        Ok(_) => Err(KestError::assertion(format!(
            "expected {} {} to be absent, but it exists",
            resource.kind, resource.name
        ))),
    }
}

fn parse_list(kind: &KindRef, yaml: &str) -> Result<Value> {
    let value: Value = serde_yaml::from_str(yaml).map_err(|e| {
        KestError::cluster(format!("list response was not valid YAML: {e}"))
    })?;
    let items = value
        .get("items")
        .and_then(Value::as_sequence)
        .ok_or_else(|| {
            KestError::cluster("list response carried no items sequence".to_string())
        })?;
    for item in items {
        let item_kind = item.get("kind").and_then(Value::as_str).unwrap_or_default();
        if item_kind != kind.kind {
            return Err(KestError::assertion(format!(
                "list of {} contained a {item_kind}",
                kind.kind
            )));
        }
    }
    Ok(value)
}

/// Lists resources of the kind, verifies item kinds, and runs the callback
/// against the whole list object.
pub async fn assert_list(
    client: &dyn ClusterClient,
    kind: &KindRef,
    test: &TestFn,
) -> Result<()> {
    let yaml = client.list(&kind.kubectl_type()).await?;
    let list = parse_list(kind, &yaml)?;
    test(&list)
}

/// Lists, optionally filters, requires exactly one match, and runs the
/// callback against it.
pub async fn assert_one(
    client: &dyn ClusterClient,
    kind: &KindRef,
    filter: Option<&WhereFn>,
    test: &TestFn,
) -> Result<()> {
    let yaml = client.list(&kind.kubectl_type()).await?;
    let list = parse_list(kind, &yaml)?;
    let items = list
        .get("items")
        .and_then(Value::as_sequence)
        .cloned()
        .unwrap_or_default();

    let matching: Vec<&Value> = match filter {
        Some(filter) => items.iter().filter(|item| filter(item)).collect(),
        None => items.iter().collect(),
    };
    match matching.as_slice() {
        [one] => test(one),
        [] => Err(KestError::assertion(format!(
            "expected exactly one {}, found none",
            kind.kind
        ))),
        many => Err(KestError::assertion(format!(
            "expected exactly one {}, found {}",
            kind.kind,
            many.len()
        ))),
    }
}
