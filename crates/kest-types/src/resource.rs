//! Resource references and manifest parsing.
//!
//! Scenario authors hand the engine manifests as YAML strings or as already
//! decoded values; [`Manifest::parse`] is the single narrow port that turns
//! any of them into a validated record. A manifest is valid when it carries
//! a non-empty `apiVersion`, `kind` and `metadata.name` — everything else is
//! the cluster's business.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Type names
// ============================================================================

/// Derives the type-name string `kubectl` resolves a kind by.
///
/// Core group resources (`apiVersion: v1`) go by their bare kind; group
/// resources go by `<kind>.<version>.<group>`, which uniquely names the kind
/// even when multiple groups define the same kind.
pub fn kubectl_type(api_version: &str, kind: &str) -> String {
    match api_version.split_once('/') {
        Some((group, version)) => format!("{kind}.{version}.{group}"),
        None => kind.to_string(),
    }
}

// ============================================================================
// Resource references
// ============================================================================

/// Identifies one named resource: `(apiVersion, kind, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// The `kubectl` type-name string for this reference's kind.
    pub fn kubectl_type(&self) -> String {
        kubectl_type(&self.api_version, &self.kind)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

impl From<(&str, &str, &str)> for ResourceRef {
    fn from((api_version, kind, name): (&str, &str, &str)) -> Self {
        Self::new(api_version, kind, name)
    }
}

/// Identifies a resource kind without naming an instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindRef {
    pub api_version: String,
    pub kind: String,
}

impl KindRef {
    pub fn new(api_version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }

    /// The `kubectl` type-name string for this kind.
    pub fn kubectl_type(&self) -> String {
        kubectl_type(&self.api_version, &self.kind)
    }
}

impl From<(&str, &str)> for KindRef {
    fn from((api_version, kind): (&str, &str)) -> Self {
        Self::new(api_version, kind)
    }
}

// ============================================================================
// Manifest parsing
// ============================================================================

/// A manifest failed validation. Lists every problem found, not just the
/// first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid manifest: {}", .issues.join("; "))]
pub struct InvalidManifest {
    pub issues: Vec<String>,
}

/// Any of the accepted manifest input shapes.
#[derive(Debug, Clone)]
pub enum ManifestSource {
    /// A YAML document.
    Yaml(String),
    /// An already decoded YAML value.
    Value(serde_yaml::Value),
    /// An already decoded JSON value.
    Json(serde_json::Value),
}

impl From<&str> for ManifestSource {
    fn from(s: &str) -> Self {
        ManifestSource::Yaml(s.to_string())
    }
}

impl From<String> for ManifestSource {
    fn from(s: String) -> Self {
        ManifestSource::Yaml(s)
    }
}

impl From<serde_yaml::Value> for ManifestSource {
    fn from(v: serde_yaml::Value) -> Self {
        ManifestSource::Value(v)
    }
}

impl From<serde_json::Value> for ManifestSource {
    fn from(v: serde_json::Value) -> Self {
        ManifestSource::Json(v)
    }
}

/// A validated manifest: the decoded document plus the identity fields the
/// engine needs to address it.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    api_version: String,
    kind: String,
    name: String,
    value: serde_yaml::Value,
}

fn non_empty_string(value: Option<&serde_yaml::Value>) -> Option<String> {
    match value {
        Some(serde_yaml::Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

impl Manifest {
    /// Parses and validates any accepted manifest shape.
    pub fn parse(source: impl Into<ManifestSource>) -> Result<Self, InvalidManifest> {
        let value: serde_yaml::Value = match source.into() {
            ManifestSource::Yaml(text) => serde_yaml::from_str(&text).map_err(|e| {
                InvalidManifest {
                    issues: vec![format!("not valid YAML: {e}")],
                }
            })?,
            ManifestSource::Value(v) => v,
            ManifestSource::Json(v) => serde_yaml::to_value(v).map_err(|e| InvalidManifest {
                issues: vec![format!("not a YAML-representable value: {e}")],
            })?,
        };

        if !value.is_mapping() {
            return Err(InvalidManifest {
                issues: vec!["manifest must be a mapping".to_string()],
            });
        }

        let mut issues = Vec::new();
        let api_version = non_empty_string(value.get("apiVersion"));
        if api_version.is_none() {
            issues.push("apiVersion must be a non-empty string".to_string());
        }
        let kind = non_empty_string(value.get("kind"));
        if kind.is_none() {
            issues.push("kind must be a non-empty string".to_string());
        }
        let name = value
            .get("metadata")
            .and_then(|metadata| non_empty_string(metadata.get("name")));
        if name.is_none() {
            issues.push("metadata.name must be a non-empty string".to_string());
        }
        if !issues.is_empty() {
            return Err(InvalidManifest { issues });
        }

        Ok(Self {
            api_version: api_version.unwrap_or_default(),
            kind: kind.unwrap_or_default(),
            name: name.unwrap_or_default(),
            value,
        })
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The decoded document.
    pub fn value(&self) -> &serde_yaml::Value {
        &self.value
    }

    pub fn resource_ref(&self) -> ResourceRef {
        ResourceRef::new(&self.api_version, &self.kind, &self.name)
    }

    pub fn kubectl_type(&self) -> String {
        kubectl_type(&self.api_version, &self.kind)
    }

    /// Whether the document carries a top-level `status` section.
    pub fn has_status(&self) -> bool {
        self.value.get("status").is_some()
    }

    /// The document re-encoded as a YAML string.
    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(&self.value).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("v1", "ConfigMap", "ConfigMap")]
    #[test_case("apps/v1", "Deployment", "Deployment.v1.apps")]
    #[test_case("networking.k8s.io/v1", "Ingress", "Ingress.v1.networking.k8s.io")]
    fn derives_kubectl_type_names(api_version: &str, kind: &str, expected: &str) {
        assert_eq!(kubectl_type(api_version, kind), expected);
    }

    #[test]
    fn parses_a_yaml_manifest() {
        let manifest = Manifest::parse(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\ndata:\n  mode: demo\n",
        )
        .unwrap();
        assert_eq!(manifest.api_version(), "v1");
        assert_eq!(manifest.kind(), "ConfigMap");
        assert_eq!(manifest.name(), "cm");
        assert_eq!(manifest.kubectl_type(), "ConfigMap");
    }

    #[test]
    fn parses_a_json_value() {
        let manifest = Manifest::parse(serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web"},
        }))
        .unwrap();
        assert_eq!(manifest.kubectl_type(), "Deployment.v1.apps");
    }

    #[test]
    fn lists_every_missing_field() {
        let err = Manifest::parse("data:\n  mode: demo\n").unwrap_err();
        assert_eq!(err.issues.len(), 3);
        assert!(err.issues[0].contains("apiVersion"));
        assert!(err.issues[1].contains("kind"));
        assert!(err.issues[2].contains("metadata.name"));
    }

    #[test]
    fn rejects_empty_identity_fields() {
        let err = Manifest::parse("apiVersion: \"\"\nkind: Pod\nmetadata:\n  name: p\n")
            .unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert!(err.issues[0].contains("apiVersion"));
    }

    #[test]
    fn rejects_non_mapping_documents() {
        let err = Manifest::parse("- just\n- a\n- list\n").unwrap_err();
        assert!(err.issues[0].contains("mapping"));
    }

    #[test]
    fn detects_a_status_section() {
        let with = Manifest::parse(
            "apiVersion: v1\nkind: Pod\nmetadata:\n  name: p\nstatus:\n  phase: Running\n",
        )
        .unwrap();
        let without =
            Manifest::parse("apiVersion: v1\nkind: Pod\nmetadata:\n  name: p\n").unwrap();
        assert!(with.has_status());
        assert!(!without.has_status());
    }
}
