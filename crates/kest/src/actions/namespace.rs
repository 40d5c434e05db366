//! Namespace creation.
//!
//! Scenarios isolate themselves in ephemeral namespaces. The input decides
//! the naming: omitted input draws a fresh `kest-<suffix>` name, a string
//! pins the exact name, and `generate_name` draws a suffix under a caller
//! prefix. Auto-generated names are redrawn on every attempt, so a name
//! collision simply retries with a different name.

use kest_types::{DEFAULT_NAME_PREFIX, Manifest, generated_name};

/// How the namespace gets its name.
#[derive(Debug, Clone, Default)]
pub enum NamespaceInput {
    /// Draw `kest-<suffix>`.
    #[default]
    Generated,
    /// Use this exact name.
    Name(String),
    /// Draw `<prefix><suffix>`.
    GenerateName(String),
}

/// Omitted input: draw a generated name.
impl From<()> for NamespaceInput {
    fn from((): ()) -> Self {
        NamespaceInput::Generated
    }
}

impl From<&str> for NamespaceInput {
    fn from(name: &str) -> Self {
        NamespaceInput::Name(name.to_string())
    }
}

impl From<String> for NamespaceInput {
    fn from(name: String) -> Self {
        NamespaceInput::Name(name)
    }
}

impl NamespaceInput {
    /// Scenario authors' spelling for the prefix variant.
    pub fn generate_name(prefix: impl Into<String>) -> Self {
        NamespaceInput::GenerateName(prefix.into())
    }

    /// The action description. Auto-generated names are not known yet when
    /// the action starts, so only pinned names appear here.
    pub fn describe(&self, verb: &str) -> String {
        match self {
            NamespaceInput::Generated => format!("{verb} Namespace"),
            NamespaceInput::Name(name) => format!("{verb} Namespace {name}"),
            NamespaceInput::GenerateName(prefix) => format!("{verb} Namespace {prefix}*"),
        }
    }

    /// Draws (or returns) the concrete name for one attempt. Generated
    /// variants draw fresh on every call.
    pub fn resolve(&self) -> String {
        match self {
            NamespaceInput::Generated => generated_name(DEFAULT_NAME_PREFIX),
            NamespaceInput::Name(name) => name.clone(),
            NamespaceInput::GenerateName(prefix) => generated_name(prefix),
        }
    }

    /// Whether a failed attempt should redraw the name.
    pub fn is_generated(&self) -> bool {
        !matches!(self, NamespaceInput::Name(_))
    }
}

/// The manifest sent to the cluster for a namespace name. Fails only on an
/// empty name.
pub fn manifest_for(name: &str) -> Result<Manifest, kest_types::InvalidManifest> {
    Manifest::parse(serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": { "name": name },
    }))
}
