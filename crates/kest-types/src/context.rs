//! Cluster call contexts.
//!
//! Every cluster-client call carries a [`ClusterContext`]: which namespace,
//! which kubeconfig, which kubectl context, and which field manager to apply
//! as. The scenario holds a default context; namespaced and cluster-bound
//! views layer overrides on top of it.

use serde::{Deserialize, Serialize};

/// Contextual binding for cluster-client calls.
///
/// All fields are optional; an unset field defers to the client's own
/// defaults (for `kubectl`, the active kubeconfig and context).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterContext {
    /// Target namespace (`-n`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Kubeconfig path (`--kubeconfig`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
    /// Kubectl context name (`--context`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Field manager for server-side apply (`--field-manager`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_manager_name: Option<String>,
}

impl ClusterContext {
    /// A context bound to a namespace only.
    pub fn namespaced(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    /// Combines two contexts field-wise; fields set in `overlay` win.
    pub fn layer(&self, overlay: &ClusterContext) -> Self {
        Self {
            namespace: overlay.namespace.clone().or_else(|| self.namespace.clone()),
            kubeconfig: overlay
                .kubeconfig
                .clone()
                .or_else(|| self.kubeconfig.clone()),
            context: overlay.context.clone().or_else(|| self.context.clone()),
            field_manager_name: overlay
                .field_manager_name
                .clone()
                .or_else(|| self.field_manager_name.clone()),
        }
    }
}
