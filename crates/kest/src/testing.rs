//! In-memory cluster for hermetic tests.
//!
//! [`FakeCluster`] implements the cluster-client port against a shared
//! in-memory resource store. It emits the same kubectl-shaped
//! `CommandRun`/`CommandResult` events as the real client, speaks the
//! `(NotFound)` message protocol, and supports scripted failure injection
//! (`fail_next`) so retry behavior is testable without a cluster.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use kest_types::{ClusterContext, Event, Manifest};
use serde_yaml::Value;

use crate::error::{KestError, Result};
use crate::kubectl::{
    ClusterClient, DeleteOptions, LabelMap, LabelOptions, PatchOptions, args,
};
use crate::recorder::Recorder;

/// `(type name, namespace, resource name)`.
type ResourceKey = (String, String, String);

#[derive(Default)]
struct FakeState {
    resources: BTreeMap<ResourceKey, Value>,
    /// Scripted outcomes per operation name, consumed in order:
    /// `Some(message)` fails the call, `None` lets it through.
    scripts: HashMap<String, VecDeque<Option<String>>>,
}

/// An in-memory [`ClusterClient`].
#[derive(Clone)]
pub struct FakeCluster {
    context: ClusterContext,
    recorder: Recorder,
    state: Arc<Mutex<FakeState>>,
}

impl FakeCluster {
    pub fn new(recorder: Recorder) -> Self {
        Self::with_context(recorder, ClusterContext::default())
    }

    pub fn with_context(recorder: Recorder, context: ClusterContext) -> Self {
        Self {
            context,
            recorder,
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Stores a resource directly, bypassing events and scripting.
    pub fn seed(&self, manifest: &Manifest) {
        self.lock().resources.insert(
            self.key(&manifest.kubectl_type(), manifest.name()),
            manifest.value().clone(),
        );
    }

    /// The stored value for a resource, if any.
    pub fn stored(&self, type_name: &str, name: &str) -> Option<Value> {
        self.lock().resources.get(&self.key(type_name, name)).cloned()
    }

    /// Names of all stored resources of a type, in the current namespace.
    pub fn stored_names(&self, type_name: &str) -> Vec<String> {
        let namespace = self.namespace();
        self.lock()
            .resources
            .keys()
            .filter(|(t, ns, _)| t == type_name && *ns == namespace)
            .map(|(_, _, name)| name.clone())
            .collect()
    }

    /// Scripts the next invocation of `op` (`apply`, `create`, `get`, ...)
    /// to fail with `message`.
    pub fn fail_next(&self, op: &str, message: &str) {
        self.fail_times(op, 1, message);
    }

    /// Scripts the next `times` invocations of `op` to fail with `message`.
    pub fn fail_times(&self, op: &str, times: usize, message: &str) {
        let mut state = self.lock();
        let queue = state.scripts.entry(op.to_string()).or_default();
        for _ in 0..times {
            queue.push_back(Some(message.to_string()));
        }
    }

    /// Lets the next invocation of `op` through unchanged. Queued before a
    /// `fail_next`, this scripts succeed-then-fail sequences.
    pub fn pass_next(&self, op: &str) {
        self.lock()
            .scripts
            .entry(op.to_string())
            .or_default()
            .push_back(None);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn namespace(&self) -> String {
        self.context
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string())
    }

    fn key(&self, type_name: &str, name: &str) -> ResourceKey {
        (type_name.to_string(), self.namespace(), name.to_string())
    }

    fn scripted_failure(&self, op: &str) -> Option<String> {
        self.lock()
            .scripts
            .get_mut(op)
            .and_then(VecDeque::pop_front)
            .flatten()
    }

    /// Records the run/result pair, consuming a scripted failure when one
    /// is queued, otherwise producing `outcome()`.
    fn invoke<F>(
        &self,
        op: &str,
        command_args: Vec<String>,
        stdin: Option<String>,
        stdout_language: Option<&str>,
        outcome: F,
    ) -> Result<String>
    where
        F: FnOnce(&mut FakeState) -> Result<String>,
    {
        self.recorder.record(Event::CommandRun {
            cmd: "kubectl".to_string(),
            args: command_args,
            stdin: stdin.clone(),
            stdin_language: stdin.as_ref().map(|_| "yaml".to_string()),
        });

        let result = match self.scripted_failure(op) {
            Some(message) => Err(KestError::cluster(message)),
            None => {
                let mut state = self.lock();
                outcome(&mut state)
            }
        };

        match &result {
            Ok(stdout) => self.recorder.record(Event::CommandResult {
                exit_code: 0,
                stdout: stdout.clone(),
                stderr: String::new(),
                stdout_language: stdout_language.map(ToString::to_string),
                stderr_language: None,
            }),
            Err(err) => self.recorder.record(Event::CommandResult {
                exit_code: 1,
                stdout: String::new(),
                stderr: format!("{err}\n"),
                stdout_language: None,
                stderr_language: None,
            }),
        }
        result
    }

    fn not_found(type_name: &str, name: &str) -> KestError {
        KestError::cluster(format!(
            "Error from server (NotFound): {} \"{name}\" not found",
            plural(type_name)
        ))
    }
}

/// The naive plural kubectl prints in error messages.
fn plural(type_name: &str) -> String {
    let kind = type_name.split('.').next().unwrap_or(type_name);
    format!("{}s", kind.to_lowercase())
}

/// The `kind/name` slug kubectl prints on mutations.
fn slug(type_name: &str, name: &str) -> String {
    let kind = type_name.split('.').next().unwrap_or(type_name);
    format!("{}/{name}", kind.to_lowercase())
}

#[async_trait]
impl ClusterClient for FakeCluster {
    fn context(&self) -> &ClusterContext {
        &self.context
    }

    fn extend(&self, overlay: &ClusterContext) -> Arc<dyn ClusterClient> {
        Arc::new(Self {
            context: self.context.layer(overlay),
            recorder: self.recorder.clone(),
            state: self.state.clone(),
        })
    }

    async fn apply(&self, manifest: &Manifest) -> Result<String> {
        let key = self.key(&manifest.kubectl_type(), manifest.name());
        let value = manifest.value().clone();
        let stdout = format!(
            "{} serverside-applied\n",
            slug(&manifest.kubectl_type(), manifest.name())
        );
        self.invoke(
            "apply",
            args::apply(&self.context),
            Some(manifest.to_yaml()),
            None,
            move |state| {
                state.resources.insert(key, value);
                Ok(stdout)
            },
        )
    }

    async fn apply_status(&self, manifest: &Manifest) -> Result<String> {
        if self.context.field_manager_name.is_none() {
            return Err(KestError::assertion(
                "applyStatus requires fieldManagerName in the cluster context",
            ));
        }
        let type_name = manifest.kubectl_type();
        let name = manifest.name().to_string();
        let key = self.key(&type_name, &name);
        let status = manifest.value().get("status").cloned();
        let stdout = format!("{} serverside-applied\n", slug(&type_name, &name));
        self.invoke(
            "apply_status",
            args::apply_status(&self.context),
            Some(manifest.to_yaml()),
            None,
            move |state| {
                let Some(stored) = state.resources.get_mut(&key) else {
                    return Err(Self::not_found(&type_name, &name));
                };
                if let (Value::Mapping(mapping), Some(status)) = (stored, status) {
                    mapping.insert(Value::from("status"), status);
                }
                Ok(stdout)
            },
        )
    }

    async fn create(&self, manifest: &Manifest) -> Result<String> {
        let type_name = manifest.kubectl_type();
        let name = manifest.name().to_string();
        let key = self.key(&type_name, &name);
        let value = manifest.value().clone();
        let stdout = format!("{} created\n", slug(&type_name, &name));
        self.invoke(
            "create",
            args::create(&self.context),
            Some(manifest.to_yaml()),
            None,
            move |state| {
                if state.resources.contains_key(&key) {
                    return Err(KestError::cluster(format!(
                        "Error from server (AlreadyExists): {} \"{name}\" already exists",
                        plural(&type_name)
                    )));
                }
                state.resources.insert(key, value);
                Ok(stdout)
            },
        )
    }

    async fn get(&self, type_name: &str, name: &str) -> Result<String> {
        let key = self.key(type_name, name);
        let type_name = type_name.to_string();
        let name = name.to_string();
        self.invoke(
            "get",
            args::get(&self.context, &type_name, &name),
            None,
            Some("yaml"),
            move |state| match state.resources.get(&key) {
                Some(value) => Ok(serde_yaml::to_string(value).unwrap_or_default()),
                None => Err(Self::not_found(&type_name, &name)),
            },
        )
    }

    async fn list(&self, type_name: &str) -> Result<String> {
        let namespace = self.namespace();
        let type_name_owned = type_name.to_string();
        self.invoke(
            "list",
            args::list(&self.context, type_name),
            None,
            Some("yaml"),
            move |state| {
                let items: Vec<Value> = state
                    .resources
                    .iter()
                    .filter(|((t, ns, _), _)| *t == type_name_owned && *ns == namespace)
                    .map(|(_, value)| value.clone())
                    .collect();
                let mut list = serde_yaml::Mapping::new();
                list.insert(Value::from("apiVersion"), Value::from("v1"));
                list.insert(Value::from("kind"), Value::from("List"));
                list.insert(Value::from("items"), Value::Sequence(items));
                Ok(serde_yaml::to_string(&Value::Mapping(list)).unwrap_or_default())
            },
        )
    }

    async fn patch(
        &self,
        type_name: &str,
        name: &str,
        patch: &str,
        options: PatchOptions,
    ) -> Result<String> {
        let key = self.key(type_name, name);
        let type_name_owned = type_name.to_string();
        let name_owned = name.to_string();
        let patch_value: Result<Value> = serde_yaml::from_str(patch)
            .map_err(|e| KestError::cluster(format!("invalid patch: {e}")));
        let stdout = format!("{} patched\n", slug(type_name, name));
        self.invoke(
            "patch",
            args::patch(&self.context, type_name, name, patch, &options),
            None,
            None,
            move |state| {
                let patch_value = patch_value?;
                let Some(stored) = state.resources.get_mut(&key) else {
                    return Err(Self::not_found(&type_name_owned, &name_owned));
                };
                if let (Value::Mapping(stored), Value::Mapping(patch)) = (stored, patch_value) {
                    for (k, v) in patch {
                        stored.insert(k, v);
                    }
                }
                Ok(stdout)
            },
        )
    }

    async fn delete(&self, type_name: &str, name: &str, options: DeleteOptions) -> Result<String> {
        let key = self.key(type_name, name);
        let type_name_owned = type_name.to_string();
        let name_owned = name.to_string();
        let stdout = format!(
            "{} \"{name}\" deleted\n",
            plural(type_name).trim_end_matches('s')
        );
        self.invoke(
            "delete",
            args::delete(&self.context, type_name, name, options),
            None,
            None,
            move |state| {
                if state.resources.remove(&key).is_some() {
                    Ok(stdout)
                } else if options.ignore_not_found {
                    Ok(String::new())
                } else {
                    Err(Self::not_found(&type_name_owned, &name_owned))
                }
            },
        )
    }

    async fn label(
        &self,
        type_name: &str,
        name: &str,
        labels: &LabelMap,
        options: LabelOptions,
    ) -> Result<String> {
        let key = self.key(type_name, name);
        let type_name_owned = type_name.to_string();
        let name_owned = name.to_string();
        let labels = labels.clone();
        let stdout = format!("{} labeled\n", slug(type_name, name));
        self.invoke(
            "label",
            args::label(&self.context, type_name, name, &labels, options),
            None,
            None,
            move |state| {
                let Some(stored) = state.resources.get_mut(&key) else {
                    return Err(Self::not_found(&type_name_owned, &name_owned));
                };
                apply_labels(stored, &labels, options.overwrite)?;
                Ok(stdout)
            },
        )
    }
}

fn apply_labels(stored: &mut Value, labels: &LabelMap, overwrite: bool) -> Result<()> {
    let Value::Mapping(root) = stored else {
        return Ok(());
    };
    let metadata = root
        .entry(Value::from("metadata"))
        .or_insert_with(|| Value::Mapping(serde_yaml::Mapping::new()));
    let Value::Mapping(metadata) = metadata else {
        return Ok(());
    };
    let entry = metadata
        .entry(Value::from("labels"))
        .or_insert_with(|| Value::Mapping(serde_yaml::Mapping::new()));
    let Value::Mapping(existing) = entry else {
        return Ok(());
    };

    for (label, change) in labels {
        let label_key = Value::from(label.as_str());
        match change {
            Some(value) => {
                if let Some(current) = existing.get(&label_key) {
                    if !overwrite && current != &Value::from(value.as_str()) {
                        return Err(KestError::cluster(format!(
                            "error: '{label}' already has a value ({}), and --overwrite is false",
                            current.as_str().unwrap_or_default()
                        )));
                    }
                }
                existing.insert(label_key, Value::from(value.as_str()));
            }
            None => {
                existing.remove(&label_key);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cm(name: &str) -> Manifest {
        Manifest::parse(format!(
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: {name}\ndata:\n  mode: demo\n"
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn create_fails_when_the_resource_exists() {
        let cluster = FakeCluster::new(Recorder::new());
        cluster.create(&cm("cm")).await.unwrap();
        let err = cluster.create(&cm("cm")).await.unwrap_err();
        assert!(err.to_string().contains("(AlreadyExists)"));
    }

    #[tokio::test]
    async fn get_speaks_the_not_found_protocol() {
        let cluster = FakeCluster::new(Recorder::new());
        let err = cluster.get("ConfigMap", "missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Error from server (NotFound): configmaps \"missing\" not found"
        );
    }

    #[tokio::test]
    async fn namespaced_views_see_disjoint_resources() {
        let cluster = FakeCluster::new(Recorder::new());
        let ns_a = cluster.extend(&ClusterContext::namespaced("a"));
        let ns_b = cluster.extend(&ClusterContext::namespaced("b"));

        ns_a.apply(&cm("cm")).await.unwrap();
        assert!(ns_a.get("ConfigMap", "cm").await.is_ok());
        assert!(ns_b.get("ConfigMap", "cm").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let cluster = FakeCluster::new(Recorder::new());
        cluster.fail_times("apply", 2, "admission webhook denied");

        assert!(cluster.apply(&cm("cm")).await.is_err());
        assert!(cluster.apply(&cm("cm")).await.is_err());
        assert!(cluster.apply(&cm("cm")).await.is_ok());
    }

    #[tokio::test]
    async fn label_respects_the_overwrite_flag() {
        let cluster = FakeCluster::new(Recorder::new());
        cluster.seed(&cm("cm"));

        let mut set_tier = LabelMap::new();
        set_tier.insert("tier".into(), Some("web".into()));
        cluster
            .label("ConfigMap", "cm", &set_tier, LabelOptions::default())
            .await
            .unwrap();

        let mut change_tier = LabelMap::new();
        change_tier.insert("tier".into(), Some("api".into()));
        let err = cluster
            .label("ConfigMap", "cm", &change_tier, LabelOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--overwrite is false"));

        cluster
            .label(
                "ConfigMap",
                "cm",
                &change_tier,
                LabelOptions { overwrite: true },
            )
            .await
            .unwrap();
        let mut drop_tier = LabelMap::new();
        drop_tier.insert("tier".into(), None);
        cluster
            .label("ConfigMap", "cm", &drop_tier, LabelOptions::default())
            .await
            .unwrap();

        let labels = cluster
            .stored("ConfigMap", "cm")
            .unwrap()
            .get("metadata")
            .and_then(|m| m.get("labels"))
            .cloned()
            .unwrap();
        assert_eq!(labels, Value::Mapping(serde_yaml::Mapping::new()));
    }

    #[tokio::test]
    async fn patch_merges_top_level_fields() {
        let cluster = FakeCluster::new(Recorder::new());
        cluster.seed(&cm("cm"));

        cluster
            .patch(
                "ConfigMap",
                "cm",
                "data:\n  mode: prod\n",
                PatchOptions {
                    patch_type: Some("merge".into()),
                },
            )
            .await
            .unwrap();

        let mode = cluster
            .stored("ConfigMap", "cm")
            .unwrap()
            .get("data")
            .and_then(|d| d.get("mode"))
            .cloned();
        assert_eq!(mode, Some(Value::from("prod")));

        let err = cluster
            .patch("ConfigMap", "missing", "data: {}", PatchOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_honors_ignore_not_found() {
        let cluster = FakeCluster::new(Recorder::new());
        assert!(
            cluster
                .delete("ConfigMap", "cm", DeleteOptions::default())
                .await
                .unwrap_err()
                .is_not_found()
        );
        cluster
            .delete(
                "ConfigMap",
                "cm",
                DeleteOptions {
                    ignore_not_found: true,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn commands_are_recorded_like_kubectl() {
        let recorder = Recorder::new();
        let cluster = FakeCluster::with_context(recorder.clone(), ClusterContext::namespaced("ns1"));
        cluster.apply(&cm("cm")).await.unwrap();

        let events = recorder.events();
        let Event::CommandRun { cmd, args, stdin, .. } = &events[0] else {
            panic!("expected CommandRun");
        };
        assert_eq!(cmd, "kubectl");
        assert_eq!(
            args,
            &["apply", "--server-side", "-f", "-", "-n", "ns1"]
        );
        assert!(stdin.as_deref().unwrap().contains("kind: ConfigMap"));
        assert!(matches!(
            &events[1],
            Event::CommandResult { exit_code: 0, .. }
        ));
    }
}
