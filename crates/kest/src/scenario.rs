//! The scenario runtime.
//!
//! A [`Scenario`] composes actions into one stateful run: every verb
//! records an `ActionStart`/`ActionEnd` bracket, runs its body under the
//! retry engine, and — for mutating verbs — registers the matching revert
//! on the reverting stack before the action returns. Namespaced and
//! cluster-bound views share the same recorder and reverting stack but
//! carry a re-bound client, so ownership stays a tree.
//!
//! Verbs fail fast on invalid input (bad manifests, misconfigured status
//! apply) before any event is recorded; everything that touches the
//! cluster is retried under the scenario's retry options
//! ([`Scenario::with_retry`] overrides them per call site).

use std::sync::Arc;

use kest_types::{
    BddKeyword, ClusterContext, Event, KindRef, Manifest, ManifestSource, ResourceRef,
};
use serde_yaml::Value;
use tracing::debug;

use crate::actions::exec::ExecInput;
use crate::actions::namespace::{self, NamespaceInput};
use crate::actions::{self, ErrorTestFn, TestFn, WhereFn, apply, expect_error, query};
use crate::error::{KestError, Result};
use crate::kubectl::{ClusterClient, LabelMap, LabelOptions};
use crate::recorder::Recorder;
use crate::retry::{RetryOptions, retry};
use crate::reverting::{RevertFn, Reverting};
use crate::shell::Shell;

/// Binding for [`Scenario::use_cluster`]: which kubeconfig and context the
/// view talks to.
#[derive(Debug, Clone, Default)]
pub struct ClusterRef {
    pub context: Option<String>,
    pub kubeconfig: Option<String>,
}

/// One scenario run (or a namespaced/cluster-bound view of it).
///
/// Clones are views: they share the recorder and the reverting stack.
#[derive(Clone)]
pub struct Scenario {
    name: String,
    recorder: Recorder,
    reverting: Reverting,
    client: Arc<dyn ClusterClient>,
    shell: Shell,
    retry: RetryOptions,
}

impl Scenario {
    /// Assembles a scenario from its parts. The harness builds the parts
    /// around the production `kubectl` client; tests pass a fake cluster.
    pub fn from_parts(
        name: impl Into<String>,
        recorder: Recorder,
        client: Arc<dyn ClusterClient>,
    ) -> Self {
        let reverting = Reverting::new(recorder.clone());
        let shell = Shell::new(recorder.clone());
        Self {
            name: name.into(),
            recorder,
            reverting,
            client,
            shell,
            retry: RetryOptions::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn reverting(&self) -> &Reverting {
        &self.reverting
    }

    pub fn client(&self) -> &Arc<dyn ClusterClient> {
        &self.client
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    /// A view with different retry options for subsequent calls.
    pub fn with_retry(&self, retry: RetryOptions) -> Self {
        Self {
            retry,
            ..self.clone()
        }
    }

    // ========================================================================
    // BDD annotations (reporting only, no execution effect)
    // ========================================================================

    pub fn given(&self, description: impl Into<String>) -> &Self {
        self.annotate(BddKeyword::Given, description)
    }

    pub fn when(&self, description: impl Into<String>) -> &Self {
        self.annotate(BddKeyword::When, description)
    }

    pub fn then(&self, description: impl Into<String>) -> &Self {
        self.annotate(BddKeyword::Then, description)
    }

    pub fn and(&self, description: impl Into<String>) -> &Self {
        self.annotate(BddKeyword::And, description)
    }

    pub fn but(&self, description: impl Into<String>) -> &Self {
        self.annotate(BddKeyword::But, description)
    }

    fn annotate(&self, keyword: BddKeyword, description: impl Into<String>) -> &Self {
        self.recorder.record(Event::bdd(keyword, description));
        self
    }

    // ========================================================================
    // Scope derivation
    // ========================================================================

    /// Creates (applies) a namespace and returns a view bound to it.
    pub async fn new_namespace(&self, input: impl Into<NamespaceInput>) -> Result<Scenario> {
        let name = self.apply_namespace(input).await?;
        debug!(namespace = %name, "scenario view bound to namespace");
        Ok(Self {
            client: self.client.extend(&ClusterContext::namespaced(&name)),
            ..self.clone()
        })
    }

    /// A view bound to another cluster. The view can itself create
    /// namespaces, yielding a view bound to both.
    pub fn use_cluster(&self, cluster: &ClusterRef) -> Scenario {
        let overlay = ClusterContext {
            context: cluster.context.clone(),
            kubeconfig: cluster.kubeconfig.clone(),
            ..ClusterContext::default()
        };
        Self {
            client: self.client.extend(&overlay),
            ..self.clone()
        }
    }

    // ========================================================================
    // Mutating verbs
    // ========================================================================

    /// Server-side apply; reverts by deletion.
    pub async fn apply(&self, manifest: impl Into<ManifestSource>) -> Result<Manifest> {
        let manifest = Manifest::parse(manifest)?;
        let client = self.client.clone();
        let per_attempt = manifest.clone();
        self.run_action(
            &apply::describe_apply(&manifest),
            move || {
                let client = client.clone();
                let manifest = per_attempt.clone();
                async move { apply::apply(client.as_ref(), &manifest).await }
            },
            |_| Some(self.delete_revert_for(&manifest)),
        )
        .await?;
        Ok(manifest)
    }

    /// Create (fails on an existing resource); reverts by deletion.
    pub async fn create(&self, manifest: impl Into<ManifestSource>) -> Result<Manifest> {
        let manifest = Manifest::parse(manifest)?;
        let client = self.client.clone();
        let per_attempt = manifest.clone();
        self.run_action(
            &apply::describe_create(&manifest),
            move || {
                let client = client.clone();
                let manifest = per_attempt.clone();
                async move { apply::create(client.as_ref(), &manifest).await }
            },
            |_| Some(self.delete_revert_for(&manifest)),
        )
        .await?;
        Ok(manifest)
    }

    /// Server-side apply of the status subresource. One-way: no revert.
    pub async fn apply_status(&self, manifest: impl Into<ManifestSource>) -> Result<()> {
        let manifest = Manifest::parse(manifest)?;
        apply::validate_apply_status(self.client.context(), &manifest)?;
        let client = self.client.clone();
        let per_attempt = manifest.clone();
        self.run_action(
            &apply::describe_apply_status(&manifest),
            move || {
                let client = client.clone();
                let manifest = per_attempt.clone();
                async move { apply::apply_status(client.as_ref(), &manifest).await }
            },
            no_revert,
        )
        .await
    }

    /// Delete by kind and name. One-way: no revert.
    pub async fn delete(&self, resource: impl Into<ResourceRef>) -> Result<()> {
        let resource = resource.into();
        let client = self.client.clone();
        let per_attempt = resource.clone();
        self.run_action(
            &apply::describe_delete(&resource),
            move || {
                let client = client.clone();
                let resource = per_attempt.clone();
                async move { apply::delete(client.as_ref(), &resource).await }
            },
            no_revert,
        )
        .await
    }

    /// Add, update (string value) or remove (`None` value) labels.
    pub async fn label(
        &self,
        resource: impl Into<ResourceRef>,
        labels: LabelMap,
        options: LabelOptions,
    ) -> Result<()> {
        let resource = resource.into();
        let client = self.client.clone();
        let per_attempt = resource.clone();
        self.run_action(
            &apply::describe_label(&resource),
            move || {
                let client = client.clone();
                let resource = per_attempt.clone();
                let labels = labels.clone();
                async move { apply::label(client.as_ref(), &resource, &labels, options).await }
            },
            no_revert,
        )
        .await
    }

    /// Applies a namespace manifest; returns the created name.
    pub async fn apply_namespace(&self, input: impl Into<NamespaceInput>) -> Result<String> {
        self.namespace_action(input.into(), false).await
    }

    /// Creates a namespace (collision retries with a fresh generated name);
    /// returns the created name.
    pub async fn create_namespace(&self, input: impl Into<NamespaceInput>) -> Result<String> {
        self.namespace_action(input.into(), true).await
    }

    async fn namespace_action(&self, input: NamespaceInput, create: bool) -> Result<String> {
        let verb = if create { "Create" } else { "Apply" };
        let client = self.client.clone();
        let per_attempt = input.clone();
        self.run_action(
            &input.describe(verb),
            move || {
                let client = client.clone();
                let input = per_attempt.clone();
                async move {
                    // Generated names are redrawn per attempt, so a name
                    // collision retries with a different name.
                    let name = input.resolve();
                    let manifest = namespace::manifest_for(&name)?;
                    if create {
                        apply::create(client.as_ref(), &manifest).await?;
                    } else {
                        apply::apply(client.as_ref(), &manifest).await?;
                    }
                    Ok(name)
                }
            },
            |name: &String| {
                Some((
                    format!("Delete Namespace {name}"),
                    actions::delete_revert(
                        self.client.clone(),
                        "Namespace".to_string(),
                        name.clone(),
                    ),
                ))
            },
        )
        .await
    }

    /// Runs a user closure under the shell adapter; registers the given
    /// revert closure (or a no-op).
    pub async fn exec(&self, input: ExecInput) -> Result<()> {
        let shell = self.shell.clone();
        let run = input.run.clone();
        let result = self
            .run_action(
                &input.describe(),
                move || {
                    let shell = shell.clone();
                    let run = run.clone();
                    async move { run(shell).await }
                },
                |_| {
                    let shell = self.shell.clone();
                    let revert = input.revert.clone();
                    let revert: RevertFn = Arc::new(move || {
                        let shell = shell.clone();
                        match &revert {
                            Some(f) => f(shell),
                            None => Box::pin(async { Ok(()) }),
                        }
                    });
                    Some((input.describe_revert(), revert))
                },
            )
            .await;
        result
    }

    /// Attempts an apply that is supposed to be rejected; `test` judges the
    /// rejection error. An admitted apply is undone and retried.
    pub async fn assert_apply_error<F>(
        &self,
        manifest: impl Into<ManifestSource>,
        test: F,
    ) -> Result<()>
    where
        F: Fn(&KestError) -> Result<()> + Send + Sync + 'static,
    {
        let manifest = Manifest::parse(manifest)?;
        let test: ErrorTestFn = Arc::new(test);
        let client = self.client.clone();
        let per_attempt = manifest.clone();
        self.run_action(
            &expect_error::describe_apply_error(&manifest),
            move || {
                let client = client.clone();
                let manifest = per_attempt.clone();
                let test = test.clone();
                async move {
                    expect_error::assert_apply_error(client.as_ref(), &manifest, &test).await
                }
            },
            no_revert,
        )
        .await
    }

    /// As [`Scenario::assert_apply_error`], for create.
    pub async fn assert_create_error<F>(
        &self,
        manifest: impl Into<ManifestSource>,
        test: F,
    ) -> Result<()>
    where
        F: Fn(&KestError) -> Result<()> + Send + Sync + 'static,
    {
        let manifest = Manifest::parse(manifest)?;
        let test: ErrorTestFn = Arc::new(test);
        let client = self.client.clone();
        let per_attempt = manifest.clone();
        self.run_action(
            &expect_error::describe_create_error(&manifest),
            move || {
                let client = client.clone();
                let manifest = per_attempt.clone();
                let test = test.clone();
                async move {
                    expect_error::assert_create_error(client.as_ref(), &manifest, &test).await
                }
            },
            no_revert,
        )
        .await
    }

    // ========================================================================
    // Query verbs
    // ========================================================================

    /// Fetches one resource, verifying its identity matches the reference.
    pub async fn get(&self, resource: impl Into<ResourceRef>) -> Result<Manifest> {
        let resource = resource.into();
        let client = self.client.clone();
        let per_attempt = resource.clone();
        self.run_action(
            &query::describe_get(&resource),
            move || {
                let client = client.clone();
                let resource = per_attempt.clone();
                async move { query::get(client.as_ref(), &resource).await }
            },
            no_revert,
        )
        .await
    }

    /// Fetches the resource and runs `test` against it, retrying while the
    /// callback fails.
    pub async fn assert<F>(&self, resource: impl Into<ResourceRef>, test: F) -> Result<()>
    where
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        let resource = resource.into();
        let test: TestFn = Arc::new(test);
        let client = self.client.clone();
        let per_attempt = resource.clone();
        self.run_action(
            &query::describe_assert(&resource),
            move || {
                let client = client.clone();
                let resource = per_attempt.clone();
                let test = test.clone();
                async move { query::assert_object(client.as_ref(), &resource, &test).await }
            },
            no_revert,
        )
        .await
    }

    /// Succeeds once fetching the resource fails with the not-found signal.
    pub async fn assert_absence(&self, resource: impl Into<ResourceRef>) -> Result<()> {
        let resource = resource.into();
        let client = self.client.clone();
        let per_attempt = resource.clone();
        self.run_action(
            &query::describe_assert_absence(&resource),
            move || {
                let client = client.clone();
                let resource = per_attempt.clone();
                async move { query::assert_absence(client.as_ref(), &resource).await }
            },
            no_revert,
        )
        .await
    }

    /// Lists resources of a kind and runs `test` against the list object.
    pub async fn assert_list<F>(&self, kind: impl Into<KindRef>, test: F) -> Result<()>
    where
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        let kind = kind.into();
        let test: TestFn = Arc::new(test);
        let client = self.client.clone();
        let per_attempt = kind.clone();
        self.run_action(
            &query::describe_assert_list(&kind),
            move || {
                let client = client.clone();
                let kind = per_attempt.clone();
                let test = test.clone();
                async move { query::assert_list(client.as_ref(), &kind, &test).await }
            },
            no_revert,
        )
        .await
    }

    /// Lists, requires exactly one resource of the kind, and runs `test`
    /// against it.
    pub async fn assert_one<F>(&self, kind: impl Into<KindRef>, test: F) -> Result<()>
    where
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        self.assert_one_inner(kind.into(), None, Arc::new(test)).await
    }

    /// As [`Scenario::assert_one`], filtering the list by `predicate`
    /// first.
    pub async fn assert_one_where<P, F>(
        &self,
        kind: impl Into<KindRef>,
        predicate: P,
        test: F,
    ) -> Result<()>
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        self.assert_one_inner(kind.into(), Some(Arc::new(predicate)), Arc::new(test))
            .await
    }

    async fn assert_one_inner(
        &self,
        kind: KindRef,
        predicate: Option<WhereFn>,
        test: TestFn,
    ) -> Result<()> {
        let client = self.client.clone();
        let per_attempt = kind.clone();
        self.run_action(
            &query::describe_assert_one(&kind),
            move || {
                let client = client.clone();
                let kind = per_attempt.clone();
                let predicate = predicate.clone();
                let test = test.clone();
                async move {
                    query::assert_one(client.as_ref(), &kind, predicate.as_ref(), &test).await
                }
            },
            no_revert,
        )
        .await
    }

    // ========================================================================
    // The action pattern
    // ========================================================================

    /// Runs one action: start event, retried body, revert registration on
    /// success (before the end event), end event, error re-raised.
    async fn run_action<T, F, Fut, R>(
        &self,
        description: &str,
        attempt: F,
        on_success: R,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        R: FnOnce(&T) -> Option<(String, RevertFn)>,
    {
        debug!(action = description, "action start");
        self.recorder.record(Event::ActionStart {
            description: description.to_string(),
        });
        let result = retry(&self.recorder, self.retry, attempt).await;
        match &result {
            Ok(output) => {
                if let Some((revert_description, revert)) = on_success(output) {
                    self.push_revert(revert_description, revert);
                }
                self.recorder.record(Event::ActionEnd {
                    ok: true,
                    error: None,
                });
            }
            Err(err) => {
                debug!(action = description, error = %err, "action failed");
                self.recorder.record(Event::ActionEnd {
                    ok: false,
                    error: Some(err.summary()),
                });
            }
        }
        result
    }

    /// The delete-by-reference revert for an applied/created manifest.
    fn delete_revert_for(&self, manifest: &Manifest) -> (String, RevertFn) {
        (
            apply::describe_revert(manifest),
            actions::delete_revert(
                self.client.clone(),
                manifest.kubectl_type(),
                manifest.name().to_string(),
            ),
        )
    }

    /// Registers a revert wrapped in its own action bracket, so revert
    /// phases appear in the event log just like forward phases.
    fn push_revert(&self, description: String, revert: RevertFn) {
        let recorder = self.recorder.clone();
        self.reverting.add(move || {
            let recorder = recorder.clone();
            let revert = revert.clone();
            let description = description.clone();
            Box::pin(async move {
                recorder.record(Event::ActionStart { description });
                let result = revert().await;
                match &result {
                    Ok(()) => recorder.record(Event::ActionEnd {
                        ok: true,
                        error: None,
                    }),
                    Err(err) => recorder.record(Event::ActionEnd {
                        ok: false,
                        error: Some(err.summary()),
                    }),
                }
                result
            })
        });
    }
}

/// `on_success` for one-way mutations and queries.
#[allow(clippy::unnecessary_wraps)]
fn no_revert<T>(_: &T) -> Option<(String, RevertFn)> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCluster;

    fn scenario() -> (Scenario, Recorder, FakeCluster) {
        let recorder = Recorder::new();
        let cluster = FakeCluster::new(recorder.clone());
        let scenario = Scenario::from_parts("unit", recorder.clone(), Arc::new(cluster.clone()));
        (scenario, recorder, cluster)
    }

    const CM: &str = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\ndata:\n  mode: demo\n";

    #[tokio::test]
    async fn apply_brackets_the_action_and_registers_a_revert() {
        let (scenario, recorder, cluster) = scenario();

        scenario.apply(CM).await.unwrap();
        assert!(cluster.stored("ConfigMap", "cm").is_some());
        assert_eq!(scenario.reverting().len(), 1);

        let events = recorder.events();
        assert!(matches!(
            &events[0],
            Event::ActionStart { description } if description == "Apply ConfigMap cm"
        ));
        assert!(matches!(&events[1], Event::CommandRun { .. }));
        assert!(matches!(&events[2], Event::CommandResult { .. }));
        assert!(matches!(&events[3], Event::ActionEnd { ok: true, .. }));

        // Draining the stack deletes the config map under its own bracket.
        scenario.reverting().revert().await.unwrap();
        assert!(cluster.stored("ConfigMap", "cm").is_none());
        let events = recorder.events();
        assert!(matches!(
            &events[5],
            Event::ActionStart { description } if description == "Delete ConfigMap cm"
        ));
    }

    #[tokio::test]
    async fn queries_register_no_revert() {
        let (scenario, _, cluster) = scenario();
        cluster.seed(&Manifest::parse(CM).unwrap());

        scenario.get(("v1", "ConfigMap", "cm")).await.unwrap();
        scenario
            .assert(("v1", "ConfigMap", "cm"), |value| {
                let mode = value.get("data").and_then(|d| d.get("mode"));
                if mode == Some(&Value::from("demo")) {
                    Ok(())
                } else {
                    Err(KestError::assertion(format!("unexpected mode {mode:?}")))
                }
            })
            .await
            .unwrap();
        assert!(scenario.reverting().is_empty());
    }

    #[tokio::test]
    async fn failing_actions_record_the_error_and_re_raise() {
        let (scenario, recorder, _) = scenario();
        let quick = scenario.with_retry(RetryOptions::new(
            std::time::Duration::ZERO,
            std::time::Duration::from_millis(1),
        ));

        let err = quick.get(("v1", "ConfigMap", "missing")).await.unwrap_err();
        assert!(matches!(err, KestError::TimedOut { .. }));

        let events = recorder.events();
        let Some(Event::ActionEnd { ok, error }) = events.last() else {
            panic!("expected ActionEnd, got {events:?}");
        };
        assert!(!ok);
        let summary = error.as_ref().unwrap();
        assert!(summary.message.starts_with("Timed out after "));
        assert!(summary.cause.as_ref().unwrap().message.contains("(NotFound)"));
    }

    #[tokio::test]
    async fn bdd_annotations_record_events_only() {
        let (scenario, recorder, _) = scenario();
        scenario
            .given("an empty namespace")
            .when("nothing happens")
            .then("nothing changed");
        assert_eq!(
            recorder.events(),
            vec![
                Event::bdd(BddKeyword::Given, "an empty namespace"),
                Event::bdd(BddKeyword::When, "nothing happens"),
                Event::bdd(BddKeyword::Then, "nothing changed"),
            ]
        );
    }

    #[tokio::test]
    async fn new_namespace_returns_a_bound_view() {
        let (scenario, _, cluster) = scenario();
        let ns = scenario.new_namespace(NamespaceInput::Generated).await.unwrap();

        let bound = ns.client().context().namespace.clone().unwrap();
        assert!(bound.starts_with("kest-"));

        // Resources applied through the view land in the namespace.
        ns.apply(CM).await.unwrap();
        let base_view: &FakeCluster = &cluster;
        assert!(base_view.stored("ConfigMap", "cm").is_none(), "default ns is untouched");

        // The view shares the reverting stack: namespace + config map.
        assert_eq!(scenario.reverting().len(), 2);
    }

    #[tokio::test]
    async fn use_cluster_layers_kubeconfig_and_context() {
        let (scenario, _, _) = scenario();
        let view = scenario.use_cluster(&ClusterRef {
            context: Some("kind-e2e".into()),
            kubeconfig: Some("/kube/e2e".into()),
        });
        let context = view.client().context();
        assert_eq!(context.context.as_deref(), Some("kind-e2e"));
        assert_eq!(context.kubeconfig.as_deref(), Some("/kube/e2e"));
    }

    #[tokio::test]
    async fn exec_registers_the_revert_closure() {
        let (scenario, recorder, _) = scenario();
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("marker");
        let touch = format!("touch {}", marker.display());
        let remove = format!("rm {}", marker.display());

        let marker_in = marker.clone();
        scenario
            .exec(
                ExecInput::new("seed marker", move |sh| {
                    let touch = touch.clone();
                    let marker = marker_in.clone();
                    Box::pin(async move {
                        sh.quiet().run(&touch).await?;
                        assert!(marker.exists());
                        Ok(())
                    })
                })
                .with_revert(move |sh| {
                    let remove = remove.clone();
                    Box::pin(async move { sh.quiet().run(&remove).await.map(drop) })
                }),
            )
            .await
            .unwrap();

        assert!(marker.exists());
        scenario.reverting().revert().await.unwrap();
        assert!(!marker.exists());

        let starts: Vec<_> = recorder
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::ActionStart { description } => Some(description.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(starts, vec!["Exec seed marker", "Revert seed marker"]);
    }

    #[tokio::test]
    async fn label_and_assert_list_round_trip() {
        let (scenario, _, cluster) = scenario();
        cluster.seed(&Manifest::parse(CM).unwrap());

        let mut labels = LabelMap::new();
        labels.insert("tier".into(), Some("web".into()));
        scenario
            .label(("v1", "ConfigMap", "cm"), labels, LabelOptions::default())
            .await
            .unwrap();

        scenario
            .assert_list(("v1", "ConfigMap"), |list| {
                let items = list.get("items").and_then(Value::as_sequence);
                match items.map(Vec::len) {
                    Some(1) => Ok(()),
                    other => Err(KestError::assertion(format!("expected 1 item, got {other:?}"))),
                }
            })
            .await
            .unwrap();

        scenario
            .assert_one(("v1", "ConfigMap"), |item| {
                let tier = item
                    .get("metadata")
                    .and_then(|m| m.get("labels"))
                    .and_then(|l| l.get("tier"));
                if tier == Some(&Value::from("web")) {
                    Ok(())
                } else {
                    Err(KestError::assertion(format!("missing label, got {tier:?}")))
                }
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn apply_status_requires_a_field_manager_context() {
        const WITH_STATUS: &str =
            "apiVersion: v1\nkind: Pod\nmetadata:\n  name: p\nstatus:\n  phase: Running\n";

        // Without a field manager the verb fails before any event.
        let (scenario, recorder, _) = scenario();
        let err = scenario.apply_status(WITH_STATUS).await.unwrap_err();
        assert!(err.to_string().contains("fieldManagerName"));
        assert!(recorder.events().is_empty());

        // With one, the status lands on the stored resource.
        let recorder = Recorder::new();
        let context = ClusterContext {
            field_manager_name: Some("kest".into()),
            ..ClusterContext::default()
        };
        let cluster = FakeCluster::with_context(recorder.clone(), context);
        let scenario = Scenario::from_parts("unit", recorder, Arc::new(cluster.clone()));
        cluster.seed(&Manifest::parse("apiVersion: v1\nkind: Pod\nmetadata:\n  name: p\n").unwrap());

        scenario.apply_status(WITH_STATUS).await.unwrap();
        let phase = cluster
            .stored("Pod", "p")
            .unwrap()
            .get("status")
            .and_then(|s| s.get("phase"))
            .cloned();
        assert_eq!(phase, Some(Value::from("Running")));
        // One-way: nothing to revert.
        assert!(scenario.reverting().is_empty());
    }

    #[tokio::test]
    async fn invalid_manifests_fail_before_any_event() {
        let (scenario, recorder, _) = scenario();
        let err = scenario.apply("data:\n  mode: demo\n").await.unwrap_err();
        assert!(matches!(err, KestError::InvalidManifest(_)));
        assert!(recorder.events().is_empty());
    }
}
