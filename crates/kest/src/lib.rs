//! # kest: end-to-end scenario testing for Kubernetes-style APIs
//!
//! A test author writes a *scenario* — a sequence of mutating and observing
//! actions against a live cluster. The engine executes each action through
//! a command-line client, retries observations against the cluster's
//! eventual consistency, guarantees reverse-order cleanup of everything the
//! scenario created, and produces a reproducible Markdown report from the
//! recorded event stream.
//!
//! ```no_run
//! use kest::{KestError, Result, run_scenario};
//!
//! // Inside a `#[tokio::test]`:
//! async fn config_map_round_trip() -> Result<()> {
//!     run_scenario("config map round trip", |s| async move {
//!         let ns = s.new_namespace(()).await?;
//!
//!         ns.when("applying a config map");
//!         ns.apply(
//!             "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\ndata:\n  mode: demo\n",
//!         )
//!         .await?;
//!
//!         ns.then("the config map is observable");
//!         ns.assert(("v1", "ConfigMap", "cm"), |cm| {
//!             match cm.get("data").and_then(|d| d.get("mode")).and_then(|m| m.as_str()) {
//!                 Some("demo") => Ok(()),
//!                 other => Err(KestError::assertion(format!(
//!                     "expected mode demo, got {other:?}"
//!                 ))),
//!             }
//!         })
//!         .await
//!     })
//!     .await
//! }
//! ```
//!
//! The subsystems, in dependency order: the [`Recorder`] (append-only event
//! log), the [`retry`](crate::retry::retry) engine (time-budgeted polling),
//! the [`Reverting`] stack (LIFO cleanup), the action catalogue
//! ([`actions`]), the [`Scenario`] runtime composing them, and the harness
//! ([`run_scenario`]) wiring it all to the host test runner. Reports live
//! in the `kest-report` crate and shared types in `kest-types`; both are
//! re-exported here.

pub mod actions;
pub mod error;
pub mod harness;
pub mod kubectl;
pub mod recorder;
pub mod retry;
pub mod reverting;
pub mod scenario;
pub mod shell;
pub mod testing;

pub use error::{KestError, NOT_FOUND_MARKER, Result};
pub use harness::{
    DEFAULT_SCENARIO_TIMEOUT, ScenarioOptions, run_scenario, run_scenario_against,
    run_scenario_with,
};
pub use kubectl::{ClusterClient, DeleteOptions, Kubectl, LabelMap, LabelOptions, PatchOptions};
pub use recorder::Recorder;
pub use retry::{DEFAULT_INTERVAL, DEFAULT_TIMEOUT, RetryOptions};
pub use reverting::{RevertFn, Reverting};
pub use scenario::{ClusterRef, Scenario};
pub use shell::{Shell, ShellOutput};

pub use actions::exec::ExecInput;
pub use actions::namespace::NamespaceInput;

// The data model and the report layer, re-exported for scenario authors.
pub use kest_report as report;
pub use kest_types::{
    BddKeyword, ClusterContext, ErrorSummary, Event, KindRef, Manifest, ManifestSource,
    ResourceRef, RetryReason, format_duration, generated_name, kubectl_type, parse_duration,
    random_suffix,
};
