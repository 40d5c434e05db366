//! Shared helpers for the end-to-end scenario tests.
#![allow(dead_code)] // each test binary uses a different subset

use std::sync::Arc;
use std::time::Duration;

use kest::testing::FakeCluster;
use kest::{Event, Recorder, RetryOptions, ScenarioOptions};

pub const CONFIG_MAP: &str =
    "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cm\ndata:\n  mode: demo\n";

pub const DEPLOYMENT: &str =
    "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\nspec:\n  replicas: 1\n";

pub const SERVICE: &str =
    "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\nspec:\n  clusterIP: None\n";

/// Options that never print and never read the environment.
pub fn quiet_options() -> ScenarioOptions {
    ScenarioOptions {
        timeout: Duration::from_secs(60),
        retry: RetryOptions::default(),
        show_report: false,
        show_events: false,
        preserve_on_failure: false,
    }
}

/// A small budget so failing asserts exhaust quickly under paused time.
pub fn fast_retry() -> RetryOptions {
    RetryOptions::new(Duration::from_millis(400), Duration::from_millis(50))
}

/// A fresh recorder plus a fake cluster recording into it.
pub fn fake_cluster() -> (Recorder, FakeCluster, Arc<FakeCluster>) {
    let recorder = Recorder::new();
    let cluster = FakeCluster::new(recorder.clone());
    let arc = Arc::new(cluster.clone());
    (recorder, cluster, arc)
}

/// The event stream reduced to kind labels, for sequence assertions.
pub fn kind_labels(events: &[Event]) -> Vec<&'static str> {
    events.iter().map(kind_label).collect()
}

pub fn kind_label(event: &Event) -> &'static str {
    match event {
        Event::ScenarioStart { .. } => "ScenarioStart",
        Event::ScenarioEnd => "ScenarioEnd",
        Event::BddGiven { .. } => "BDDGiven",
        Event::BddWhen { .. } => "BDDWhen",
        Event::BddThen { .. } => "BDDThen",
        Event::BddAnd { .. } => "BDDAnd",
        Event::BddBut { .. } => "BDDBut",
        Event::ActionStart { .. } => "ActionStart",
        Event::ActionEnd { .. } => "ActionEnd",
        Event::CommandRun { .. } => "CommandRun",
        Event::CommandResult { .. } => "CommandResult",
        Event::RetryStart => "RetryStart",
        Event::RetryAttempt { .. } => "RetryAttempt",
        Event::RetryEnd { .. } => "RetryEnd",
        Event::RevertingsStart => "RevertingsStart",
        Event::RevertingsEnd => "RevertingsEnd",
        Event::RevertingsSkipped => "RevertingsSkipped",
    }
}

/// Descriptions of all `ActionStart` events, in order.
pub fn action_starts(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::ActionStart { description } => Some(description.clone()),
            _ => None,
        })
        .collect()
}
