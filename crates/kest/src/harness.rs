//! The host test-runner port.
//!
//! [`run_scenario`] is the entry point a test calls inside its async test
//! function: it assembles the scenario around the production `kubectl`
//! client, enforces the scenario deadline, guarantees the cleanup phase
//! runs (or is recorded as skipped), and prints the report when the
//! scenario failed or when reporting is forced on.
//!
//! Environment flags, read once per run into [`ScenarioOptions`]:
//!
//! - `KEST_SHOW_REPORT=1` — always print the Markdown report.
//! - `KEST_SHOW_EVENTS=1` — also dump the raw event stream as YAML.
//! - `KEST_PRESERVE_ON_FAILURE=1` — skip cleanup when the scenario failed,
//!   leaving its resources in place for inspection.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use kest_types::Event;
use kest_report::{parse_report, render_ansi, render_markdown};
use tracing::{info, warn};

use crate::error::{KestError, Result};
use crate::kubectl::{ClusterClient, Kubectl};
use crate::recorder::Recorder;
use crate::retry::RetryOptions;
use crate::scenario::Scenario;

/// Default total deadline for one scenario.
pub const DEFAULT_SCENARIO_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-run knobs. `Default` reads the `KEST_*` environment flags.
#[derive(Debug, Clone)]
pub struct ScenarioOptions {
    /// Total deadline for body plus cleanup preparation.
    pub timeout: Duration,
    /// Default retry options for every action of the scenario.
    pub retry: RetryOptions,
    /// Print the report even on success.
    pub show_report: bool,
    /// Also dump the raw event stream as YAML.
    pub show_events: bool,
    /// Skip cleanup when the scenario failed.
    pub preserve_on_failure: bool,
}

impl Default for ScenarioOptions {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|value| value == "1")
}

impl ScenarioOptions {
    /// Defaults plus the `KEST_*` environment flags.
    pub fn from_env() -> Self {
        Self {
            timeout: DEFAULT_SCENARIO_TIMEOUT,
            retry: RetryOptions::default(),
            show_report: env_flag("KEST_SHOW_REPORT"),
            show_events: env_flag("KEST_SHOW_EVENTS"),
            preserve_on_failure: env_flag("KEST_PRESERVE_ON_FAILURE"),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }
}

/// Runs a scenario against the cluster `kubectl` is configured for.
pub async fn run_scenario<F, Fut>(name: &str, body: F) -> Result<()>
where
    F: FnOnce(Scenario) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    run_scenario_with(name, ScenarioOptions::default(), body).await
}

/// As [`run_scenario`] with explicit options.
pub async fn run_scenario_with<F, Fut>(name: &str, options: ScenarioOptions, body: F) -> Result<()>
where
    F: FnOnce(Scenario) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let recorder = Recorder::new();
    let client = Arc::new(Kubectl::new(recorder.clone()));
    run_scenario_against(name, options, recorder, client, body).await
}

/// Runs a scenario against any cluster client. Tests use this with the
/// in-memory fake cluster.
pub async fn run_scenario_against<F, Fut>(
    name: &str,
    options: ScenarioOptions,
    recorder: Recorder,
    client: Arc<dyn ClusterClient>,
    body: F,
) -> Result<()>
where
    F: FnOnce(Scenario) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    init_tracing();
    let scenario =
        Scenario::from_parts(name, recorder.clone(), client).with_retry(options.retry);

    info!(scenario = name, "scenario start");
    recorder.record(Event::ScenarioStart {
        name: name.to_string(),
    });

    let result = match tokio::time::timeout(options.timeout, body(scenario.clone())).await {
        Ok(result) => result,
        Err(_) => Err(KestError::TimedOut {
            budget: options.timeout,
            cause: None,
        }),
    };
    if let Err(err) = &result {
        warn!(scenario = name, error = %err, "scenario body failed");
    }

    let cleanup = if result.is_err() && options.preserve_on_failure {
        scenario.reverting().skip();
        Ok(())
    } else {
        scenario.reverting().revert().await
    };
    if let Err(err) = &cleanup {
        warn!(scenario = name, error = %err, "cleanup failed");
    }

    recorder.record(Event::ScenarioEnd);

    let events = recorder.events();
    if result.is_err() || options.show_report {
        let report = parse_report(&events);
        let rendered = if console::colors_enabled() {
            render_ansi(&report)
        } else {
            render_markdown(&report)
        };
        println!("{rendered}");
    }
    if options.show_events {
        println!("{}", serde_yaml::to_string(&events).unwrap_or_default());
    }

    // The body's failure outranks a cleanup failure.
    result.and(cleanup)
}

fn init_tracing() {
    use std::sync::OnceLock;
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}
