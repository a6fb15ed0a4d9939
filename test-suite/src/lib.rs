use std::{path::PathBuf, time::Instant};

pub mod fixtures;

pub use fixtures::*;

/// When set, every scenario appends its report to this JSON lines file.
pub const REPORT_ENV: &str = "STAGEHAND_SUITE_REPORT";

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Tag {
    /// Registration, lookup and teardown of harness resources.
    Lifecycle,

    /// Cleanup ordering guarantees.
    Ordering,

    /// Behavior under concurrent callers.
    Concurrency,

    /// Calls through the in-memory transport.
    Transport,

    /// Deadlines and cancellation.
    Cancellation,

    /// Failure reporting during teardown.
    Reporting,

    /// Test kit wiring and configuration.
    Wiring,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, bon::Builder)]
#[serde(rename_all = "snake_case")]
pub struct ScenarioMetadata {
    #[builder(into)]
    pub id: String,

    #[builder(into)]
    pub name: String,

    #[builder(into)]
    pub purpose: String,

    #[builder(default)]
    pub tags: Vec<Tag>,
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug)]
#[serde(rename_all = "snake_case")]
pub struct ScenarioReport {
    pub metadata: ScenarioMetadata,
    pub passed: bool,
    pub elapsed_ms: u128,
}

impl ScenarioReport {
    /// Appends this report to the file named by [`REPORT_ENV`], if any.
    pub fn write_to_jsonl(&self) {
        let Some(path) = std::env::var_os(REPORT_ENV).map(PathBuf::from) else {
            return;
        };
        if let Err(err) = serde_jsonlines::append_json_lines(&path, [self]) {
            tracing::warn!(path = %path.display(), "failed to write scenario report: {err}");
        }
    }
}

/// A named integration test with metadata, reported once it finishes.
#[derive(Clone, Debug)]
pub struct Scenario {
    pub metadata: ScenarioMetadata,
}

impl Scenario {
    pub fn new(metadata: ScenarioMetadata) -> Self {
        stagehand_testing::logging();
        Self { metadata }
    }

    /// Runs `body` on its own task so a panic can be recorded before it is
    /// re-raised on the calling test.
    pub async fn run<F, Fut>(
        self,
        body: F,
    ) where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()> + Send + 'static, {
        let started = Instant::now();
        tracing::info!(id = %self.metadata.id, "running scenario: {}", self.metadata.name);

        let outcome = tokio::spawn(body()).await;
        let report = ScenarioReport {
            metadata: self.metadata,
            passed: outcome.is_ok(),
            elapsed_ms: started.elapsed().as_millis(),
        };
        report.write_to_jsonl();

        if let Err(err) = outcome {
            match err.try_into_panic() {
                Ok(panic) => std::panic::resume_unwind(panic),
                Err(err) => panic!("scenario `{}` did not finish: {err}", report.metadata.id),
            }
        }
    }
}

impl From<ScenarioMetadata> for Scenario {
    fn from(metadata: ScenarioMetadata) -> Self {
        Self::new(metadata)
    }
}
