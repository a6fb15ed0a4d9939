use stagehand_events::{FailureReporter, TracingReporter};
use std::sync::Arc;

/// What the harness does once teardown has finished with failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TeardownPolicy {
    /// Panic after the whole sequence has run, failing the enclosing test.
    /// Skipped when the thread is already unwinding.
    #[default]
    FailTest,
    /// Only emit failures to the reporter.
    ReportOnly,
}

fn default_reporter() -> Arc<dyn FailureReporter> {
    Arc::new(TracingReporter)
}

#[derive(bon::Builder)]
pub struct HarnessOptions {
    #[builder(default = default_reporter())]
    pub reporter: Arc<dyn FailureReporter>,

    #[builder(default)]
    pub policy: TeardownPolicy,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
