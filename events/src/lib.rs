//! Stagehand Events - failure reporting for test teardown
//!
//! Provides the out-of-band channel through which release actions that fail
//! during teardown are surfaced to the owning test, without unwinding the
//! rest of the teardown sequence.

mod bundle;
mod failure;
mod reporter;

pub use bundle::FailureBundle;
pub use failure::Failure;
pub use reporter::{
    CollectingReporter, FailureReporter, JsonLinesReporter, NoOpReporter, ReporterError,
    ReporterKind, StderrReporter, TracingReporter,
};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

/// Emits `failure` to `reporter`, logging (never propagating) reporter
/// errors and panics.
pub fn emit(
    reporter: &dyn FailureReporter,
    failure: &Failure,
) {
    match panic::catch_unwind(AssertUnwindSafe(|| reporter.emit(failure))) {
        Ok(Ok(())) => {},
        Ok(Err(e)) => tracing::error!("reporter emit failed: {}", e),
        Err(payload) => {
            tracing::error!("reporter panicked during emit: {}", panic_message(payload.as_ref()))
        },
    }
}

/// Flushes `reporter`, logging (never propagating) reporter errors and panics.
pub fn flush(reporter: &dyn FailureReporter) {
    match panic::catch_unwind(AssertUnwindSafe(|| reporter.flush())) {
        Ok(Ok(())) => {},
        Ok(Err(e)) => tracing::error!("reporter flush failed: {}", e),
        Err(payload) => {
            tracing::error!("reporter panicked during flush: {}", panic_message(payload.as_ref()))
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
