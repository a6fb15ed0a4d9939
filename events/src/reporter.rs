use crate::Failure;
use serde_jsonlines::WriteExt;
use std::{io::Write, sync::Arc};

#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Sink for failures raised while a test scope is being torn down.
pub trait FailureReporter: Send + Sync {
    fn emit(
        &self,
        failure: &Failure,
    ) -> Result<(), ReporterError>;

    fn flush(&self) -> Result<(), ReporterError> {
        Ok(())
    }
}

impl<R: FailureReporter + ?Sized> FailureReporter for Arc<R> {
    fn emit(
        &self,
        failure: &Failure,
    ) -> Result<(), ReporterError> {
        self.as_ref().emit(failure)
    }

    fn flush(&self) -> Result<(), ReporterError> {
        self.as_ref().flush()
    }
}

pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn emit(
        &self,
        failure: &Failure,
    ) -> Result<(), ReporterError> {
        tracing::error!(
            code = %failure.code,
            severity = %failure.severity,
            subject = failure.subject.as_deref().unwrap_or("-"),
            "{}",
            failure.message
        );
        Ok(())
    }
}

pub struct StderrReporter;

impl FailureReporter for StderrReporter {
    fn emit(
        &self,
        failure: &Failure,
    ) -> Result<(), ReporterError> {
        eprintln!("{:?}", failure.to_report());
        Ok(())
    }

    fn flush(&self) -> Result<(), ReporterError> {
        std::io::stderr().flush()?;
        Ok(())
    }
}

pub struct NoOpReporter;

impl FailureReporter for NoOpReporter {
    fn emit(
        &self,
        _: &Failure,
    ) -> Result<(), ReporterError> {
        Ok(())
    }
}

/// Reporter picked by name from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReporterKind {
    #[default]
    Tracing,
    Stderr,
    #[serde(alias = "none")]
    NoOp,
}

impl ReporterKind {
    pub fn build(self) -> Arc<dyn FailureReporter> {
        match self {
            Self::Tracing => Arc::new(TracingReporter),
            Self::Stderr => Arc::new(StderrReporter),
            Self::NoOp => Arc::new(NoOpReporter),
        }
    }
}

pub struct JsonLinesReporter<W: Write + Send + Sync> {
    writer: std::sync::Mutex<W>,
}

impl<W: Write + Send + Sync> JsonLinesReporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: std::sync::Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send + Sync> FailureReporter for JsonLinesReporter<W> {
    fn emit(
        &self,
        failure: &Failure,
    ) -> Result<(), ReporterError> {
        let mut w = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        w.write_json_lines([failure])?;
        Ok(())
    }

    fn flush(&self) -> Result<(), ReporterError> {
        let mut w = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        w.flush()?;
        Ok(())
    }
}

/// Keeps every emitted failure so a test can assert on them afterwards.
pub struct CollectingReporter {
    failures: std::sync::Mutex<Vec<Failure>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self {
            failures: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn take(&self) -> Vec<Failure> {
        std::mem::take(
            &mut self
                .failures
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    pub fn len(&self) -> usize {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CollectingReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureReporter for CollectingReporter {
    fn emit(
        &self,
        failure: &Failure,
    ) -> Result<(), ReporterError> {
        self.failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(failure.clone());
        Ok(())
    }
}
