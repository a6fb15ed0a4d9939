use serde::{Deserialize, Serialize};
use stagehand_errors::{ErrorCode, HasErrorCode, Severity};

/// Serializable severity representation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SeverityRepr {
    Error,
    Warning,
    Info,
}

impl From<Severity> for SeverityRepr {
    fn from(s: Severity) -> Self {
        match s {
            Severity::Error => Self::Error,
            Severity::Warning => Self::Warning,
            Severity::Info => Self::Info,
        }
    }
}

impl From<SeverityRepr> for Severity {
    fn from(s: SeverityRepr) -> Self {
        match s {
            SeverityRepr::Error => Self::Error,
            SeverityRepr::Warning => Self::Warning,
            SeverityRepr::Info => Self::Info,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FailureRepr {
    code: String,
    message: String,
    severity: SeverityRepr,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<String>,
}

/// A single failure surfaced to the owning test.
///
/// `subject` names the resource or action the failure belongs to, so a
/// report reads "cleanup `db` failed" rather than an anonymous error.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub code: ErrorCode,
    pub message: String,
    pub severity: Severity,
    pub subject: Option<String>,
    pub help: Option<String>,
}

impl Serialize for Failure {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer, {
        let repr = FailureRepr {
            code: self.code.to_string(),
            message: self.message.clone(),
            severity: self.severity.into(),
            subject: self.subject.clone(),
            help: self.help.clone(),
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Failure {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>, {
        use serde::de::Error;

        let repr = FailureRepr::deserialize(deserializer)?;
        let code = repr
            .code
            .parse::<ErrorCode>()
            .map_err(D::Error::custom)?;

        Ok(Self {
            code,
            message: repr.message,
            severity: repr.severity.into(),
            subject: repr.subject,
            help: repr.help,
        })
    }
}

impl Failure {
    pub fn new(
        code: ErrorCode,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            severity,
            subject: None,
            help: None,
        }
    }

    /// Builds a failure from any coded error, using its `Display` as message.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: HasErrorCode + std::fmt::Display, {
        Self::new(err.error_code(), err.to_string(), err.severity())
    }

    pub fn with_subject(
        mut self,
        subject: impl Into<String>,
    ) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_help(
        mut self,
        help: impl Into<String>,
    ) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn to_report(&self) -> miette::Report {
        let severity = match self.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
            Severity::Info => miette::Severity::Advice,
        };

        let mut diagnostic = miette::MietteDiagnostic::new(self.message.clone())
            .with_code(self.code.to_string())
            .with_severity(severity);

        if let Some(help) = &self.help {
            diagnostic = diagnostic.with_help(help.clone());
        }

        miette::Report::new(diagnostic)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }
}

impl std::fmt::Display for Failure {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_errors::{Category, Domain};

    fn cleanup_failure() -> Failure {
        Failure::new(
            ErrorCode::new(Domain::HN, Category::Cleanup, 1),
            "cleanup `db` failed: connection reset",
            Severity::Error,
        )
        .with_subject("db")
    }

    #[test]
    fn failure_serializable() {
        let json = serde_json::to_string(&cleanup_failure()).unwrap();
        assert!(json.contains("SHN8001"));
        assert!(json.contains("connection reset"));
        assert!(!json.contains("help"));
    }

    #[test]
    fn failure_deserializes_code() {
        let failure = cleanup_failure().with_help("close the pool before dropping it");
        let json = serde_json::to_string(&failure).unwrap();

        let back: Failure = serde_json::from_str(&json).unwrap();
        assert_eq!(back, failure);
    }

    #[test]
    fn failure_rejects_bad_code() {
        let json = r#"{"code":"nope","message":"x","severity":"error"}"#;
        assert!(serde_json::from_str::<Failure>(json).is_err());
    }

    #[test]
    fn failure_display() {
        insta::assert_snapshot!(
            cleanup_failure().to_string(),
            @"[SHN8001] cleanup `db` failed: connection reset"
        );
    }

    #[test]
    fn failure_report_carries_code() {
        let report = cleanup_failure().to_report();
        let code = report
            .code()
            .map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("SHN8001"));
    }
}
