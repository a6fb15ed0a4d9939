use crate::Failure;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureBundle {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Failure>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<Failure>,
}

impl FailureBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn total_count(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    pub fn push(
        &mut self,
        failure: Failure,
    ) {
        if failure.is_error() {
            self.errors.push(failure);
        } else {
            self.warnings.push(failure);
        }
    }

    pub fn merge(
        &mut self,
        other: FailureBundle,
    ) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Iterates errors first, then warnings, each in the order they were pushed.
    pub fn iter(&self) -> impl Iterator<Item = &Failure> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
    }

    /// Subjects of every error, in order. Useful for asserting which
    /// resources failed to release.
    pub fn error_subjects(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter_map(|f| f.subject.as_deref())
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_json_compact(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for FailureBundle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "{} error(s), {} warning(s)",
            self.errors.len(),
            self.warnings.len()
        )
    }
}

impl std::error::Error for FailureBundle {}

impl FromIterator<Failure> for FailureBundle {
    fn from_iter<T: IntoIterator<Item = Failure>>(iter: T) -> Self {
        let mut bundle = FailureBundle::new();
        for failure in iter {
            bundle.push(failure);
        }
        bundle
    }
}

impl Extend<Failure> for FailureBundle {
    fn extend<T: IntoIterator<Item = Failure>>(
        &mut self,
        iter: T,
    ) {
        for failure in iter {
            self.push(failure);
        }
    }
}
