use stagehand_errors::{BoxError, Category, Domain, ErrorCode, HasErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("resource `{name}` is not registered")]
    NotFound { name: String },

    #[error("resource `{name}` is a `{actual}`, not a `{expected}`")]
    WrongType {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("cleanup `{subject}` failed: {source}")]
    CleanupFailed {
        subject: String,
        #[source]
        source: BoxError,
    },

    #[error("cleanup `{subject}` panicked: {message}")]
    CleanupPanicked { subject: String, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_wrong_type(&self) -> bool {
        matches!(self, Self::WrongType { .. })
    }
}

impl HasErrorCode for Error {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::new(Domain::HN, Category::Resolution, 1),
            Self::WrongType { .. } => ErrorCode::new(Domain::HN, Category::Resolution, 2),
            Self::CleanupFailed { .. } => ErrorCode::new(Domain::HN, Category::Cleanup, 1),
            Self::CleanupPanicked { .. } => ErrorCode::new(Domain::HN, Category::Cleanup, 2),
        }
    }
}
