use stagehand_errors::{BoxError, Category, Domain, ErrorCode, HasErrorCode};

pub type Result<T, E = KitError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum KitError {
    #[error("failed to load configuration from `{path}`: {source}")]
    Config {
        path: String,
        #[source]
        source: config::ConfigError,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] validator::ValidationErrors),

    #[error("database factory failed: {0}")]
    DbFactory(#[source] BoxError),

    #[error(transparent)]
    Transport(#[from] stagehand_duplex::Error),
}

impl KitError {
    pub(crate) fn config(path: impl Into<String>) -> impl FnOnce(config::ConfigError) -> Self {
        let path = path.into();
        move |source| Self::Config { path, source }
    }
}

impl HasErrorCode for KitError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::Config { .. } => ErrorCode::new(Domain::CF, Category::Resolution, 1),
            Self::InvalidConfig(_) => ErrorCode::new(Domain::CF, Category::Validation, 1),
            Self::DbFactory(_) => ErrorCode::new(Domain::KT, Category::Lifecycle, 1),
            Self::Transport(err) => err.error_code(),
        }
    }
}
