use crate::{codec::FrameError, status::Code, status::Status};
use stagehand_errors::{Category, Domain, ErrorCode, HasErrorCode};
use std::io;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to bind in-memory listener: {reason}")]
    Bind { reason: String },

    #[error("transport is closed")]
    Closed,

    #[error("call was cancelled")]
    Cancelled,

    #[error("call deadline exceeded")]
    DeadlineExceeded,

    #[error("io error: {0}")]
    Io(#[source] io::Error),

    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Status(#[from] Status),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof => Self::Closed,
            _ => Self::Io(err),
        }
    }
}

impl Error {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }

    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Status(status) => Some(status),
            _ => None,
        }
    }

    /// Collapses any failure into the code a remote caller would observe.
    pub fn code(&self) -> Code {
        match self {
            Self::Bind { .. } | Self::Closed | Self::Io(_) => Code::Unavailable,
            Self::Cancelled => Code::Cancelled,
            Self::DeadlineExceeded => Code::DeadlineExceeded,
            Self::Frame(_) | Self::Json(_) => Code::InvalidArgument,
            Self::Status(status) => status.code,
        }
    }
}

impl HasErrorCode for Error {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::Frame(_) => ErrorCode::new(Domain::DX, Category::Framing, 1),
            Self::Json(_) => ErrorCode::new(Domain::DX, Category::Framing, 2),
            Self::Bind { .. } => ErrorCode::new(Domain::DX, Category::Validation, 1),
            Self::Closed => ErrorCode::new(Domain::DX, Category::Lifecycle, 1),
            Self::Cancelled => ErrorCode::new(Domain::DX, Category::Cancelled, 1),
            Self::DeadlineExceeded => ErrorCode::new(Domain::DX, Category::Timeout, 1),
            Self::Io(_) => ErrorCode::new(Domain::DX, Category::Transport, 1),
            Self::Status(status) => status.error_code(),
        }
    }
}
