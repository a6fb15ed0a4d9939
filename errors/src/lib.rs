//! Stagehand Error Codes
//!
//! Stable, compositional error codes shared by every stagehand crate.
//!
//! # Overview
//!
//! Each crate keeps its own `thiserror` enum and maps every variant onto an
//! [`ErrorCode`] of the form `S[Domain][Category][Sequence]`, so a failure
//! reported during teardown or returned from an in-memory call can be matched
//! on without string comparison.
//!
//! # Example
//!
//! ```
//! use stagehand_errors::{Category, Domain, ErrorCode};
//!
//! let code = ErrorCode::new(Domain::HN, Category::Cleanup, 1);
//! assert_eq!(code.to_string(), "SHN8001");
//! assert_eq!("SHN8001".parse::<ErrorCode>().unwrap(), code);
//! ```

mod code;

pub use code::{Category, Domain, ErrorCode, ParseCodeError, Severity};

/// Boxed error accepted from collaborator-supplied closures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Implemented by every error that can reach a test.
pub trait HasErrorCode {
    fn error_code(&self) -> ErrorCode;

    fn severity(&self) -> Severity {
        Severity::Error
    }
}
