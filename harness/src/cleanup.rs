use crate::Error;
use stagehand_errors::BoxError;
use stagehand_events::Failure;
use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
};

/// Release action attached to a named resource.
pub type CleanupFn = Box<dyn FnOnce() -> Result<(), BoxError> + Send + Sync + 'static>;

type BareFn = Box<dyn FnOnce() + Send + Sync + 'static>;

enum Action {
    Resource(CleanupFn),
    Bare(BareFn),
}

pub(crate) struct Cleanup {
    subject: String,
    action: Action,
}

impl Cleanup {
    pub(crate) fn resource(
        name: &str,
        action: CleanupFn,
    ) -> Self {
        Self {
            subject: name.to_string(),
            action: Action::Resource(action),
        }
    }

    pub(crate) fn bare(
        position: usize,
        action: BareFn,
    ) -> Self {
        Self {
            subject: format!("action #{position}"),
            action: Action::Bare(action),
        }
    }

    pub(crate) fn subject(&self) -> &str {
        &self.subject
    }

    /// Runs the action, converting both errors and panics into a [`Failure`].
    pub(crate) fn run(self) -> Result<(), Failure> {
        let Self { subject, action } = self;

        let outcome = catch_unwind(AssertUnwindSafe(move || {
            match action {
                Action::Resource(f) => f(),
                Action::Bare(f) => {
                    f();
                    Ok(())
                },
            }
        }));

        let err = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(source)) => {
                Error::CleanupFailed {
                    subject: subject.clone(),
                    source,
                }
            },
            Err(payload) => {
                Error::CleanupPanicked {
                    subject: subject.clone(),
                    message: panic_message(payload.as_ref()),
                }
            },
        };

        Err(Failure::from_error(&err).with_subject(subject))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}
