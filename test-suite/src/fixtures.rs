//! Stand-in collaborators and handlers shared by the integration tests.

use stagehand::{BoxError, Bytes, CleanupFn, Router, Status};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Records labels in the order cleanups and actions run.
#[derive(Clone, Default, Debug)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        label: impl Into<String>,
    ) {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(label.into());
    }

    /// A resource cleanup that records `label` and succeeds.
    pub fn cleanup(
        &self,
        label: impl Into<String>,
    ) -> CleanupFn {
        let this = self.clone();
        let label = label.into();
        Box::new(move || {
            this.record(label);
            Ok(())
        })
    }

    /// A resource cleanup that records `label` and then fails with `reason`.
    pub fn failing_cleanup(
        &self,
        label: impl Into<String>,
        reason: &'static str,
    ) -> CleanupFn {
        let this = self.clone();
        let label = label.into();
        Box::new(move || {
            this.record(label);
            Err(BoxError::from(reason))
        })
    }

    /// A bare action that records `label`.
    pub fn action(
        &self,
        label: impl Into<String>,
    ) -> impl FnOnce() + Send + Sync + 'static {
        let this = self.clone();
        let label = label.into();
        move || this.record(label)
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A database connection that only knows whether it was closed.
#[derive(Debug, Default)]
pub struct FakeDb {
    pub name: String,
    closed: AtomicBool,
}

impl FakeDb {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Teardown closing this connection.
    pub fn teardown(self: &Arc<Self>) -> CleanupFn {
        let this = self.clone();
        Box::new(move || {
            this.close();
            Ok(())
        })
    }
}

/// A message bus that counts published messages.
#[derive(Debug, Default)]
pub struct FakeBus {
    pub name: String,
    published: AtomicUsize,
}

impl FakeBus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            published: AtomicUsize::new(0),
        }
    }

    pub fn publish(&self) {
        self.published.fetch_add(1, Ordering::SeqCst);
    }

    pub fn published(&self) -> usize {
        self.published.load(Ordering::SeqCst)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq, Eq)]
pub struct Sum {
    pub values: Vec<i64>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq, Eq)]
pub struct Total {
    pub total: i64,
}

/// Installs the endpoints used across the transport tests:
///
/// - `/ping` echoes its payload
/// - `/hang` never answers
/// - `/fail` answers with an unavailable status
/// - `/boom` panics
/// - `/sum` adds a JSON list of integers
pub fn install_test_routes(router: &mut Router) {
    router
        .route("/ping", |payload: Bytes| async move { Ok(payload) })
        .route("/hang", |_: Bytes| async move {
            std::future::pending::<()>().await;
            Ok(Bytes::new())
        })
        .route("/fail", |_: Bytes| async move {
            Err(Status::unavailable("backend offline"))
        })
        .route("/boom", |_: Bytes| async move {
            if true {
                panic!("handler exploded");
            }
            Ok(Bytes::new())
        })
        .route_json("/sum", |req: Sum| async move {
            Ok(Total {
                total: req.values.iter().sum(),
            })
        });
}
