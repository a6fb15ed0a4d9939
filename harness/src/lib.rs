//! Stagehand Harness - named test resources with ordered teardown
//!
//! A [`Harness`] is owned by exactly one test scope. It stores opaque values
//! under string names and keeps an ordered list of release actions that run
//! last-in-first-out, at most once, when the scope ends.
//!
//! # Example
//!
//! ```
//! use stagehand_harness::Harness;
//! use std::sync::{Arc, Mutex};
//!
//! let order = Arc::new(Mutex::new(Vec::new()));
//!
//! let harness = Harness::new();
//! for i in 1..=3 {
//!     let order = order.clone();
//!     harness.register_cleanup(move || order.lock().unwrap().push(i));
//! }
//!
//! harness.register("greeting", String::from("hello"));
//! assert_eq!(harness.resource::<String>("greeting").as_deref().map(String::as_str), Some("hello"));
//!
//! harness.teardown();
//! harness.teardown();
//! assert_eq!(*order.lock().unwrap(), vec![3, 2, 1]);
//! ```
//!
//! # Ordering across threads
//!
//! Registrations from different threads are serialized by an internal lock,
//! and their cleanups run in the order the lock was acquired. Callers that
//! need a deterministic teardown order must register from a single thread.

mod cleanup;
mod error;
mod options;

pub use cleanup::CleanupFn;
pub use error::{Error, Result};
pub use options::{HarnessOptions, TeardownPolicy};
pub use stagehand_errors::BoxError;

use cleanup::Cleanup;
use stagehand_events::{FailureBundle, FailureReporter};
use std::{
    any::{Any, type_name},
    collections::HashMap,
    sync::{Arc, Mutex, Once, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// Type-erased handle stored for every resource.
pub type Value = Arc<dyn Any + Send + Sync>;

struct Entry {
    value: Value,
    type_name: &'static str,
}

#[derive(Default)]
struct Inner {
    resources: HashMap<String, Entry>,
    cleanups: Vec<Cleanup>,
    /// Bare actions registered so far, used to label them.
    actions: usize,
    closed: bool,
}

pub struct Harness {
    inner: RwLock<Inner>,
    teardown: Once,
    reporter: Arc<dyn FailureReporter>,
    policy: TeardownPolicy,
    failures: Mutex<FailureBundle>,
}

impl Harness {
    /// A harness reporting through `tracing` that fails the test on any
    /// cleanup failure.
    pub fn new() -> Self {
        Self::with_options(HarnessOptions::default())
    }

    pub fn with_options(options: HarnessOptions) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            teardown: Once::new(),
            reporter: options.reporter,
            policy: options.policy,
            failures: Mutex::new(FailureBundle::new()),
        }
    }

    /// Harness for unit tests. Same behavior as [`Harness::new`].
    pub fn unit() -> Self {
        Self::new()
    }

    /// Harness for integration tests. Same behavior as [`Harness::new`].
    pub fn integration() -> Self {
        Self::new()
    }

    pub fn reporter(&self) -> &Arc<dyn FailureReporter> {
        &self.reporter
    }

    pub fn policy(&self) -> TeardownPolicy {
        self.policy
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` under `name`. A later registration under the same name
    /// replaces the value seen by lookups.
    pub fn register<T>(
        &self,
        name: impl Into<String>,
        value: T,
    ) where
        T: Any + Send + Sync, {
        self.register_arc(name, Arc::new(value), None);
    }

    /// Stores `value` under `name` and schedules `cleanup` for teardown.
    ///
    /// Re-registering a name does not cancel the earlier cleanup: both run,
    /// each at its own position in the teardown order.
    pub fn register_with_cleanup<T, F>(
        &self,
        name: impl Into<String>,
        value: T,
        cleanup: F,
    ) where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<(), BoxError> + Send + Sync + 'static, {
        self.register_arc(name, Arc::new(value), Some(Box::new(cleanup)));
    }

    /// Stores an already shared value, with an optional cleanup.
    pub fn register_arc<T>(
        &self,
        name: impl Into<String>,
        value: Arc<T>,
        cleanup: Option<CleanupFn>,
    ) where
        T: Any + Send + Sync, {
        let name = name.into();
        let entry = Entry {
            value,
            type_name: type_name::<T>(),
        };

        let mut inner = self.write();
        if inner.closed {
            drop(inner);
            tracing::warn!(resource = %name, "registered after teardown; releasing immediately");
            if let Some(cleanup) = cleanup {
                self.run_late(Cleanup::resource(&name, cleanup));
            }
            return;
        }

        if inner
            .resources
            .insert(name.clone(), entry)
            .is_some()
        {
            tracing::debug!(resource = %name, "resource replaced; earlier cleanup stays scheduled");
        }
        if let Some(cleanup) = cleanup {
            inner
                .cleanups
                .push(Cleanup::resource(&name, cleanup));
        }
        tracing::debug!(resource = %name, ty = type_name::<T>(), "registered resource");
    }

    /// Schedules a release action that is not tied to a named resource.
    pub fn register_cleanup<F>(
        &self,
        cleanup: F,
    ) where
        F: FnOnce() + Send + Sync + 'static, {
        let mut inner = self.write();
        inner.actions += 1;
        let action = Cleanup::bare(inner.actions, Box::new(cleanup));

        if inner.closed {
            drop(inner);
            tracing::warn!(action = action.subject(), "registered after teardown; running immediately");
            self.run_late(action);
            return;
        }

        tracing::debug!(action = action.subject(), "registered cleanup");
        inner.cleanups.push(action);
    }

    /// The most recently registered value for `name`, untyped.
    pub fn lookup(
        &self,
        name: &str,
    ) -> Option<Value> {
        self.read()
            .resources
            .get(name)
            .map(|entry| entry.value.clone())
    }

    /// The value for `name` if it exists and is a `T`. Absence and a type
    /// mismatch are both `None`; use [`Harness::try_resource`] to tell them
    /// apart.
    pub fn resource<T>(
        &self,
        name: &str,
    ) -> Option<Arc<T>>
    where
        T: Any + Send + Sync, {
        self.try_resource(name).ok()
    }

    pub fn try_resource<T>(
        &self,
        name: &str,
    ) -> Result<Arc<T>>
    where
        T: Any + Send + Sync, {
        let inner = self.read();
        let entry = inner
            .resources
            .get(name)
            .ok_or_else(|| {
                Error::NotFound {
                    name: name.to_string(),
                }
            })?;

        entry
            .value
            .clone()
            .downcast::<T>()
            .map_err(|_| {
                Error::WrongType {
                    name: name.to_string(),
                    expected: type_name::<T>(),
                    actual: entry.type_name,
                }
            })
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.read().resources.contains_key(name)
    }

    /// Registered resource names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .read()
            .resources
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Number of release actions still waiting for teardown.
    pub fn pending_cleanups(&self) -> usize {
        self.read().cleanups.len()
    }

    pub fn is_torn_down(&self) -> bool {
        self.teardown.is_completed()
    }

    /// Failures recorded by teardown, empty until teardown has run.
    pub fn failures(&self) -> FailureBundle {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs every release action in reverse registration order, once.
    ///
    /// Concurrent callers block until the single execution has finished.
    /// A failing or panicking action is reported and the remaining actions
    /// still run. Calling `teardown` from inside a release action deadlocks.
    pub fn teardown(&self) {
        let mut ran = false;
        // a poisoned latch means an earlier run already unwound; never rerun it
        self.teardown.call_once_force(|state| {
            if state.is_poisoned() {
                return;
            }
            ran = true;
            self.run_teardown();
        });

        if ran && self.policy == TeardownPolicy::FailTest && !std::thread::panicking() {
            let failures = self.failures();
            if failures.has_errors() {
                panic!(
                    "teardown reported {}: {}",
                    failures,
                    failures
                        .errors
                        .iter()
                        .map(|f| f.message.as_str())
                        .collect::<Vec<_>>()
                        .join("; ")
                );
            }
        }
    }

    /// Alias for [`Harness::teardown`].
    pub fn close(&self) {
        self.teardown();
    }

    fn run_teardown(&self) {
        let ops = {
            let mut inner = self.write();
            inner.closed = true;
            std::mem::take(&mut inner.cleanups)
        };

        tracing::debug!(actions = ops.len(), "teardown started");

        let mut bundle = FailureBundle::new();
        for op in ops.into_iter().rev() {
            if let Err(failure) = op.run() {
                stagehand_events::emit(self.reporter.as_ref(), &failure);
                bundle.push(failure);
            }
        }
        stagehand_events::flush(self.reporter.as_ref());

        tracing::debug!(failures = bundle.error_count(), "teardown finished");

        *self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = bundle;

        let resources = std::mem::take(&mut self.write().resources);
        drop(resources);
    }

    fn run_late(
        &self,
        action: Cleanup,
    ) {
        if let Err(failure) = action.run() {
            stagehand_events::emit(self.reporter.as_ref(), &failure);
            self.failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(failure);
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("Harness")
            .field("resources", &inner.resources.len())
            .field("cleanups", &inner.cleanups.len())
            .field("policy", &self.policy)
            .field("torn_down", &self.teardown.is_completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_events::CollectingReporter;
    use std::sync::{
        Weak,
        atomic::{AtomicUsize, Ordering},
    };

    fn reporting(reporter: Arc<CollectingReporter>) -> Harness {
        Harness::with_options(
            HarnessOptions::builder()
                .reporter(reporter)
                .policy(TeardownPolicy::ReportOnly)
                .build(),
        )
    }

    type Action = Box<dyn FnOnce() + Send + Sync>;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Action) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |tag: &'static str| {
            let sink = sink.clone();
            Box::new(move || sink.lock().unwrap().push(tag)) as Action
        };
        (log, make)
    }

    #[test]
    fn lookup_missing_is_none() {
        let harness = Harness::new();
        assert!(harness.lookup("nope").is_none());
        assert!(harness.resource::<String>("nope").is_none());
        assert!(
            harness
                .try_resource::<String>("nope")
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn typed_lookup_distinguishes_wrong_type() {
        let harness = Harness::new();
        harness.register("int", 123_i32);

        assert_eq!(harness.resource::<i32>("int").as_deref(), Some(&123));
        assert!(harness.resource::<String>("int").is_none());

        let err = harness
            .try_resource::<String>("int")
            .unwrap_err();
        assert!(err.is_wrong_type());
        let message = err.to_string();
        assert!(message.starts_with("resource `int` is a `i32`"));
        assert!(message.contains("String"));
    }

    #[test]
    fn untyped_lookup_downcasts() {
        let harness = Harness::new();
        harness.register("test", "value");

        let value = harness.lookup("test").unwrap();
        assert_eq!(value.downcast_ref::<&str>(), Some(&"value"));
    }

    #[test]
    fn last_registration_wins_and_both_cleanups_run() {
        let (log, make) = recorder();
        let harness = Harness::new();

        let v1 = make("v1");
        harness.register_with_cleanup("x", 1_u8, move || {
            v1();
            Ok(())
        });
        let v2 = make("v2");
        harness.register_with_cleanup("x", 2_u8, move || {
            v2();
            Ok(())
        });

        assert_eq!(harness.resource::<u8>("x").as_deref(), Some(&2));
        assert_eq!(harness.names(), vec!["x".to_string()]);
        assert_eq!(harness.pending_cleanups(), 2);

        harness.teardown();
        assert_eq!(*log.lock().unwrap(), vec!["v2", "v1"]);
    }

    #[test]
    fn cleanup_is_not_run_on_registration() {
        let (log, make) = recorder();
        let harness = Harness::new();
        harness.register_cleanup(make("a"));

        assert!(log.lock().unwrap().is_empty());
        drop(harness);
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[test]
    fn teardown_is_idempotent() {
        let count = Arc::new(AtomicUsize::new(0));
        let harness = Harness::new();
        let c = count.clone();
        harness.register_cleanup(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        harness.teardown();
        harness.close();
        harness.teardown();
        drop(harness);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test_case::test_case(1)]
    #[test_case::test_case(2)]
    #[test_case::test_case(25)]
    fn cleanups_run_in_reverse(n: usize) {
        let order = Arc::new(Mutex::new(Vec::new()));
        let harness = Harness::new();
        for i in 0..n {
            let order = order.clone();
            harness.register_cleanup(move || order.lock().unwrap().push(i));
        }

        harness.teardown();
        let expected: Vec<_> = (0..n).rev().collect();
        assert_eq!(*order.lock().unwrap(), expected);
    }

    #[test]
    fn mixed_cleanups_run_lifo() {
        let (log, make) = recorder();
        let harness = Harness::new();

        harness.register_cleanup(make("first"));
        let resource = make("resource");
        harness.register_with_cleanup("db", (), move || {
            resource();
            Ok(())
        });
        harness.register_cleanup(make("last"));

        harness.teardown();
        assert_eq!(*log.lock().unwrap(), vec!["last", "resource", "first"]);
    }

    #[test]
    fn failures_are_reported_and_do_not_stop_teardown() {
        let reporter = Arc::new(CollectingReporter::new());
        let (log, make) = recorder();
        let harness = reporting(reporter.clone());

        harness.register_cleanup(make("earliest"));
        harness.register_with_cleanup("db", (), || Err("boom".into()));
        harness.register_cleanup(|| panic!("bus exploded"));
        harness.register_cleanup(make("latest"));

        harness.teardown();

        assert_eq!(*log.lock().unwrap(), vec!["latest", "earliest"]);

        let failures = harness.failures();
        assert_eq!(failures.error_count(), 2);
        assert_eq!(failures.error_subjects(), vec!["action #2", "db"]);

        let reported = reporter.take();
        assert_eq!(reported.len(), 2);
        assert_eq!(reported[1].message, "cleanup `db` failed: boom");
    }

    #[test]
    fn bare_actions_are_numbered_among_themselves() {
        let reporter = Arc::new(CollectingReporter::new());
        let harness = reporting(reporter.clone());

        harness.register_with_cleanup("db", (), || Ok(()));
        harness.register_with_cleanup("bus", (), || Ok(()));
        harness.register_cleanup(|| panic!("listener already gone"));

        harness.teardown();
        assert_eq!(harness.failures().error_subjects(), vec!["action #1"]);
    }

    struct PanickingReporter;

    impl FailureReporter for PanickingReporter {
        fn emit(
            &self,
            _: &stagehand_events::Failure,
        ) -> std::result::Result<(), stagehand_events::ReporterError> {
            panic!("reporter sink exploded")
        }
    }

    #[test]
    fn panicking_reporter_does_not_abort_teardown() {
        let (log, make) = recorder();
        let harness = Harness::with_options(
            HarnessOptions::builder()
                .reporter(Arc::new(PanickingReporter))
                .policy(TeardownPolicy::ReportOnly)
                .build(),
        );
        harness.register_cleanup(make("first"));
        harness.register_with_cleanup("db", (), || Err("boom".into()));

        harness.teardown();
        assert!(harness.is_torn_down());
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
        assert_eq!(harness.failures().error_subjects(), vec!["db"]);
        drop(harness);
    }

    #[test]
    #[should_panic(expected = "cleanup `db` failed: boom")]
    fn fail_test_policy_panics_after_teardown() {
        let harness = Harness::with_options(
            HarnessOptions::builder()
                .reporter(Arc::new(CollectingReporter::new()))
                .build(),
        );
        harness.register_with_cleanup("db", (), || Err("boom".into()));
        harness.teardown();
    }

    #[test]
    fn cleanup_may_look_up_siblings() {
        let harness = Arc::new(Harness::new());
        let seen = Arc::new(Mutex::new(None));

        harness.register("config", String::from("postgres://test"));

        let weak: Weak<Harness> = Arc::downgrade(&harness);
        let out = seen.clone();
        harness.register_cleanup(move || {
            if let Some(h) = weak.upgrade() {
                *out.lock().unwrap() = h
                    .resource::<String>("config")
                    .map(|s| s.as_str().to_owned());
            }
        });

        harness.teardown();
        assert_eq!(
            seen.lock().unwrap().as_deref(),
            Some("postgres://test")
        );
    }

    #[test]
    fn values_are_released_by_teardown() {
        let value = Arc::new(5_u32);
        let harness = Harness::new();
        harness.register_arc("shared", value.clone(), None);
        assert_eq!(Arc::strong_count(&value), 2);

        harness.teardown();
        assert_eq!(Arc::strong_count(&value), 1);
        assert!(!harness.contains("shared"));
    }

    #[test]
    fn late_registration_runs_immediately() {
        let reporter = Arc::new(CollectingReporter::new());
        let (log, make) = recorder();
        let harness = reporting(reporter.clone());
        harness.teardown();

        harness.register_cleanup(make("late"));
        assert_eq!(*log.lock().unwrap(), vec!["late"]);

        harness.register_with_cleanup("db", 1_u8, || Err("already gone".into()));
        assert!(!harness.contains("db"));
        assert_eq!(reporter.len(), 1);
        assert_eq!(harness.failures().error_subjects(), vec!["db"]);
    }

    #[test]
    fn concurrent_teardown_runs_once() {
        stagehand_testing::logging();

        let count = Arc::new(AtomicUsize::new(0));
        let harness = Arc::new(Harness::new());
        for _ in 0..16 {
            let c = count.clone();
            harness.register_cleanup(move || {
                c.fetch_add(1, Ordering::SeqCst);
            });
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let h = harness.clone();
                std::thread::spawn(move || h.teardown())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(count.load(Ordering::SeqCst), 16);
        assert!(harness.is_torn_down());
    }

    #[test]
    fn debug_output_summarizes() {
        let harness = Harness::new();
        harness.register("a", 1_u8);
        let rendered = format!("{harness:?}");
        assert!(rendered.contains("resources: 1"));
        assert!(rendered.contains("torn_down: false"));
    }
}
