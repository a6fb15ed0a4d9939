//! Stagehand
//!
//! Per-test wiring for the stagehand harness and in-memory transport. A
//! [`TestKit`] owns one [`Harness`], registers every collaborator handed to
//! its builder into it, and tears all of them down in reverse when dropped.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> stagehand::Result<()> {
//! use stagehand::{Bytes, suite};
//!
//! let kit = suite::test_case()
//!     .with_rpc(|router| {
//!         router.route("/ping", |payload: Bytes| async move { Ok(payload) });
//!     })
//!     .build()
//!     .await?;
//!
//! assert_eq!(kit.rpc().call("/ping", "hi").await?, "hi");
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
mod error;
mod kit;
pub mod suite;

pub use builder::TestKitBuilder;
pub use config::{CONFIG_FILE, ENV_PREFIX, KitConfig, LoggingConfig};
pub use error::{KitError, Result};
pub use kit::TestKit;

pub use stagehand_duplex::{
    self as duplex, Bytes, CallContext, Client, Code, DuplexConfig, Router, Status,
};
pub use stagehand_events::{
    self as events, CollectingReporter, FailureBundle, FailureReporter, ReporterKind,
};
pub use stagehand_harness::{
    self as harness, BoxError, CleanupFn, Harness, HarnessOptions, TeardownPolicy,
};

/// Name the database connection is registered under.
pub const DB_RESOURCE: &str = "db";
/// Name the message bus is registered under.
pub const BUS_RESOURCE: &str = "bus";
/// Name the in-memory RPC client is registered under.
pub const RPC_RESOURCE: &str = "rpc";

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recorder(
        log: &Log,
        label: &'static str,
    ) -> Option<CleanupFn> {
        let log = log.clone();
        Some(Box::new(move || {
            log.lock().unwrap().push(label);
            Ok(())
        }))
    }

    struct Db(&'static str);
    struct Bus(&'static str);

    #[tokio::test(flavor = "multi_thread")]
    async fn rpc_is_always_available() {
        let kit = TestKit::builder().build().await.unwrap();
        let err = kit.rpc().call("/ping", "").await.unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
        assert!(kit.resource::<Client>(RPC_RESOURCE).is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn teardown_runs_in_reverse_of_wiring() {
        let log = Log::default();
        let kit = TestKit::builder()
            .with_db_instance(Db("instance"), recorder(&log, "db"))
            .with_bus_instance(Bus("first"), recorder(&log, "bus-1"))
            .with_bus_instance(Bus("second"), recorder(&log, "bus-2"))
            .with_resource("cache", 7u32, recorder(&log, "cache"))
            .build()
            .await
            .unwrap();

        assert_eq!(kit.bus::<Bus>().unwrap().0, "second");
        assert_eq!(kit.db::<Db>().unwrap().0, "instance");
        assert_eq!(*kit.resource::<u32>("cache").unwrap(), 7);

        let rpc = kit.rpc().clone();
        kit.teardown();

        assert_eq!(*log.lock().unwrap(), ["cache", "bus-2", "bus-1", "db"]);
        assert!(rpc.is_closed());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn factory_takes_precedence_over_instance() {
        let log = Log::default();
        let factory_log = log.clone();
        let kit = TestKit::builder()
            .with_db_instance(Db("instance"), recorder(&log, "instance"))
            .with_ephemeral_db(move || async move {
                Ok((Db("ephemeral"), recorder(&factory_log, "ephemeral")))
            })
            .build()
            .await
            .unwrap();

        assert_eq!(kit.db::<Db>().unwrap().0, "ephemeral");
        drop(kit);
        assert_eq!(*log.lock().unwrap(), ["ephemeral"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn factory_error_fails_build() {
        let err = TestKit::builder()
            .with_ephemeral_db(|| async { Err::<(Db, Option<CleanupFn>), BoxError>("no database".into()) })
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, KitError::DbFactory(_)), "{err}");
        insta::assert_snapshot!(err.to_string(), @"database factory failed: no database");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failing_cleanup_is_reported_per_policy() {
        let reporter = Arc::new(CollectingReporter::default());
        let kit = TestKit::builder()
            .config(KitConfig {
                teardown: TeardownPolicy::ReportOnly,
                ..KitConfig::default()
            })
            .reporter(reporter.clone())
            .with_resource(
                "queue",
                (),
                Some(Box::new(|| Err::<(), BoxError>("still draining".into()))),
            )
            .build()
            .await
            .unwrap();

        kit.teardown();
        let failures = kit.failures();
        assert_eq!(failures.error_subjects(), vec!["queue"]);
        assert_eq!(reporter.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn configured_reporter_is_used_without_override() {
        for reporter in [ReporterKind::Stderr, ReporterKind::NoOp] {
            let kit = TestKit::builder()
                .config(KitConfig {
                    teardown: TeardownPolicy::ReportOnly,
                    reporter,
                    ..KitConfig::default()
                })
                .with_resource(
                    "queue",
                    (),
                    Some(Box::new(|| Err::<(), BoxError>("still draining".into()))),
                )
                .build()
                .await
                .unwrap();

            kit.teardown();
            assert_eq!(kit.failures().error_subjects(), vec!["queue"]);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_config_is_rejected() {
        let mut config = KitConfig::default();
        config.duplex.backlog = 0;
        let err = TestKit::builder()
            .config(config)
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, KitError::InvalidConfig(_)), "{err}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn suite_builders_wire_rpc() {
        for builder in [suite::test_case(), suite::integration_test()] {
            let kit = builder
                .with_rpc(|router| {
                    router.route("/health", |_: Bytes| async move { Ok(Bytes::from_static(b"ok")) });
                })
                .build()
                .await
                .unwrap();
            assert_eq!(kit.rpc().call("/health", "").await.unwrap(), "ok");
        }
    }
}
