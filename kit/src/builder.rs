use crate::{
    BUS_RESOURCE, DB_RESOURCE, RPC_RESOURCE,
    config::KitConfig,
    error::{KitError, Result},
    kit::TestKit,
};
use futures::{FutureExt, future::BoxFuture};
use stagehand_duplex::Router;
use stagehand_events::FailureReporter;
use stagehand_harness::{BoxError, CleanupFn, Harness, HarnessOptions, TeardownPolicy};
use std::{any::Any, future::Future, sync::Arc};
use validator::Validate;

type Registration = Box<dyn FnOnce(&Harness) + Send>;
type DbFactory = Box<dyn FnOnce() -> BoxFuture<'static, Result<Registration, BoxError>> + Send>;
type Installer = Box<dyn FnOnce(&mut Router) + Send>;

fn registration<T>(
    name: impl Into<String>,
    value: T,
    cleanup: Option<CleanupFn>,
) -> Registration
where
    T: Any + Send + Sync, {
    let name = name.into();
    Box::new(move |harness: &Harness| harness.register_arc(name, Arc::new(value), cleanup))
}

/// Collects collaborators for a [`TestKit`]. Nothing is constructed until
/// [`TestKitBuilder::build`].
#[derive(Default)]
#[must_use]
pub struct TestKitBuilder {
    config: Option<KitConfig>,
    reporter: Option<Arc<dyn FailureReporter>>,
    policy: Option<TeardownPolicy>,
    rpc: Option<Installer>,
    db_factory: Option<DbFactory>,
    db_instance: Option<Registration>,
    buses: Vec<Registration>,
    resources: Vec<Registration>,
}

impl TestKitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: KitConfig,
    ) -> Self {
        self.config = Some(config);
        self
    }

    pub fn reporter(
        mut self,
        reporter: Arc<dyn FailureReporter>,
    ) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Overrides the policy from the configuration.
    pub fn policy(
        mut self,
        policy: TeardownPolicy,
    ) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Handlers for the in-memory RPC server. A later call replaces an earlier one.
    pub fn with_rpc<F>(
        mut self,
        install: F,
    ) -> Self
    where
        F: FnOnce(&mut Router) + Send + 'static, {
        self.rpc = Some(Box::new(install));
        self
    }

    /// A ready database connection. Ignored when a factory is also given.
    pub fn with_db_instance<C>(
        mut self,
        conn: C,
        teardown: Option<CleanupFn>,
    ) -> Self
    where
        C: Any + Send + Sync, {
        self.db_instance = Some(registration(DB_RESOURCE, conn, teardown));
        self
    }

    /// Creates the database connection during [`TestKitBuilder::build`].
    pub fn with_ephemeral_db<C, F, Fut>(
        mut self,
        factory: F,
    ) -> Self
    where
        C: Any + Send + Sync,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(C, Option<CleanupFn>), BoxError>> + Send + 'static, {
        self.db_factory = Some(Box::new(move || {
            async move {
                let (conn, teardown) = factory().await?;
                Ok::<_, BoxError>(registration(DB_RESOURCE, conn, teardown))
            }
            .boxed()
        }));
        self
    }

    /// The last bus wins for lookups; every teardown given is kept.
    pub fn with_bus_instance<B>(
        mut self,
        bus: B,
        teardown: Option<CleanupFn>,
    ) -> Self
    where
        B: Any + Send + Sync, {
        self.buses
            .push(registration(BUS_RESOURCE, bus, teardown));
        self
    }

    pub fn with_resource<T>(
        mut self,
        name: impl Into<String>,
        value: T,
        cleanup: Option<CleanupFn>,
    ) -> Self
    where
        T: Any + Send + Sync, {
        self.resources
            .push(registration(name, value, cleanup));
        self
    }

    /// Wires every collaborator into a fresh harness: database, RPC transport,
    /// buses, then extra resources. Teardown releases them in reverse.
    pub async fn build(self) -> Result<TestKit> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        if config.logging.capture {
            stagehand_testing::logging_at(&config.logging.level);
        }

        let harness = Harness::with_options(
            HarnessOptions::builder()
                .reporter(
                    self.reporter
                        .unwrap_or_else(|| config.reporter.build()),
                )
                .policy(self.policy.unwrap_or(config.teardown))
                .build(),
        );

        if let Some(factory) = self.db_factory {
            let register = factory()
                .await
                .map_err(KitError::DbFactory)?;
            register(&harness);
        } else if let Some(register) = self.db_instance {
            register(&harness);
        }

        let install = self.rpc;
        let (rpc, teardown) = stagehand_duplex::create_with(&config.duplex, |router| {
            if let Some(install) = install {
                install(router);
            }
        })
        .await?;
        harness.register_with_cleanup(RPC_RESOURCE, rpc.clone(), move || {
            teardown.run();
            Ok(())
        });

        for register in self
            .buses
            .into_iter()
            .chain(self.resources)
        {
            register(&harness);
        }

        tracing::debug!(resources = ?harness.names(), "test kit ready");
        Ok(TestKit::new(harness, rpc, config))
    }
}

impl std::fmt::Debug for TestKitBuilder {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TestKitBuilder")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("rpc", &self.rpc.is_some())
            .field("db_factory", &self.db_factory.is_some())
            .field("db_instance", &self.db_instance.is_some())
            .field("buses", &self.buses.len())
            .field("resources", &self.resources.len())
            .finish_non_exhaustive()
    }
}
