use crate::{BUS_RESOURCE, DB_RESOURCE, builder::TestKitBuilder, config::KitConfig};
use stagehand_duplex::Client;
use stagehand_events::FailureBundle;
use stagehand_harness::Harness;
use std::{any::Any, sync::Arc};

/// Per-test bundle of a [`Harness`] and the collaborators registered into it.
///
/// Dropping the kit tears the harness down.
pub struct TestKit {
    harness: Harness,
    rpc: Client,
    config: KitConfig,
}

impl TestKit {
    pub(crate) fn new(
        harness: Harness,
        rpc: Client,
        config: KitConfig,
    ) -> Self {
        Self {
            harness,
            rpc,
            config,
        }
    }

    pub fn builder() -> TestKitBuilder {
        TestKitBuilder::new()
    }

    pub fn unit() -> TestKitBuilder {
        Self::builder()
    }

    pub fn integration() -> TestKitBuilder {
        Self::builder()
    }

    pub fn harness(&self) -> &Harness {
        &self.harness
    }

    /// Client connected to the in-memory RPC server.
    pub fn rpc(&self) -> &Client {
        &self.rpc
    }

    pub fn config(&self) -> &KitConfig {
        &self.config
    }

    pub fn db<C>(&self) -> Option<Arc<C>>
    where
        C: Any + Send + Sync, {
        self.harness.resource(DB_RESOURCE)
    }

    pub fn bus<B>(&self) -> Option<Arc<B>>
    where
        B: Any + Send + Sync, {
        self.harness.resource(BUS_RESOURCE)
    }

    pub fn resource<T>(
        &self,
        name: &str,
    ) -> Option<Arc<T>>
    where
        T: Any + Send + Sync, {
        self.harness.resource(name)
    }

    pub fn try_resource<T>(
        &self,
        name: &str,
    ) -> stagehand_harness::Result<Arc<T>>
    where
        T: Any + Send + Sync, {
        self.harness.try_resource(name)
    }

    pub fn teardown(&self) {
        self.harness.teardown();
    }

    pub fn failures(&self) -> FailureBundle {
        self.harness.failures()
    }
}

impl std::fmt::Debug for TestKit {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TestKit")
            .field("harness", &self.harness)
            .field("rpc", &self.rpc)
            .finish_non_exhaustive()
    }
}
