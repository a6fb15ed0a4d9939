//! Intent-revealing entry points over [`TestKit::builder`].

use crate::{builder::TestKitBuilder, kit::TestKit};

/// A minimal kit; compose collaborators on the returned builder.
pub fn test_case() -> TestKitBuilder {
    TestKit::unit()
}

/// Same builder as [`test_case`], for tests that wire real collaborators.
pub fn integration_test() -> TestKitBuilder {
    TestKit::integration()
}
