use tracing_subscriber::EnvFilter;

pub const DEFAULT_LEVEL: &str = "trace";

/// Installs a fmt subscriber at trace level, once per process.
pub fn logging() {
    logging_at(DEFAULT_LEVEL);
}

/// Installs a fmt subscriber once per process. `RUST_LOG` takes precedence
/// over `level`; an already-installed global subscriber is left in place.
pub fn logging_at(level: &str) {
    use std::sync::Once;

    static ONCE: Once = Once::new();

    ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
