use serde::Deserialize;
use std::time::Duration;
use validator::Validate;

/// Per-direction buffer of one in-memory connection.
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;
pub const DEFAULT_BACKLOG: usize = 64;
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 4 * 1024 * 1024;

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_backlog() -> usize {
    DEFAULT_BACKLOG
}

fn default_max_frame_length() -> usize {
    DEFAULT_MAX_FRAME_LENGTH
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Validate, bon::Builder)]
pub struct DuplexConfig {
    #[serde(default = "default_buffer_size", alias = "BUFFER_SIZE")]
    #[validate(range(min = 1))]
    #[builder(default = DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,

    /// Dialled connections that may wait for the server to accept them.
    #[serde(default = "default_backlog", alias = "BACKLOG")]
    #[validate(range(min = 1))]
    #[builder(default = DEFAULT_BACKLOG)]
    pub backlog: usize,

    #[serde(default = "default_max_frame_length", alias = "MAX_FRAME_LENGTH")]
    #[validate(range(min = 64))]
    #[builder(default = DEFAULT_MAX_FRAME_LENGTH)]
    pub max_frame_length: usize,

    /// Deadline applied to calls whose context carries none.
    #[serde(default, alias = "CALL_TIMEOUT_MS")]
    pub call_timeout_ms: Option<u64>,
}

impl DuplexConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms
            .map(Duration::from_millis)
    }
}

impl Default for DuplexConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
