//! Stagehand Duplex
//!
//! An in-process request/response transport for tests. A server and its
//! client talk over [`tokio::io::duplex`] pipes instead of a socket, so no
//! port is bound and nothing outside the process can connect.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> stagehand_duplex::Result<()> {
//! use bytes::Bytes;
//!
//! let (client, teardown) = stagehand_duplex::create(|router| {
//!     router.route("/ping", |payload: Bytes| async move { Ok(payload) });
//! })
//! .await?;
//!
//! assert_eq!(client.call("/ping", "hello").await?, "hello");
//!
//! teardown.run();
//! assert!(client.call("/ping", "again").await.unwrap_err().is_closed());
//! # Ok(())
//! # }
//! ```

mod client;
pub mod codec;
mod config;
mod context;
mod error;
pub mod medium;
mod router;
mod server;
mod status;
mod transport;

pub use bytes::{self, Bytes};
pub use client::Client;
pub use config::{DEFAULT_BACKLOG, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FRAME_LENGTH, DuplexConfig};
pub use context::CallContext;
pub use error::{Error, Result};
pub use medium::State;
pub use router::{Handler, HandlerFuture, Router};
pub use status::{Code, Status};
pub use tokio_util::sync::CancellationToken;
pub use transport::{Teardown, create, create_empty, create_with};
