use crate::{
    codec::{self, Request, Transport},
    medium::Listener,
    router::Router,
    status::Status,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Accept loop serving a [`Router`] over an in-memory [`Listener`].
pub(crate) struct Server {
    listener: Listener,
    router: Arc<Router>,
    shutdown: CancellationToken,
    max_frame_length: usize,
}

impl Server {
    pub(crate) fn new(
        listener: Listener,
        router: Router,
        shutdown: CancellationToken,
        max_frame_length: usize,
    ) -> Self {
        Self {
            listener,
            router: Arc::new(router),
            shutdown,
            max_frame_length,
        }
    }

    pub(crate) fn spawn(self) -> JoinHandle<()> {
        self.listener.mark_serving();
        tokio::spawn(self.run())
    }

    async fn run(self) {
        tracing::debug!(endpoints = ?self.router.endpoints(), "in-memory server started");

        let mut connections = 0usize;
        loop {
            let stream = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(stream) => stream,
                    Err(_) => break,
                },
            };

            connections += 1;
            let connection = Connection {
                id: connections,
                router: self.router.clone(),
                shutdown: self.shutdown.child_token(),
                transport: codec::framed(stream, self.max_frame_length),
                max_frame_length: self.max_frame_length,
            };
            tokio::spawn(connection.serve());
        }

        tracing::debug!(connections, "in-memory server stopped");
    }
}

struct Connection {
    id: usize,
    router: Arc<Router>,
    shutdown: CancellationToken,
    transport: Transport,
    max_frame_length: usize,
}

impl Connection {
    async fn serve(mut self) {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                frame = self.transport.next() => frame,
            };

            let frame = match frame {
                Some(Ok(frame)) => frame.freeze(),
                Some(Err(err)) => {
                    tracing::debug!(connection = self.id, "read failed: {err}");
                    break;
                },
                None => break,
            };

            let response = match Request::decode(frame) {
                Ok(request) => {
                    let endpoint = request.endpoint.clone();
                    tracing::trace!(connection = self.id, %endpoint, "dispatching");
                    // a caller holds one request in flight, so any read here means it hung up
                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => break,
                        _ = self.transport.next() => {
                            tracing::debug!(connection = self.id, %endpoint, "caller went away; dropping handler");
                            break;
                        },
                        response = self.router.dispatch(request) => response,
                    }
                },
                Err(err) => {
                    tracing::warn!(connection = self.id, "malformed request: {err}");
                    Err(Status::invalid_argument(format!("malformed request: {err}")))
                },
            };

            let mut encoded = codec::encode_response(&response);
            if encoded.len() > self.max_frame_length {
                encoded = codec::encode_response(&Err(Status::internal(format!(
                    "response of {} bytes exceeds the frame limit of {}",
                    encoded.len(),
                    self.max_frame_length
                ))));
            }

            if let Err(err) = self.transport.send(encoded).await {
                tracing::debug!(connection = self.id, "write failed: {err}");
                break;
            }
        }

        tracing::trace!(connection = self.id, "connection closed");
    }
}
