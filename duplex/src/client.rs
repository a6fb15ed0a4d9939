use crate::{
    codec::{self, Request, Transport},
    config::DuplexConfig,
    context::CallContext,
    error::{Error, Result},
    medium::Dialer,
};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Serialize, de::DeserializeOwned};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

struct Inner {
    dialer: Dialer,
    transport: Mutex<Option<Transport>>,
    closed: CancellationToken,
    max_frame_length: usize,
    call_timeout: Option<Duration>,
}

/// Client side of an in-memory transport.
///
/// Clones share one connection and serialize their calls over it. Use
/// [`Client::fresh`] for an independent connection to the same server.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    pub(crate) fn new(
        dialer: Dialer,
        config: &DuplexConfig,
        closed: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                dialer,
                transport: Mutex::new(None),
                closed,
                max_frame_length: config.max_frame_length,
                call_timeout: config.call_timeout(),
            }),
        }
    }

    /// Dials now instead of on the first call.
    pub(crate) async fn connect(&self) -> Result<()> {
        let mut slot = self.inner.transport.lock().await;
        if slot.is_none() {
            *slot = Some(self.dial().await?);
        }
        Ok(())
    }

    async fn dial(&self) -> Result<Transport> {
        let stream = self.inner.dialer.dial().await?;
        Ok(codec::framed(stream, self.inner.max_frame_length))
    }

    /// A client with its own connection. Closing the parent closes it too.
    pub fn fresh(&self) -> Self {
        Self {
            inner: Arc::new(Inner {
                dialer: self.inner.dialer.clone(),
                transport: Mutex::new(None),
                closed: self.inner.closed.child_token(),
                max_frame_length: self.inner.max_frame_length,
                call_timeout: self.inner.call_timeout,
            }),
        }
    }

    pub async fn call(
        &self,
        endpoint: &str,
        payload: impl Into<Bytes>,
    ) -> Result<Bytes> {
        self.call_with(&CallContext::new(), endpoint, payload)
            .await
    }

    pub async fn call_with(
        &self,
        ctx: &CallContext,
        endpoint: &str,
        payload: impl Into<Bytes>,
    ) -> Result<Bytes> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        let ctx = ctx.or_timeout(self.inner.call_timeout);
        ctx.check()?;

        let request = Request::new(endpoint, payload).encode()?;
        tokio::select! {
            biased;
            _ = self.inner.closed.cancelled() => Err(Error::Closed),
            err = ctx.done() => {
                tracing::debug!(endpoint, "call abandoned: {err}");
                Err(err)
            },
            response = self.roundtrip(request) => response,
        }
    }

    pub async fn call_json<Req, Resp>(
        &self,
        endpoint: &str,
        request: &Req,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned, {
        self.call_json_with(&CallContext::new(), endpoint, request)
            .await
    }

    pub async fn call_json_with<Req, Resp>(
        &self,
        ctx: &CallContext,
        endpoint: &str,
        request: &Req,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned, {
        let payload = serde_json::to_vec(request)?;
        let response = self
            .call_with(ctx, endpoint, payload)
            .await?;
        Ok(serde_json::from_slice(&response)?)
    }

    // The connection is held outside the slot while in flight, so an abandoned
    // call drops it and the next call dials again.
    async fn roundtrip(
        &self,
        request: Bytes,
    ) -> Result<Bytes> {
        let mut slot = self.inner.transport.lock().await;
        let mut transport = match slot.take() {
            Some(transport) => transport,
            None => self.dial().await?,
        };

        transport.send(request).await?;
        let frame = match transport.next().await {
            Some(frame) => frame?,
            None => return Err(Error::Closed),
        };
        let response = codec::decode_response(frame.freeze())?;

        *slot = Some(transport);
        response.map_err(Error::from)
    }

    pub fn close(&self) {
        self.inner.closed.cancel();
        if let Ok(mut slot) = self.inner.transport.try_lock() {
            slot.take();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("closed", &self.is_closed())
            .field("dialer", &self.inner.dialer)
            .finish_non_exhaustive()
    }
}
