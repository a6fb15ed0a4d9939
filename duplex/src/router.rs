use crate::{
    codec::{Request, Response},
    status::Status,
};
use bytes::Bytes;
use futures::{FutureExt, future::BoxFuture};
use serde::{Serialize, de::DeserializeOwned};
use std::{collections::HashMap, future::Future, panic::AssertUnwindSafe, sync::Arc};

pub type HandlerFuture = BoxFuture<'static, Response>;

/// Serves one endpoint.
///
/// Implemented for every `Fn(Bytes) -> impl Future<Output = Result<Bytes, Status>>`.
pub trait Handler: Send + Sync + 'static {
    fn call(
        &self,
        payload: Bytes,
    ) -> HandlerFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(
        &self,
        payload: Bytes,
    ) -> HandlerFuture {
        Box::pin(self(payload))
    }
}

/// Endpoint table installed on the in-memory server.
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<String, Arc<dyn Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `endpoint`, replacing any earlier handler.
    pub fn route<F, Fut>(
        &mut self,
        endpoint: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static, {
        self.route_handler(endpoint, handler)
    }

    pub fn route_handler<H: Handler>(
        &mut self,
        endpoint: impl Into<String>,
        handler: H,
    ) -> &mut Self {
        let endpoint = endpoint.into();
        if self
            .routes
            .insert(endpoint.clone(), Arc::new(handler))
            .is_some()
        {
            tracing::debug!(%endpoint, "replaced handler");
        }
        self
    }

    /// Registers a handler that speaks JSON on both sides.
    pub fn route_json<Req, Resp, F, Fut>(
        &mut self,
        endpoint: impl Into<String>,
        handler: F,
    ) -> &mut Self
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, Status>> + Send + 'static, {
        let handler = Arc::new(handler);
        self.route(endpoint, move |payload: Bytes| {
            let handler = handler.clone();
            async move {
                let request: Req = serde_json::from_slice(&payload).map_err(|err| {
                    Status::invalid_argument(format!("invalid json request: {err}"))
                })?;
                let response = handler(request).await?;
                serde_json::to_vec(&response)
                    .map(Bytes::from)
                    .map_err(|err| Status::internal(format!("failed to encode json response: {err}")))
            }
        })
    }

    pub fn contains(
        &self,
        endpoint: &str,
    ) -> bool {
        self.routes.contains_key(endpoint)
    }

    pub fn endpoints(&self) -> Vec<&str> {
        let mut endpoints: Vec<_> = self
            .routes
            .keys()
            .map(String::as_str)
            .collect();
        endpoints.sort_unstable();
        endpoints
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Runs the handler for `request`. A panicking handler yields an internal status.
    pub async fn dispatch(
        &self,
        request: Request,
    ) -> Response {
        let Request { endpoint, payload } = request;
        let Some(handler) = self.routes.get(&endpoint).cloned() else {
            tracing::debug!(%endpoint, "no handler registered");
            return Err(Status::not_found(format!(
                "no handler registered for `{endpoint}`"
            )));
        };

        match AssertUnwindSafe(async move { handler.call(payload).await })
            .catch_unwind()
            .await
        {
            Ok(response) => response,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".into());
                tracing::error!(%endpoint, %message, "handler panicked");
                Err(Status::internal(format!(
                    "handler for `{endpoint}` panicked: {message}"
                )))
            },
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("endpoints", &self.endpoints())
            .finish()
    }
}
