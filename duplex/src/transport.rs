use crate::{
    client::Client,
    config::DuplexConfig,
    error::Result,
    medium::{self, Listener, State},
    router::Router,
    server::Server,
};
use tokio_util::sync::CancellationToken;

/// Starts a server with no endpoints.
pub async fn create_empty() -> Result<(Client, Teardown)> {
    create(|_| {}).await
}

/// Starts a server with the default [`DuplexConfig`].
pub async fn create<F>(install: F) -> Result<(Client, Teardown)>
where
    F: FnOnce(&mut Router), {
    create_with(&DuplexConfig::default(), install).await
}

/// Binds a private medium, lets `install` register handlers, starts serving
/// and returns a connected client with the [`Teardown`] that stops it all.
///
/// # Panics
///
/// When not polled from within a Tokio runtime.
pub async fn create_with<F>(
    config: &DuplexConfig,
    install: F,
) -> Result<(Client, Teardown)>
where
    F: FnOnce(&mut Router), {
    if tokio::runtime::Handle::try_current().is_err() {
        panic!("an in-memory transport must be created from within a Tokio runtime");
    }

    let (listener, dialer) = medium::listen(config)?;

    let mut router = Router::new();
    install(&mut router);

    let shutdown = CancellationToken::new();
    Server::new(
        listener.clone(),
        router,
        shutdown.clone(),
        config.max_frame_length,
    )
    .spawn();

    let client = Client::new(dialer, config, CancellationToken::new());
    let teardown = Teardown {
        client: client.clone(),
        shutdown,
        listener,
    };

    if let Err(err) = client.connect().await {
        teardown.run();
        return Err(err);
    }

    tracing::debug!("in-memory transport ready");
    Ok((client, teardown))
}

/// Stops an in-memory transport.
pub struct Teardown {
    client: Client,
    shutdown: CancellationToken,
    listener: Listener,
}

impl Teardown {
    /// Closes the client, stops the server and closes the medium, in that
    /// order. Later calls do nothing.
    pub fn run(&self) {
        if !self.listener.begin_close() {
            return;
        }
        self.client.close();
        self.shutdown.cancel();
        self.listener.close();
        tracing::debug!("in-memory transport torn down");
    }

    pub fn state(&self) -> State {
        self.listener.state()
    }
}

impl std::fmt::Debug for Teardown {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Teardown")
            .field("state", &self.state())
            .finish()
    }
}
