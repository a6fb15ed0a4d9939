//! In-memory listener and dialer.
//!
//! Each dial creates a [`tokio::io::duplex`] pair; the server half is queued
//! on a bounded channel until the listener accepts it.

use crate::{
    config::DuplexConfig,
    context::CallContext,
    error::{Error, Result},
};
use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};
use tokio::io::DuplexStream;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum State {
    Created = 0,
    Serving = 1,
    Closing = 2,
    Closed = 3,
}

impl State {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Serving,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Created | Self::Serving)
    }
}

struct Shared {
    tx: async_channel::Sender<DuplexStream>,
    rx: async_channel::Receiver<DuplexStream>,
    state: AtomicU8,
    buffer_size: usize,
}

impl Shared {
    fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(
        &self,
        from: State,
        to: State,
    ) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Binds a fresh medium. Nothing outside the returned pair can reach it.
pub fn listen(config: &DuplexConfig) -> Result<(Listener, Dialer)> {
    config.validate().map_err(|err| {
        Error::Bind {
            reason: err.to_string(),
        }
    })?;

    let (tx, rx) = async_channel::bounded(config.backlog);
    let shared = Arc::new(Shared {
        tx,
        rx,
        state: AtomicU8::new(State::Created as u8),
        buffer_size: config.buffer_size,
    });

    tracing::trace!(
        buffer_size = config.buffer_size,
        backlog = config.backlog,
        "bound in-memory listener"
    );

    Ok((
        Listener {
            shared: shared.clone(),
        },
        Dialer { shared },
    ))
}

#[derive(Clone)]
pub struct Listener {
    shared: Arc<Shared>,
}

impl Listener {
    pub fn state(&self) -> State {
        self.shared.state()
    }

    pub async fn accept(&self) -> Result<DuplexStream> {
        if !self.state().is_open() {
            return Err(Error::Closed);
        }
        self.mark_serving();

        let stream = self
            .shared
            .rx
            .recv()
            .await
            .map_err(|_| Error::Closed)?;

        if !self.state().is_open() {
            return Err(Error::Closed);
        }
        Ok(stream)
    }

    pub(crate) fn mark_serving(&self) {
        self.shared
            .transition(State::Created, State::Serving);
    }

    /// Stops taking new connections. Returns `false` if shutdown had already begun.
    pub fn begin_close(&self) -> bool {
        self.shared
            .transition(State::Created, State::Closing)
            || self
                .shared
                .transition(State::Serving, State::Closing)
    }

    /// Closes the medium and drops every connection still waiting in the backlog.
    pub fn close(&self) {
        self.begin_close();
        if self
            .shared
            .state
            .swap(State::Closed as u8, Ordering::AcqRel)
            == State::Closed as u8
        {
            return;
        }

        self.shared.tx.close();
        let mut drained = 0usize;
        while self.shared.rx.try_recv().is_ok() {
            drained += 1;
        }
        tracing::debug!(drained, "in-memory listener closed");
    }

    pub fn dialer(&self) -> Dialer {
        Dialer {
            shared: self.shared.clone(),
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("state", &self.state())
            .field("queued", &self.shared.rx.len())
            .finish()
    }
}

#[derive(Clone)]
pub struct Dialer {
    shared: Arc<Shared>,
}

impl Dialer {
    /// Opens a connection, waiting while the backlog is full.
    pub async fn dial(&self) -> Result<DuplexStream> {
        if !self.shared.state().is_open() {
            return Err(Error::Closed);
        }

        let (client, server) = tokio::io::duplex(self.shared.buffer_size);
        self.shared
            .tx
            .send(server)
            .await
            .map_err(|_| Error::Closed)?;
        Ok(client)
    }

    pub async fn dial_with(
        &self,
        ctx: &CallContext,
    ) -> Result<DuplexStream> {
        ctx.run(self.dial()).await
    }

    pub fn state(&self) -> State {
        self.shared.state()
    }
}

impl std::fmt::Debug for Dialer {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Dialer")
            .field("state", &self.state())
            .finish()
    }
}
