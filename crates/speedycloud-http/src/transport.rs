//! Connection seams.
//!
//! A [`Connector`] opens sockets; a [`Connection`] exchanges one request and
//! response at a time over an open socket. [`TransportConnection`] is the
//! handle the pool tracks: it holds no socket until its first send.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use speedycloud_core::{Endpoint, Protocol, TransportError};
use tracing::debug;

/// Opens connections to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    /// Open a new connection.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, TransportError>;

    /// Whether this connector can reach endpoints using `protocol`.
    fn supports(&self, protocol: Protocol) -> bool {
        let _ = protocol;
        true
    }
}

/// An open connection carrying one exchange at a time.
#[async_trait]
pub trait Connection: Send + fmt::Debug {
    /// Send a request and read the whole response body.
    async fn send(&mut self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError>;
}

/// A pool-tracked handle that connects lazily on first use.
///
/// After a failed send the underlying socket is dropped; the handle itself is
/// then discarded by the pool, so a failed socket is never reused.
#[derive(Debug)]
pub struct TransportConnection {
    id: u64,
    endpoint: Endpoint,
    connector: Arc<dyn Connector>,
    inner: Option<Box<dyn Connection>>,
}

impl TransportConnection {
    pub(crate) fn new(id: u64, endpoint: Endpoint, connector: Arc<dyn Connector>) -> Self {
        Self {
            id,
            endpoint,
            connector,
            inner: None,
        }
    }

    /// Pool-unique identifier of this handle.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The endpoint this handle talks to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether a socket is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.is_some()
    }

    /// Send one request, opening the socket first if needed.
    pub async fn send(&mut self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let mut connection = match self.inner.take() {
            Some(connection) => connection,
            None => {
                debug!(endpoint = %self.endpoint, connection = self.id, "opening connection");
                self.connector.connect(&self.endpoint).await?
            }
        };

        let response = connection.send(request).await?;
        self.inner = Some(connection);
        Ok(response)
    }

    /// Drop the socket, if any.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            debug!(endpoint = %self.endpoint, connection = self.id, "closed connection");
        }
    }
}
