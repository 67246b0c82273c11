//! HTTP/1.1 connector built on hyper's client connection API.
//!
//! Each [`Connection`] owns one socket and one `SendRequest` handle; the
//! hyper connection driver runs on its own task and ends when the handle is
//! dropped.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use speedycloud_core::{Endpoint, Protocol, SpeedyCloudError, SpeedyCloudResult, TransportError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::transport::{Connection, Connector};

/// Opens plain TCP or TLS connections and speaks HTTP/1.1 over them.
#[derive(Clone)]
pub struct HttpConnector {
    tls: Option<TlsConnector>,
    connect_timeout: Duration,
}

impl fmt::Debug for HttpConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnector")
            .field("tls", &self.tls.is_some())
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl HttpConnector {
    /// A connector for `http` endpoints only.
    #[must_use]
    pub fn plain(connect_timeout: Duration) -> Self {
        Self {
            tls: None,
            connect_timeout,
        }
    }

    /// A connector for `http` and `https` endpoints, trusting the OS roots.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no usable root certificate exists.
    pub fn with_native_roots(connect_timeout: Duration) -> SpeedyCloudResult<Self> {
        let tls = crate::tls::native_roots_connector().map_err(SpeedyCloudError::Config)?;
        Ok(Self {
            tls: Some(tls),
            connect_timeout,
        })
    }

    /// A connector for `protocol`: TLS-capable only when it is required.
    ///
    /// # Errors
    ///
    /// See [`HttpConnector::with_native_roots`].
    pub fn for_protocol(protocol: Protocol, connect_timeout: Duration) -> SpeedyCloudResult<Self> {
        match protocol {
            Protocol::Http => Ok(Self::plain(connect_timeout)),
            Protocol::Https => Self::with_native_roots(connect_timeout),
        }
    }

    async fn open_tcp(&self, endpoint: &Endpoint) -> Result<TcpStream, TransportError> {
        let stream = tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect((endpoint.host_name(), endpoint.port())),
        )
        .await
        .map_err(|_| TransportError::Timeout(self.connect_timeout))?
        .map_err(|e| TransportError::Connection(Box::new(e)))?;

        stream
            .set_nodelay(true)
            .map_err(|e| TransportError::Connection(Box::new(e)))?;
        Ok(stream)
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>, TransportError> {
        let tcp = self.open_tcp(endpoint).await?;

        match endpoint.protocol() {
            Protocol::Http => handshake(tcp).await,
            Protocol::Https => {
                let tls = self.tls.as_ref().ok_or_else(|| {
                    TransportError::Connection("connector has no TLS configuration".into())
                })?;
                let server_name = ServerName::try_from(endpoint.host_name().to_owned())
                    .map_err(|e| TransportError::Connection(Box::new(e)))?;
                let stream = tokio::time::timeout(self.connect_timeout, tls.connect(server_name, tcp))
                    .await
                    .map_err(|_| TransportError::Timeout(self.connect_timeout))?
                    .map_err(|e| TransportError::Connection(Box::new(e)))?;
                handshake(stream).await
            }
        }
    }

    fn supports(&self, protocol: Protocol) -> bool {
        protocol == Protocol::Http || self.tls.is_some()
    }
}

async fn handshake<S>(stream: S) -> Result<Box<dyn Connection>, TransportError>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (sender, driver) = http1::handshake(TokioIo::new(stream))
        .await
        .map_err(classify)?;

    tokio::spawn(async move {
        if let Err(e) = driver.await {
            debug!(error = %e, "connection driver finished with error");
        }
    });

    Ok(Box::new(HyperConnection { sender }))
}

#[derive(Debug)]
struct HyperConnection {
    sender: SendRequest<Full<Bytes>>,
}

#[async_trait]
impl Connection for HyperConnection {
    async fn send(&mut self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        self.sender.ready().await.map_err(classify)?;

        let response = self
            .sender
            .send_request(request.map(Full::new))
            .await
            .map_err(classify)?;

        let (parts, body) = response.into_parts();
        let body = body.collect().await.map_err(classify)?.to_bytes();
        Ok(Response::from_parts(parts, body))
    }
}

/// Framing failures are malformed or truncated messages; everything else is
/// the socket going away.
fn classify(err: hyper::Error) -> TransportError {
    if err.is_parse() || err.is_incomplete_message() || err.is_user() {
        TransportError::Framing(Box::new(err))
    } else {
        TransportError::Connection(Box::new(err))
    }
}
