//! Pooled, signed, retrying HTTP transport for the SpeedyCloud APIs.
//!
//! Request flow:
//!
//! ```text
//! caller -> RequestExecutor::execute(ApiRequest)
//!        -> ConnectionPool::acquire()            (bookkeeping under the pool lock)
//!        -> RequestSigner::sign()                (fresh Date + Authorization per attempt)
//!        -> TransportConnection::send()          (network I/O, outside the lock)
//!        -> RawResponse
//!        -> PooledConnection dropped => ConnectionPool::release()
//! ```
//!
//! # Modules
//!
//! - [`transport`] - `Connector`/`Connection` seams and the lazily-connected [`TransportConnection`]
//! - [`connector`] - hyper HTTP/1.1 connector, plain or over rustls
//! - [`tls`] - cached native root certificates and client TLS configuration
//! - [`pool`] - per-endpoint [`ConnectionPool`] with a floor and a release-time shrink pass
//! - [`registry`] - [`PoolRegistry`], the explicitly owned map of pools with a shutdown path
//! - [`retry`] - the bounded [`RetryPolicy`]
//! - [`request`] / [`response`] - [`ApiRequest`] and [`RawResponse`]
//! - [`executor`] - [`RequestExecutor`], one logical request with retry and reconnect

pub mod connector;
pub mod executor;
pub mod pool;
pub mod registry;
pub mod request;
pub mod response;
pub mod retry;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod tls;
pub mod transport;

pub use connector::HttpConnector;
pub use executor::RequestExecutor;
pub use pool::{ConnectionPool, PoolStats, PooledConnection};
pub use registry::PoolRegistry;
pub use request::ApiRequest;
pub use response::RawResponse;
pub use retry::RetryPolicy;
pub use transport::{Connection, Connector, TransportConnection};
