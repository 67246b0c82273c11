//! Core types, configuration, and error taxonomy for the SpeedyCloud SDK.
//!
//! This crate holds everything the transport layers share without doing any
//! I/O: the `(host, protocol)` endpoint key used by the connection pools,
//! immutable [`Credentials`], the typed per-request [`RequestParams`], the
//! client-wide [`ClientConfig`], and the [`SpeedyCloudError`] taxonomy that
//! lets callers decide whether a retry is meaningful.

mod config;
mod error;
mod types;

pub use config::ClientConfig;
pub use error::{BoxError, ErrorKind, SpeedyCloudError, SpeedyCloudResult, TransportError};
pub use types::{Acl, Credentials, Endpoint, Protocol, RequestParams};
