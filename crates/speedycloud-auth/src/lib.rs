//! Request signing for the SpeedyCloud APIs.
//!
//! Two schemes share the [`RequestSigner`] capability so the executor never
//! needs to know which API family it is talking to:
//!
//! - [`ObjectStorageSigner`]: `Authorization: AWS <access_key>:<base64 HMAC-SHA1>`
//!   over a newline-joined canonical string (method, Content-MD5, Content-Type,
//!   date, optional `x-amz-acl` line, resource path).
//! - [`ProductApiSigner`]: `Authorization: <access_key>,<hex HMAC-SHA1>` over
//!   `METHOD\nPATH\nDATE\n`.
//!
//! Both compute the date once per call and send exactly the date they signed.
//!
//! # Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use http::Method;
//! use speedycloud_auth::{ObjectStorageSigner, RequestSigner};
//! use speedycloud_core::{Credentials, RequestParams};
//!
//! let signer = ObjectStorageSigner::new(Credentials::new("AK", "SK"));
//! let at = Utc.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).unwrap();
//! let headers = signer
//!     .sign_at(&Method::GET, "/bucket/", &RequestParams::new(), at)
//!     .unwrap();
//! assert_eq!(headers["date"], "Sat, 28 Feb 2026 12:00:00 GMT");
//! assert!(headers["authorization"].to_str().unwrap().starts_with("AWS AK:"));
//! ```

pub mod error;
pub mod object_storage;
pub mod product;
pub mod signer;

pub use error::AuthError;
pub use object_storage::ObjectStorageSigner;
pub use product::ProductApiSigner;
pub use signer::{RequestSigner, format_http_date};
