//! SpeedyCloud product-management API.
//!
//! [`ProductApiClient`] sends the four verbs signed with the product-API
//! scheme and decodes JSON results. Endpoint wrappers (cloud servers, CDN,
//! load balancers, ...) are thin callers of these verbs.

pub mod client;

pub use client::{ProductApiClient, product_request};
