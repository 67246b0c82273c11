//! Integration tests for the SpeedyCloud SDK.
//!
//! Each test starts a [`MockServer`] on an ephemeral localhost port and
//! drives it through the real hyper transport, so pooling, retries and
//! signing are exercised over actual sockets.
//!
//! ```text
//! cargo test -p speedycloud-integration
//! ```

mod server;

use std::sync::Once;

use speedycloud_core::{ClientConfig, Credentials};
use speedycloud_http::PoolRegistry;

pub use server::{MockServer, SeenRequest};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Client configuration pointing both API families at `server`.
#[must_use]
pub fn test_config(server: &MockServer) -> ClientConfig {
    init_tracing();
    ClientConfig::builder()
        .object_storage_host(server.host())
        .product_api_host(server.host())
        .pool_size(2)
        .retry_backoff_ms(10)
        .connect_timeout_ms(2_000)
        .request_timeout_ms(5_000)
        .build()
}

/// A registry using the real hyper connector.
#[must_use]
pub fn test_registry(config: &ClientConfig) -> PoolRegistry {
    PoolRegistry::from_config(config).expect("plain http registry")
}

/// Credentials the mock server accepts.
#[must_use]
pub fn test_credentials() -> Credentials {
    Credentials::new("test-ak", "test-sk")
}

#[cfg(test)]
mod test_multipart;
#[cfg(test)]
mod test_product;
#[cfg(test)]
mod test_transport;
