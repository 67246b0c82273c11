//! Error types for request signing.

/// Errors that can occur while producing signed request headers.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A computed header value contains bytes that are not allowed in HTTP headers.
    #[error("invalid header value for {name}: {source}")]
    InvalidHeaderValue {
        /// Header being built.
        name: &'static str,
        /// Underlying `http` error.
        #[source]
        source: http::header::InvalidHeaderValue,
    },
}
