//! Error taxonomy for the SpeedyCloud SDK.
//!
//! Every public operation returns [`SpeedyCloudResult`]. Callers branch on
//! [`SpeedyCloudError::kind`] to decide whether a retry makes sense: only
//! [`ErrorKind::Transport`] failures are worth retrying, and the executor has
//! already spent its own retry budget before surfacing one.

use std::time::Duration;

/// Boxed error used as the source of transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failure below the HTTP semantics layer, observed on a single attempt.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer sent something that is not valid HTTP, or the message was cut short.
    #[error("HTTP framing error: {0}")]
    Framing(#[source] BoxError),

    /// The connection could not be opened, was reset, or was closed.
    #[error("connection error: {0}")]
    Connection(#[source] BoxError),

    /// The attempt did not finish within its deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// Whether this is a lower-level socket condition (reset, refused, timeout)
    /// rather than an HTTP framing failure.
    #[must_use]
    pub fn is_connection_level(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// Coarse classification of a [`SpeedyCloudError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid client setup, e.g. an unsupported protocol scheme.
    Configuration,
    /// Socket or framing failure that outlived the retry budget.
    Transport,
    /// An expected field (upload id, ETag) was absent from a response.
    ProtocolFormat,
    /// The product API answered with a non-200 status.
    Application,
    /// The object exceeds the multipart size ceiling.
    ResourceLimit,
    /// The operation's cancellation token fired.
    Cancelled,
    /// The caller passed arguments the operation cannot act on.
    InvalidInput,
    /// Local I/O (reading the file being uploaded) failed.
    Io,
}

/// Top-level error type for the SpeedyCloud SDK.
#[derive(Debug, thiserror::Error)]
pub enum SpeedyCloudError {
    /// Unsupported protocol scheme.
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    /// Other configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The connection pool registry has been shut down.
    #[error("connection pool for {0} has been shut down")]
    PoolShutdown(String),

    /// Transport failure after the retry budget was spent.
    #[error("transport failure after {attempts} attempt(s): {source}")]
    Transport {
        /// Number of attempts made.
        attempts: u32,
        /// The last observed transport error.
        #[source]
        source: TransportError,
    },

    /// A structured response lacked a field the protocol requires.
    #[error("malformed response (HTTP {status}): {message}")]
    ProtocolFormat {
        /// HTTP status of the offending response.
        status: u16,
        /// What was missing, plus any server error code/message.
        message: String,
    },

    /// Product API returned a non-200 status.
    #[error("API error (HTTP {status}): {message}")]
    Application {
        /// HTTP status code.
        status: u16,
        /// Server `error` field, or the raw body when it is not JSON.
        message: String,
    },

    /// Object too large for a multipart upload.
    #[error("object size {size} bytes exceeds the {limit} byte limit")]
    ResourceLimit {
        /// Reported object size.
        size: u64,
        /// Maximum accepted size.
        limit: u64,
    },

    /// Operation cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Caller misuse.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Local I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpeedyCloudError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedProtocol(_) | Self::Config(_) | Self::PoolShutdown(_) => {
                ErrorKind::Configuration
            }
            Self::Transport { .. } => ErrorKind::Transport,
            Self::ProtocolFormat { .. } => ErrorKind::ProtocolFormat,
            Self::Application { .. } => ErrorKind::Application,
            Self::ResourceLimit { .. } => ErrorKind::ResourceLimit,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the caller may reasonably retry the whole operation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// HTTP status attached to this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ProtocolFormat { status, .. } | Self::Application { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Convenience result type for SpeedyCloud operations.
pub type SpeedyCloudResult<T> = Result<T, SpeedyCloudError>;
