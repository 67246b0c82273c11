//! Common type definitions shared by the signer, transport, and clients.

use std::fmt;
use std::str::FromStr;

use crate::error::SpeedyCloudError;

/// Protocol scheme a connection speaks to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain-text HTTP/1.1.
    Http,
    /// HTTP/1.1 over TLS.
    Https,
}

impl Protocol {
    /// The scheme name as it appears in a URL.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Port used when the host does not name one.
    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl FromStr for Protocol {
    type Err = SpeedyCloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            _ => Err(SpeedyCloudError::UnsupportedProtocol(s.to_owned())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `(host, protocol)` pair a connection pool is keyed by.
///
/// `host` may carry an explicit port (`"localhost:9000"`, `"[::1]:8080"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Endpoint {
    host: String,
    protocol: Protocol,
}

impl Endpoint {
    /// Create an endpoint from an already-validated protocol.
    #[must_use]
    pub fn new(host: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            host: host.into(),
            protocol,
        }
    }

    /// Create an endpoint from a protocol scheme string.
    ///
    /// # Errors
    ///
    /// Returns [`SpeedyCloudError::UnsupportedProtocol`] for anything other
    /// than `http` or `https`, and [`SpeedyCloudError::Config`] for an empty host.
    pub fn parse(host: &str, protocol: &str) -> Result<Self, SpeedyCloudError> {
        let protocol = protocol.parse::<Protocol>()?;
        if host.trim().is_empty() {
            return Err(SpeedyCloudError::Config("endpoint host is empty".to_owned()));
        }
        Ok(Self::new(host.trim(), protocol))
    }

    /// Host as configured, including any explicit port. Used for the `Host` header.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The protocol scheme.
    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Host name without port or IPv6 brackets, suitable for DNS and TLS SNI.
    #[must_use]
    pub fn host_name(&self) -> &str {
        let name = match self.split_port() {
            Some((name, _)) => name,
            None => self.host.as_str(),
        };
        name.trim_start_matches('[').trim_end_matches(']')
    }

    /// Explicit port, or the protocol default.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.split_port()
            .map_or_else(|| self.protocol.default_port(), |(_, port)| port)
    }

    fn split_port(&self) -> Option<(&str, u16)> {
        let (name, port) = self.host.rsplit_once(':')?;
        // A bare IPv6 literal has colons but no port.
        if name.contains(':') && !name.ends_with(']') {
            return None;
        }
        port.parse::<u16>().ok().map(|port| (name, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.protocol, self.host)
    }
}

/// Access key pair, immutable for the lifetime of a client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    /// Create a credential pair.
    #[must_use]
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// The public access key.
    #[must_use]
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// The secret signing key.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Canned access-control setting sent as `x-amz-acl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    /// Owner has full control, nobody else has access.
    Private,
    /// Owner has full control, everyone may read.
    PublicRead,
    /// Owner has full control, everyone may read and write.
    PublicReadWrite,
    /// Owner has full control, authenticated users may read.
    AuthenticatedRead,
}

impl Acl {
    /// The wire value of this ACL.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
            Self::PublicReadWrite => "public-read-write",
            Self::AuthenticatedRead => "authenticated-read",
        }
    }
}

impl FromStr for Acl {
    type Err = SpeedyCloudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public-read" => Ok(Self::PublicRead),
            "public-read-write" => Ok(Self::PublicReadWrite),
            "authenticated-read" => Ok(Self::AuthenticatedRead),
            other => Err(SpeedyCloudError::InvalidInput(format!(
                "unknown ACL: {other}"
            ))),
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request parameters.
///
/// For the object-storage API these are header hints that also feed the
/// canonical string; for the product API `form` holds the query/body fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    /// Canned ACL, sent as `x-amz-acl` and signed.
    pub acl: Option<Acl>,
    /// `Content-Type` of the request body.
    pub content_type: Option<String>,
    /// Base64 MD5 of the request body.
    pub content_md5: Option<String>,
    /// Size of the request body in bytes.
    pub content_length: Option<u64>,
    /// Form fields, in insertion order.
    pub form: Vec<(String, String)>,
}

impl RequestParams {
    /// Empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the canned ACL.
    #[must_use]
    pub fn with_acl(mut self, acl: Acl) -> Self {
        self.acl = Some(acl);
        self
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the base64 content MD5.
    #[must_use]
    pub fn with_content_md5(mut self, content_md5: impl Into<String>) -> Self {
        self.content_md5 = Some(content_md5.into());
        self
    }

    /// Set the content length.
    #[must_use]
    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = Some(content_length);
        self
    }

    /// Append a form field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }
}
