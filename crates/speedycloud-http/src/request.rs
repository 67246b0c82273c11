//! The description of one logical request.

use bytes::Bytes;
use http::Method;
use speedycloud_core::RequestParams;

/// A request before signing.
///
/// `path` is what gets signed. `query`, when present, is appended to the
/// request target after signing; object-storage sub-resources such as
/// `?uploads` belong in `path` instead, because that scheme signs them.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Signed request path.
    pub path: String,
    /// Unsigned query string, without the leading `?`.
    pub query: Option<String>,
    /// Signing and header hints.
    pub params: RequestParams,
    /// Request body.
    pub body: Option<Bytes>,
}

impl ApiRequest {
    /// A bodiless request with no hints.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            params: RequestParams::new(),
            body: None,
        }
    }

    /// Set the unsigned query string. An empty query is ignored.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.is_empty()).then_some(query);
        self
    }

    /// Set the signing and header hints.
    #[must_use]
    pub fn with_params(mut self, params: RequestParams) -> Self {
        self.params = params;
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The request target as sent on the wire.
    #[must_use]
    pub fn target(&self) -> String {
        match &self.query {
            Some(query) if self.path.contains('?') => format!("{}&{query}", self.path),
            Some(query) => format!("{}?{query}", self.path),
            None => self.path.clone(),
        }
    }
}
