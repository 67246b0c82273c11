//! The signing capability shared by both API families.

use std::fmt;

use chrono::{DateTime, Utc};
use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use speedycloud_core::RequestParams;

use crate::error::AuthError;

/// Header carrying the canned ACL.
pub const X_AMZ_ACL: HeaderName = HeaderName::from_static("x-amz-acl");

/// Header carrying the base64 MD5 of the body.
pub const CONTENT_MD5: HeaderName = HeaderName::from_static("content-md5");

/// Computes the authentication headers for one request.
///
/// Implementations are pure: the output depends only on the arguments and the
/// held secret, and no I/O happens.
pub trait RequestSigner: Send + Sync + fmt::Debug {
    /// Sign a request as of `date`.
    ///
    /// Returns the header set `{Date, Authorization}` plus whichever of
    /// `x-amz-acl`, `Content-Length`, `Content-Type` and `Content-MD5` the
    /// parameters call for.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if a header value cannot be represented.
    fn sign_at(
        &self,
        method: &Method,
        path: &str,
        params: &RequestParams,
        date: DateTime<Utc>,
    ) -> Result<HeaderMap, AuthError>;

    /// Sign a request with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if a header value cannot be represented.
    fn sign(
        &self,
        method: &Method,
        path: &str,
        params: &RequestParams,
    ) -> Result<HeaderMap, AuthError> {
        self.sign_at(method, path, params, Utc::now())
    }
}

/// Format a timestamp as an RFC 1123 HTTP date (`Sat, 28 Feb 2026 12:00:00 GMT`).
#[must_use]
pub fn format_http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Assemble the header set common to both schemes.
pub(crate) fn signed_headers(
    http_date: &str,
    authorization: &str,
    params: &RequestParams,
) -> Result<HeaderMap, AuthError> {
    let mut headers = HeaderMap::with_capacity(6);
    headers.insert(DATE, header_value("Date", http_date)?);
    headers.insert(AUTHORIZATION, header_value("Authorization", authorization)?);

    if let Some(acl) = params.acl {
        headers.insert(X_AMZ_ACL, HeaderValue::from_static(acl.as_str()));
    }
    if let Some(length) = params.content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }
    if let Some(content_type) = params.content_type.as_deref() {
        headers.insert(CONTENT_TYPE, header_value("Content-Type", content_type)?);
    }
    if let Some(md5) = params.content_md5.as_deref() {
        headers.insert(CONTENT_MD5, header_value("Content-MD5", md5)?);
    }

    Ok(headers)
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(value).map_err(|source| AuthError::InvalidHeaderValue { name, source })
}
