//! Raw HTTP responses and product-API result decoding.

use bytes::Bytes;
use http::header::ETAG;
use http::{HeaderMap, Response, StatusCode};
use serde::de::DeserializeOwned;
use speedycloud_core::{SpeedyCloudError, SpeedyCloudResult};

/// A fully read response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl From<Response<Bytes>> for RawResponse {
    fn from(response: Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }
}

impl RawResponse {
    /// Look up a header case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every header as `(name, value)` strings, in wire order.
    /// Values that are not valid UTF-8 are replaced lossily.
    #[must_use]
    pub fn header_list(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }

    /// The non-empty `ETag` header, if any.
    #[must_use]
    pub fn etag(&self) -> Option<&str> {
        self.headers
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .filter(|etag| !etag.is_empty())
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode a product-API result.
    ///
    /// A `200` body is parsed as JSON. Any other status becomes an
    /// application error carrying the body's `error` field, or the raw body
    /// text when it is not JSON or has no such field.
    ///
    /// # Errors
    ///
    /// [`SpeedyCloudError::Application`] for a non-200 status, and
    /// [`SpeedyCloudError::ProtocolFormat`] for a `200` body that does not
    /// decode as `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> SpeedyCloudResult<T> {
        if self.status != StatusCode::OK {
            return Err(SpeedyCloudError::Application {
                status: self.status.as_u16(),
                message: application_message(&self.body),
            });
        }

        serde_json::from_slice(&self.body).map_err(|e| SpeedyCloudError::ProtocolFormat {
            status: self.status.as_u16(),
            message: format!("response body is not the expected JSON: {e}"),
        })
    }
}

fn application_message(body: &[u8]) -> String {
    let error_field = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|json| match json.get("error")? {
            serde_json::Value::String(message) => Some(message.clone()),
            other => Some(other.to_string()),
        });
    error_field.unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}
