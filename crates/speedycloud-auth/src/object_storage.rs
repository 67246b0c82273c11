//! Object-storage request signing (HMAC-SHA1, `AWS` authorization scheme).
//!
//! The `Authorization` header has the format:
//!
//! ```text
//! AWS <AccessKey>:<Signature>
//! ```
//!
//! Where `Signature = Base64(HMAC-SHA1(SecretKey, StringToSign))` and:
//!
//! ```text
//! StringToSign = HTTP-Verb + "\n" +
//!                Content-MD5 + "\n" +
//!                Content-Type + "\n" +
//!                Date + "\n" +
//!                [ "x-amz-acl:" + Acl + "\n" ] +
//!                ResourcePath
//! ```
//!
//! The resource path is signed exactly as sent, including sub-resource
//! queries such as `?uploads` or `?partNumber=1&uploadId=...`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use http::{HeaderMap, Method};
use sha1::Sha1;
use speedycloud_core::{Credentials, RequestParams};
use tracing::trace;

use crate::error::AuthError;
use crate::signer::{RequestSigner, format_http_date, signed_headers};

type HmacSha1 = Hmac<Sha1>;

/// Signer for the object-storage API.
#[derive(Debug, Clone)]
pub struct ObjectStorageSigner {
    credentials: Credentials,
}

impl ObjectStorageSigner {
    /// Create a signer holding the given credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl RequestSigner for ObjectStorageSigner {
    fn sign_at(
        &self,
        method: &Method,
        path: &str,
        params: &RequestParams,
        date: DateTime<Utc>,
    ) -> Result<HeaderMap, AuthError> {
        let http_date = format_http_date(date);
        let string_to_sign = build_string_to_sign(method, path, params, &http_date);

        trace!(string_to_sign = ?string_to_sign, "built object-storage string to sign");

        let signature = compute_signature(self.credentials.secret_key(), &string_to_sign);
        let authorization = format!("AWS {}:{signature}", self.credentials.access_key());

        signed_headers(&http_date, &authorization, params)
    }
}

/// Build the canonical string. The ACL line appears only when an ACL is set.
fn build_string_to_sign(
    method: &Method,
    path: &str,
    params: &RequestParams,
    http_date: &str,
) -> String {
    let content_md5 = params.content_md5.as_deref().unwrap_or("");
    let content_type = params.content_type.as_deref().unwrap_or("");

    let acl_line = params.acl.map(|acl| format!("x-amz-acl:{}", acl.as_str()));

    let mut lines = vec![method.as_str(), content_md5, content_type, http_date];
    if let Some(line) = acl_line.as_deref() {
        lines.push(line);
    }
    lines.push(path);

    lines.join("\n")
}

/// Base64(HMAC-SHA1(secret, string_to_sign)).
fn compute_signature(secret_key: &str, string_to_sign: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret_key.as_bytes()).expect("HMAC can accept any key length");
    mac.update(string_to_sign.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}
