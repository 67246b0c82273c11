//! Product-API request signing.
//!
//! `Authorization: <AccessKey>,<hex(HMAC-SHA1(SecretKey, METHOD\nPATH\nDATE\n))>`.
//! The path is signed without its query string.

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use http::{HeaderMap, Method};
use sha1::Sha1;
use speedycloud_core::{Credentials, RequestParams};

use crate::error::AuthError;
use crate::signer::{RequestSigner, format_http_date, signed_headers};

type HmacSha1 = Hmac<Sha1>;

/// Signer for the product-management API.
#[derive(Debug, Clone)]
pub struct ProductApiSigner {
    credentials: Credentials,
}

impl ProductApiSigner {
    /// Create a signer holding the given credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl RequestSigner for ProductApiSigner {
    fn sign_at(
        &self,
        method: &Method,
        path: &str,
        params: &RequestParams,
        date: DateTime<Utc>,
    ) -> Result<HeaderMap, AuthError> {
        let http_date = format_http_date(date);

        let mut mac = HmacSha1::new_from_slice(self.credentials.secret_key().as_bytes())
            .expect("HMAC can accept any key length");
        for part in [method.as_str(), path, http_date.as_str()] {
            mac.update(part.as_bytes());
            mac.update(b"\n");
        }
        let digest = hex::encode(mac.finalize().into_bytes());

        let authorization = format!("{},{digest}", self.credentials.access_key());
        signed_headers(&http_date, &authorization, params)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use http::header::{AUTHORIZATION, CONTENT_TYPE, DATE};

    use super::*;

    fn test_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_should_sign_known_get_vector() {
        let signer = ProductApiSigner::new(Credentials::new("AK", "SK"));
        let headers = signer
            .sign_at(
                &Method::GET,
                "/api/v1/products/cloud_servers/",
                &RequestParams::new(),
                test_instant(),
            )
            .unwrap();

        assert_eq!(headers[DATE], "Sat, 28 Feb 2026 12:00:00 GMT");
        assert_eq!(
            headers[AUTHORIZATION],
            "AK,4b167f7943544b94ca5909428d38e635ec6d1e16"
        );
    }

    #[test]
    fn test_should_sign_known_post_vector_with_form_content_type() {
        let signer = ProductApiSigner::new(Credentials::new("AK", "SK"));
        let params = RequestParams::new()
            .with_content_type("application/x-www-form-urlencoded")
            .with_field("cpu", "2");
        let headers = signer
            .sign_at(
                &Method::POST,
                "/api/v1/products/cloud_servers/provision",
                &params,
                test_instant(),
            )
            .unwrap();

        assert_eq!(
            headers[AUTHORIZATION],
            "AK,5b53d1dd97fa948493c3ddc3f82d11840955b61d"
        );
        assert_eq!(headers[CONTENT_TYPE], "application/x-www-form-urlencoded");
    }

    #[test]
    fn test_should_change_signature_when_any_input_changes() {
        let signer = ProductApiSigner::new(Credentials::new("AK", "SK"));
        let params = RequestParams::new();
        let sign = |method: &Method, path: &str, date: DateTime<Utc>| {
            signer.sign_at(method, path, &params, date).unwrap()[AUTHORIZATION].clone()
        };

        let base = sign(&Method::GET, "/a", test_instant());
        assert_eq!(base, sign(&Method::GET, "/a", test_instant()));
        assert_ne!(base, sign(&Method::DELETE, "/a", test_instant()));
        assert_ne!(base, sign(&Method::GET, "/b", test_instant()));
        assert_ne!(
            base,
            sign(&Method::GET, "/a", test_instant() + chrono::Duration::seconds(1))
        );
    }

    #[test]
    fn test_should_accept_secret_longer_than_hmac_block() {
        let long_secret = "k".repeat(200);
        let signer = ProductApiSigner::new(Credentials::new("AK", long_secret.as_str()));
        let headers = signer
            .sign_at(&Method::GET, "/a", &RequestParams::new(), test_instant())
            .unwrap();
        let other = ProductApiSigner::new(Credentials::new("AK", "k".repeat(199)))
            .sign_at(&Method::GET, "/a", &RequestParams::new(), test_instant())
            .unwrap();
        assert_ne!(headers[AUTHORIZATION], other[AUTHORIZATION]);
    }
}
