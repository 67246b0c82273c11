//! The product-API client.

use std::sync::Arc;

use http::Method;
use serde::de::DeserializeOwned;
use speedycloud_auth::ProductApiSigner;
use speedycloud_core::{ClientConfig, Credentials, RequestParams, SpeedyCloudResult};
use speedycloud_http::{ApiRequest, PoolRegistry, RequestExecutor, RetryPolicy};
use tracing::debug;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Signed access to the product-management API.
///
/// A `200` response is decoded as JSON into the caller's type (use
/// [`serde_json::Value`] for untyped access). Any other status is an
/// application error carrying the server's `error` message and is never
/// retried.
#[derive(Debug, Clone)]
pub struct ProductApiClient {
    executor: RequestExecutor,
}

impl ProductApiClient {
    /// Create a client for the configured product-API host.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error for an unsupported protocol or a
    /// registry that has been shut down.
    pub fn new(
        registry: &PoolRegistry,
        config: &ClientConfig,
        credentials: Credentials,
    ) -> SpeedyCloudResult<Self> {
        let pool = registry.pool(&config.product_api_endpoint()?)?;
        let executor = RequestExecutor::new(
            pool,
            Arc::new(ProductApiSigner::new(credentials)),
            RetryPolicy::from_config(config),
        )
        .with_request_timeout(config.request_timeout());
        Ok(Self { executor })
    }

    /// Wrap an already configured executor.
    #[must_use]
    pub fn from_executor(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    /// The underlying executor.
    #[must_use]
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Abort this client's in-flight requests.
    pub fn cancel(&self) {
        self.executor.cancellation_token().cancel();
    }

    /// `GET path?fields`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &RequestParams,
    ) -> SpeedyCloudResult<T> {
        self.request(Method::GET, path, params).await
    }

    /// `POST path` with `fields` as a form body.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &RequestParams,
    ) -> SpeedyCloudResult<T> {
        self.request(Method::POST, path, params).await
    }

    /// `PUT path` with `fields` as a form body.
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &RequestParams,
    ) -> SpeedyCloudResult<T> {
        self.request(Method::PUT, path, params).await
    }

    /// `DELETE path` with `fields` as a form body.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &RequestParams,
    ) -> SpeedyCloudResult<T> {
        self.request(Method::DELETE, path, params).await
    }

    /// Send one request and decode its result.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &RequestParams,
    ) -> SpeedyCloudResult<T> {
        let request = product_request(method, path, params);
        let response = self.executor.execute(&request).await?;
        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status.as_u16(),
            "product API response"
        );
        response.into_json()
    }
}

/// Shape a product-API request.
///
/// `GET` carries the form fields as a query string appended after signing,
/// so the signed path never includes it. Other methods send them as an
/// url-encoded form body.
#[must_use]
pub fn product_request(method: Method, path: &str, params: &RequestParams) -> ApiRequest {
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.form.iter())
        .finish();

    if method == Method::GET {
        return ApiRequest::new(method, path).with_query(encoded);
    }

    let body_params = RequestParams::new()
        .with_content_type(FORM_CONTENT_TYPE)
        .with_content_length(encoded.len() as u64);
    ApiRequest::new(method, path)
        .with_params(body_params)
        .with_body(encoded)
}
