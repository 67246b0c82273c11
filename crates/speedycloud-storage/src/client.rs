//! The object-storage client and its four verbs.

use std::sync::Arc;

use bytes::Bytes;
use http::Method;
use speedycloud_auth::ObjectStorageSigner;
use speedycloud_core::{ClientConfig, Credentials, RequestParams, SpeedyCloudResult};
use speedycloud_http::{ApiRequest, PoolRegistry, RawResponse, RequestExecutor, RetryPolicy};

/// Signed access to the object-storage API.
///
/// Every verb returns the raw response: status, full header list, and body.
/// Non-2xx statuses are returned as responses, not errors; the caller reads
/// the status.
#[derive(Debug, Clone)]
pub struct ObjectStorageClient {
    executor: RequestExecutor,
}

impl ObjectStorageClient {
    /// Create a client for the configured object-storage host, sharing the
    /// registry's pool for that endpoint.
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
        let pool = registry.pool(&config.object_storage_endpoint()?)?;
        let executor = RequestExecutor::new(
            pool,
            Arc::new(ObjectStorageSigner::new(credentials)),
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

    /// Abort this client's in-flight requests and refuse to wait on backoff.
    pub fn cancel(&self) {
        self.executor.cancellation_token().cancel();
    }

    /// `GET path`.
    pub async fn get(&self, path: &str, params: RequestParams) -> SpeedyCloudResult<RawResponse> {
        self.execute(&ApiRequest::new(Method::GET, path).with_params(params))
            .await
    }

    /// `PUT path`, with an optional body.
    pub async fn put(
        &self,
        path: &str,
        body: Option<Bytes>,
        params: RequestParams,
    ) -> SpeedyCloudResult<RawResponse> {
        self.execute(&write_request(Method::PUT, path, body, params))
            .await
    }

    /// `POST path`, with an optional body.
    pub async fn post(
        &self,
        path: &str,
        body: Option<Bytes>,
        params: RequestParams,
    ) -> SpeedyCloudResult<RawResponse> {
        self.execute(&write_request(Method::POST, path, body, params))
            .await
    }

    /// `DELETE path`.
    pub async fn delete(&self, path: &str, params: RequestParams) -> SpeedyCloudResult<RawResponse> {
        self.execute(&ApiRequest::new(Method::DELETE, path).with_params(params))
            .await
    }

    /// Execute a prepared request.
    pub async fn execute(&self, request: &ApiRequest) -> SpeedyCloudResult<RawResponse> {
        self.executor.execute(request).await
    }
}

/// A write request whose `Content-Length` hint matches its body.
fn write_request(
    method: Method,
    path: &str,
    body: Option<Bytes>,
    mut params: RequestParams,
) -> ApiRequest {
    let length = body.as_ref().map_or(0, Bytes::len) as u64;
    params.content_length.get_or_insert(length);

    let request = ApiRequest::new(method, path).with_params(params);
    match body {
        Some(body) => request.with_body(body),
        None => request,
    }
}
