//! One logical request: sign, send, and retry on a fresh connection.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, HOST, HeaderValue};
use http::{Method, Request, Response};
use speedycloud_auth::RequestSigner;
use speedycloud_core::{Endpoint, SpeedyCloudError, SpeedyCloudResult, TransportError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::pool::{ConnectionPool, PooledConnection};
use crate::request::ApiRequest;
use crate::response::RawResponse;
use crate::retry::RetryPolicy;

/// Executes requests against one endpoint's pool.
///
/// Any response that parses as HTTP, whatever its status, ends the request.
/// Transport failures poison the connection that saw them; the next attempt
/// acquires another one and signs the request again, so each attempt carries
/// a current `Date`.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    pool: Arc<ConnectionPool>,
    signer: Arc<dyn RequestSigner>,
    policy: RetryPolicy,
    request_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl RequestExecutor {
    /// Create an executor with no per-attempt deadline and its own
    /// cancellation token.
    #[must_use]
    pub fn new(pool: Arc<ConnectionPool>, signer: Arc<dyn RequestSigner>, policy: RetryPolicy) -> Self {
        Self {
            pool,
            signer,
            policy,
            request_timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Bound each attempt, from send to full body, by `timeout`.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Abort in-flight requests and backoff pauses when `token` fires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The endpoint requests go to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        self.pool.endpoint()
    }

    /// The pool connections come from.
    #[must_use]
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// The token that cancels this executor's requests.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Execute `request`, retrying transport failures per the policy.
    ///
    /// # Errors
    ///
    /// - [`SpeedyCloudError::Transport`] once every attempt has failed below HTTP.
    /// - [`SpeedyCloudError::Cancelled`] when the cancellation token fires.
    /// - [`SpeedyCloudError::PoolShutdown`] when the pool was closed.
    /// - [`SpeedyCloudError::InvalidInput`] when the request cannot be encoded.
    pub async fn execute(&self, request: &ApiRequest) -> SpeedyCloudResult<RawResponse> {
        let max_attempts = self.policy.max_attempts();
        let mut connection = self.pool.acquire()?;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let http_request = self.build_request(request)?;

            debug!(
                endpoint = %self.pool.endpoint(),
                method = %request.method,
                path = %request.path,
                attempt,
                connection = connection.id(),
                "sending request"
            );

            let outcome = tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                outcome = self.send_once(&mut connection, http_request) => Some(outcome),
            };
            let Some(outcome) = outcome else {
                // The exchange may have been cut mid-flight.
                connection.poison();
                return Err(SpeedyCloudError::Cancelled);
            };

            let error = match outcome {
                Ok(response) => {
                    debug!(
                        method = %request.method,
                        path = %request.path,
                        status = response.status().as_u16(),
                        attempt,
                        "received response"
                    );
                    return Ok(RawResponse::from(response));
                }
                Err(error) => error,
            };

            warn!(
                endpoint = %self.pool.endpoint(),
                method = %request.method,
                path = %request.path,
                attempt,
                max_attempts,
                error = %error,
                "request attempt failed, discarding connection"
            );
            connection.poison();

            if attempt >= max_attempts {
                return Err(SpeedyCloudError::Transport {
                    attempts: attempt,
                    source: error,
                });
            }

            if let Some(delay) = self.policy.backoff_after(attempt, &error) {
                debug!(attempt, delay_ms = delay.as_millis(), "backing off before retry");
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => return Err(SpeedyCloudError::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
            }

            connection = self.pool.acquire()?;
        }
    }

    async fn send_once(
        &self,
        connection: &mut PooledConnection,
        request: Request<Bytes>,
    ) -> Result<Response<Bytes>, TransportError> {
        match self.request_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connection.send(request))
                .await
                .unwrap_or(Err(TransportError::Timeout(timeout))),
            None => connection.send(request).await,
        }
    }

    /// Sign `request` as of now and assemble the wire request.
    fn build_request(&self, request: &ApiRequest) -> SpeedyCloudResult<Request<Bytes>> {
        let signed = self
            .signer
            .sign(&request.method, &request.path, &request.params)
            .map_err(|e| SpeedyCloudError::InvalidInput(e.to_string()))?;

        let target = request.target();
        let body = request.body.clone().unwrap_or_default();
        let mut http_request = Request::builder()
            .method(request.method.clone())
            .uri(target.as_str())
            .body(body)
            .map_err(|e| {
                SpeedyCloudError::InvalidInput(format!("invalid request target {target:?}: {e}"))
            })?;

        let host = HeaderValue::from_str(self.pool.endpoint().host())
            .map_err(|e| SpeedyCloudError::Config(format!("invalid host header: {e}")))?;

        let body_len = http_request.body().len();
        let headers = http_request.headers_mut();
        headers.insert(HOST, host);
        headers.extend(signed);
        if !headers.contains_key(CONTENT_LENGTH)
            && (body_len > 0 || matches!(request.method, Method::POST | Method::PUT))
        {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body_len));
        }

        Ok(http_request)
    }
}
