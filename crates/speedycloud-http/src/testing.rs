//! In-memory connector for tests.
//!
//! [`ScriptedConnector`] answers requests from a queue of [`Step`]s, or from a
//! handler closure, and records every request it sees together with the id of
//! the socket that carried it.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use parking_lot::Mutex;
use speedycloud_core::{Endpoint, TransportError};

use crate::transport::{Connection, Connector};

/// One scripted outcome.
#[derive(Debug, Clone)]
pub enum Step {
    /// Answer with a full response.
    Reply {
        /// Status code.
        status: u16,
        /// Response headers.
        headers: Vec<(String, String)>,
        /// Response body.
        body: Bytes,
    },
    /// Fail with a connection-level error.
    Reset(String),
    /// Fail with an HTTP framing error.
    Framing(String),
    /// Never answer.
    Hang,
}

impl Step {
    /// A `200 OK` with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::status(200, body)
    }

    /// A response with the given status and body.
    pub fn status(status: u16, body: impl Into<Bytes>) -> Self {
        Self::Reply {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// A connection reset.
    pub fn reset(reason: impl Into<String>) -> Self {
        Self::Reset(reason.into())
    }

    /// A malformed response.
    pub fn framing(reason: impl Into<String>) -> Self {
        Self::Framing(reason.into())
    }

    /// Add a response header. No effect on failure steps.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let Self::Reply { headers, .. } = &mut self {
            headers.push((name.to_owned(), value.to_owned()));
        }
        self
    }
}

/// A request as it reached the connector.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Id of the socket that carried it, in connect order starting at 1.
    pub socket: usize,
    /// Request method.
    pub method: Method,
    /// Request target (path and query).
    pub uri: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
}

impl RecordedRequest {
    /// A header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

type Handler = dyn Fn(&RecordedRequest) -> Step + Send + Sync;

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    handler: Option<Arc<Handler>>,
    requests: Vec<RecordedRequest>,
    connects: usize,
}

/// A [`Connector`] whose sockets replay a script.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    script: Arc<Mutex<Script>>,
}

impl fmt::Debug for ScriptedConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let script = self.script.lock();
        f.debug_struct("ScriptedConnector")
            .field("pending_steps", &script.steps.len())
            .field("requests", &script.requests.len())
            .field("connects", &script.connects)
            .finish_non_exhaustive()
    }
}

impl ScriptedConnector {
    /// A connector with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector answering every request with `handler`, once queued steps run out.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Step + Send + Sync + 'static,
    {
        let connector = Self::new();
        connector.script.lock().handler = Some(Arc::new(handler));
        connector
    }

    /// Queue an outcome.
    pub fn push(&self, step: Step) {
        self.script.lock().steps.push_back(step);
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.script.lock().requests.clone()
    }

    /// Number of sockets opened so far.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.script.lock().connects
    }

    fn next_step(&self, request: RecordedRequest) -> Step {
        let (queued, handler) = {
            let mut script = self.script.lock();
            (script.steps.pop_front(), script.handler.clone())
        };
        let step = queued
            .or_else(|| handler.map(|handler| handler(&request)))
            .unwrap_or_else(|| Step::reset("script exhausted"));
        self.script.lock().requests.push(request);
        step
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _endpoint: &Endpoint) -> Result<Box<dyn Connection>, TransportError> {
        let socket = {
            let mut script = self.script.lock();
            script.connects += 1;
            script.connects
        };
        Ok(Box::new(ScriptedConnection {
            socket,
            connector: self.clone(),
        }))
    }
}

#[derive(Debug)]
struct ScriptedConnection {
    socket: usize,
    connector: ScriptedConnector,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn send(&mut self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let (parts, body) = request.into_parts();
        let recorded = RecordedRequest {
            socket: self.socket,
            method: parts.method,
            uri: parts.uri.to_string(),
            headers: parts.headers,
            body,
        };

        match self.connector.next_step(recorded) {
            Step::Reply {
                status,
                headers,
                body,
            } => {
                let mut response = Response::new(body);
                *response.status_mut() =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                for (name, value) in headers {
                    if let (Ok(name), Ok(value)) = (
                        HeaderName::from_bytes(name.as_bytes()),
                        HeaderValue::from_str(&value),
                    ) {
                        response.headers_mut().append(name, value);
                    }
                }
                Ok(response)
            }
            Step::Reset(reason) => Err(TransportError::Connection(reason.into())),
            Step::Framing(reason) => Err(TransportError::Framing(reason.into())),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(TransportError::Connection("scripted hang ended".into()))
            }
        }
    }
}
