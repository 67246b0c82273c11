//! A minimal in-process SpeedyCloud server.
//!
//! Object-storage paths (`/{bucket}/{key}`) implement plain PUT/GET/DELETE
//! and the multipart protocol, checking `Content-MD5` on parts and the exact
//! completion manifest. `/api/...` paths answer like the product API.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use md5::{Digest, Md5};
use parking_lot::Mutex;
use speedycloud_xml::{CompleteMultipartUpload, CompletedPart};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    /// Method.
    pub method: Method,
    /// Path and query.
    pub uri: String,
    /// Headers.
    pub headers: HeaderMap,
}

impl SeenRequest {
    /// Header value as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Default)]
struct State {
    objects: HashMap<String, Bytes>,
    uploads: HashMap<String, BTreeMap<u32, (String, Bytes)>>,
    next_upload: u64,
    seen: Vec<SeenRequest>,
    /// Upcoming requests to answer by dropping the connection.
    drop_next: usize,
}

/// The running server. Stops when dropped.
#[derive(Debug)]
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
    accepted: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl MockServer {
    /// Bind an ephemeral port and start serving.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let state = Arc::new(Mutex::new(State::default()));
        let accepted = Arc::new(AtomicUsize::new(0));

        let task = tokio::spawn(serve(listener, Arc::clone(&state), Arc::clone(&accepted)));
        Self {
            addr,
            state,
            accepted,
            task,
        }
    }

    /// `127.0.0.1:port`.
    #[must_use]
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// TCP connections accepted so far.
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Every request seen so far.
    #[must_use]
    pub fn seen(&self) -> Vec<SeenRequest> {
        self.state.lock().seen.clone()
    }

    /// Answer the next `count` requests by dropping their connection.
    pub fn drop_next(&self, count: usize) {
        self.state.lock().drop_next = count;
    }

    /// A stored object.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.state.lock().objects.get(&format!("/{bucket}/{key}")).cloned()
    }

    /// Number of multipart uploads neither completed nor aborted.
    #[must_use]
    pub fn open_uploads(&self) -> usize {
        self.state.lock().uploads.len()
    }
}

async fn serve(listener: TcpListener, state: Arc<Mutex<State>>, accepted: Arc<AtomicUsize>) {
    let http = HttpConnBuilder::new(TokioExecutor::new());
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            continue;
        };
        accepted.fetch_add(1, Ordering::SeqCst);

        let state = Arc::clone(&state);
        let svc = service_fn(move |req| handle(Arc::clone(&state), req));
        let conn = http.serve_connection(TokioIo::new(stream), svc).into_owned();
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "mock connection ended");
            }
        });
    }
}

#[derive(Debug)]
struct Dropped;

impl std::fmt::Display for Dropped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("connection dropped on purpose")
    }
}

impl std::error::Error for Dropped {}

async fn handle(
    state: Arc<Mutex<State>>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Dropped> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await.map_err(|_| Dropped)?.to_bytes();
    let uri = parts.uri.to_string();

    let mut state = state.lock();
    state.seen.push(SeenRequest {
        method: parts.method.clone(),
        uri: uri.clone(),
        headers: parts.headers.clone(),
    });
    if state.drop_next > 0 {
        state.drop_next -= 1;
        return Err(Dropped);
    }

    let path = parts.uri.path().to_owned();
    let query = parts.uri.query().unwrap_or("").to_owned();
    let response = if path.starts_with("/api/") {
        product(&parts.method, &path, &query, &body)
    } else {
        storage(&mut state, &parts.method, &parts.headers, &path, &query, body)
    };
    Ok(response)
}

fn product(method: &Method, path: &str, query: &str, body: &Bytes) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/api/v1/products/cloud_servers/") => {
            let fields: serde_json::Map<String, serde_json::Value> =
                form_urlencoded::parse(query.as_bytes())
                    .map(|(k, v)| (k.into_owned(), serde_json::Value::String(v.into_owned())))
                    .collect();
            json(StatusCode::OK, &serde_json::json!({ "servers": [], "query": fields }))
        }
        (&Method::POST, "/api/v1/products/cloud_servers/provision") => {
            let form: HashMap<String, String> = form_urlencoded::parse(body)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            if form.get("cpu").map(String::as_str) == Some("64") {
                json(StatusCode::FORBIDDEN, &serde_json::json!({ "error": "quota exceeded" }))
            } else {
                json(StatusCode::OK, &serde_json::json!({ "id": 1, "form": form }))
            }
        }
        _ => text(StatusCode::BAD_GATEWAY, "upstream unavailable"),
    }
}

fn storage(
    state: &mut State,
    method: &Method,
    headers: &HeaderMap,
    path: &str,
    query: &str,
    body: Bytes,
) -> Response<Full<Bytes>> {
    let params: HashMap<String, String> = form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let upload_id = params.get("uploadId").cloned();

    match (method, query, upload_id) {
        (&Method::POST, "uploads", _) => {
            state.next_upload += 1;
            let id = format!("upload-{}", state.next_upload);
            state.uploads.insert(id.clone(), BTreeMap::new());
            xml(
                StatusCode::OK,
                &format!(
                    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                     <InitiateMultipartUploadResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
                     <Key>{path}</Key><UploadId>{id}</UploadId></InitiateMultipartUploadResult>"
                ),
            )
        }
        (&Method::PUT, _, Some(id)) => {
            let digest = Md5::digest(&body);
            let sent_md5 = headers.get("content-md5").and_then(|v| v.to_str().ok());
            if sent_md5 != Some(BASE64.encode(digest.as_slice()).as_str()) {
                return error(StatusCode::BAD_REQUEST, "BadDigest");
            }
            let Some(parts) = state.uploads.get_mut(&id) else {
                return error(StatusCode::NOT_FOUND, "NoSuchUpload");
            };
            let Some(number) = params.get("partNumber").and_then(|n| n.parse().ok()) else {
                return error(StatusCode::BAD_REQUEST, "InvalidArgument");
            };
            let etag = format!("\"{}\"", hex::encode(digest.as_slice()));
            parts.insert(number, (etag.clone(), body));
            let mut response = text(StatusCode::OK, "");
            if let Ok(value) = http::HeaderValue::from_str(&etag) {
                response.headers_mut().insert(http::header::ETAG, value);
            }
            response
        }
        (&Method::POST, _, Some(id)) => {
            let Some(parts) = state.uploads.get(&id) else {
                return error(StatusCode::NOT_FOUND, "NoSuchUpload");
            };
            let expected = CompleteMultipartUpload {
                parts: parts
                    .iter()
                    .map(|(&part_number, (etag, _))| CompletedPart {
                        part_number,
                        etag: etag.clone(),
                    })
                    .collect(),
            };
            if expected.to_xml().ok().as_deref() != Some(&body[..]) {
                return error(StatusCode::BAD_REQUEST, "InvalidPart");
            }
            let object: Vec<u8> = parts.values().flat_map(|(_, data)| data.to_vec()).collect();
            state.uploads.remove(&id);
            state.objects.insert(path.to_owned(), Bytes::from(object));
            xml(StatusCode::OK, "<CompleteMultipartUploadResult/>")
        }
        (&Method::DELETE, _, Some(id)) => {
            state.uploads.remove(&id);
            text(StatusCode::NO_CONTENT, "")
        }
        (&Method::PUT, "", None) => {
            state.objects.insert(path.to_owned(), body);
            text(StatusCode::OK, "")
        }
        (&Method::GET, "", None) => match state.objects.get(path) {
            Some(data) => Response::new(Full::new(data.clone())),
            None => error(StatusCode::NOT_FOUND, "NoSuchKey"),
        },
        _ => error(StatusCode::NOT_IMPLEMENTED, "NotImplemented"),
    }
}

fn text(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::copy_from_slice(body.as_bytes())));
    *response.status_mut() = status;
    response
}

fn xml(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    let mut response = text(status, body);
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/xml"),
    );
    response
}

fn json(status: StatusCode, value: &serde_json::Value) -> Response<Full<Bytes>> {
    let mut response = text(status, &value.to_string());
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

fn error(status: StatusCode, code: &str) -> Response<Full<Bytes>> {
    xml(
        status,
        &format!("<Error><Code>{code}</Code><Message>{code}</Message></Error>"),
    )
}
