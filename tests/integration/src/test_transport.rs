//! Pooling and retry behavior over real sockets.

use bytes::Bytes;
use speedycloud_core::{ErrorKind, RequestParams, SpeedyCloudError};
use speedycloud_storage::ObjectStorageClient;

use crate::{MockServer, test_config, test_credentials, test_registry};

async fn seeded_client(server: &MockServer) -> (speedycloud_http::PoolRegistry, ObjectStorageClient) {
    let config = test_config(server);
    let registry = test_registry(&config);
    let client = ObjectStorageClient::new(&registry, &config, test_credentials()).unwrap();
    client
        .put("/bucket/seed", Some(Bytes::from_static(b"seed")), RequestParams::new())
        .await
        .unwrap();
    (registry, client)
}

#[tokio::test]
async fn test_should_reuse_one_socket_for_sequential_requests() {
    let server = MockServer::start().await;
    let (_registry, client) = seeded_client(&server).await;

    for _ in 0..3 {
        let response = client.get("/bucket/seed", RequestParams::new()).await.unwrap();
        assert_eq!(response.body, Bytes::from_static(b"seed"));
    }

    assert_eq!(server.accepted(), 1);
    assert_eq!(client.executor().pool().stats().size, 2);
}

#[tokio::test]
async fn test_should_retry_on_fresh_socket_after_dropped_connection() {
    let server = MockServer::start().await;
    let (_registry, client) = seeded_client(&server).await;

    server.drop_next(2);
    let response = client.get("/bucket/seed", RequestParams::new()).await.unwrap();

    assert_eq!(response.body, Bytes::from_static(b"seed"));
    // The seed socket takes the first drop; two fresh sockets follow.
    assert_eq!(server.accepted(), 3);
    let stats = client.executor().pool().stats();
    assert_eq!(stats.size, 2);
    assert_eq!(stats.in_use, 0);
}

#[tokio::test]
async fn test_should_grow_under_load_and_shrink_back() {
    let server = MockServer::start().await;
    let (_registry, client) = seeded_client(&server).await;

    let requests = (0..4).map(|_| client.get("/bucket/seed", RequestParams::new()));
    let results = futures::future::join_all(requests).await;

    for result in results {
        assert_eq!(result.unwrap().body, Bytes::from_static(b"seed"));
    }
    assert_eq!(server.accepted(), 4);
    let stats = client.executor().pool().stats();
    assert_eq!(stats.size, 2);
    assert_eq!(stats.idle, 2);
}

#[tokio::test]
async fn test_should_surface_transport_error_after_five_refused_attempts() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host = listener.local_addr().unwrap().to_string();
    drop(listener);

    let server = MockServer::start().await;
    let mut config = test_config(&server);
    config.object_storage_host = host;
    let registry = test_registry(&config);
    let client = ObjectStorageClient::new(&registry, &config, test_credentials()).unwrap();

    let err = client.get("/bucket/key", RequestParams::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(matches!(err, SpeedyCloudError::Transport { attempts: 5, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_should_refuse_requests_after_registry_shutdown() {
    let server = MockServer::start().await;
    let config = test_config(&server);
    let (registry, client) = seeded_client(&server).await;

    registry.shutdown();

    let err = client.get("/bucket/seed", RequestParams::new()).await.unwrap_err();
    assert!(matches!(err, SpeedyCloudError::PoolShutdown(_)));
    assert!(client.executor().pool().is_closed());

    let err = ObjectStorageClient::new(&registry, &config, test_credentials()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_should_share_one_pool_per_endpoint() {
    let server = MockServer::start().await;
    let config = test_config(&server);
    let registry = test_registry(&config);

    let first = ObjectStorageClient::new(&registry, &config, test_credentials()).unwrap();
    let second = ObjectStorageClient::new(&registry, &config, test_credentials()).unwrap();

    assert!(std::sync::Arc::ptr_eq(
        first.executor().pool(),
        second.executor().pool()
    ));
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_should_sign_with_object_storage_scheme() {
    let server = MockServer::start().await;
    let (_registry, _client) = seeded_client(&server).await;

    let seen = server.seen();
    let put = seen.last().unwrap();
    assert_eq!(put.method, http::Method::PUT);
    assert!(put.header("authorization").unwrap().starts_with("AWS test-ak:"));
    assert!(put.header("date").unwrap().ends_with(" GMT"));
    assert_eq!(put.header("content-length"), Some("4"));
    assert_eq!(put.header("host"), Some(server.host().as_str()));
}
