//! Product API requests against the mock server.

use serde_json::Value;
use speedycloud_core::{ErrorKind, RequestParams, SpeedyCloudError};
use speedycloud_product::ProductApiClient;

use crate::{MockServer, test_config, test_credentials, test_registry};

const SERVERS: &str = "/api/v1/products/cloud_servers/";
const PROVISION: &str = "/api/v1/products/cloud_servers/provision";

fn client(server: &MockServer) -> ProductApiClient {
    let config = test_config(server);
    let registry = test_registry(&config);
    ProductApiClient::new(&registry, &config, test_credentials()).unwrap()
}

#[tokio::test]
async fn test_should_send_get_fields_as_unsigned_query() {
    let server = MockServer::start().await;
    let client = client(&server);

    let params = RequestParams::new().with_field("region", "cn-north");
    let body: Value = client.get(SERVERS, &params).await.unwrap();

    assert_eq!(body["query"]["region"], "cn-north");
    let seen = server.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].uri, format!("{SERVERS}?region=cn-north"));
    let authorization = seen[0].header("authorization").unwrap();
    assert!(authorization.starts_with("test-ak,"));
    assert_eq!(authorization.len(), "test-ak,".len() + 40);
}

#[tokio::test]
async fn test_should_send_post_fields_as_form_body() {
    let server = MockServer::start().await;
    let client = client(&server);

    let params = RequestParams::new().with_field("cpu", "2").with_field("memory", "4096");
    let body: Value = client.post(PROVISION, &params).await.unwrap();

    assert_eq!(body["id"], 1);
    assert_eq!(body["form"]["cpu"], "2");
    assert_eq!(body["form"]["memory"], "4096");
    let seen = server.seen();
    assert_eq!(
        seen[0].header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(seen[0].uri, PROVISION);
}

#[tokio::test]
async fn test_should_surface_error_field_without_retrying() {
    let server = MockServer::start().await;
    let client = client(&server);

    let params = RequestParams::new().with_field("cpu", "64");
    let err = client.post::<Value>(PROVISION, &params).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Application);
    match err {
        SpeedyCloudError::Application { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "quota exceeded");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(server.seen().len(), 1);
}

#[tokio::test]
async fn test_should_use_raw_body_when_error_is_not_json() {
    let server = MockServer::start().await;
    let client = client(&server);

    let err = client
        .get::<Value>("/api/v1/unknown", &RequestParams::new())
        .await
        .unwrap_err();

    match err {
        SpeedyCloudError::Application { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "upstream unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
}
