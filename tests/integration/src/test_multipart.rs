//! Multipart uploads end to end.

use std::io::Write;

use bytes::Bytes;
use speedycloud_core::{Acl, ErrorKind, RequestParams, SpeedyCloudError};
use speedycloud_storage::{MAX_OBJECT_SIZE, MultipartCoordinator, ObjectStorageClient};

use crate::{MockServer, test_config, test_credentials, test_registry};

const PART: u64 = 1024;

fn coordinator(server: &MockServer) -> MultipartCoordinator {
    let config = test_config(server);
    let registry = test_registry(&config);
    let client = ObjectStorageClient::new(&registry, &config, test_credentials()).unwrap();
    MultipartCoordinator::new(client).with_part_size(PART)
}

fn payload(len: usize) -> Bytes {
    (0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>().into()
}

#[tokio::test]
async fn test_should_upload_in_parts_and_assemble_object() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server);
    let data = payload(2 * PART as usize + 100);

    let params = RequestParams::new()
        .with_acl(Acl::PublicRead)
        .with_content_type("application/octet-stream");
    let response = coordinator
        .upload("bucket", "big/object.bin", data.clone(), params)
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(server.object("bucket", "big/object.bin"), Some(data));
    assert_eq!(server.open_uploads(), 0);

    let seen = server.seen();
    let methods: Vec<_> = seen.iter().map(|r| r.method.as_str()).collect();
    assert_eq!(methods, ["POST", "PUT", "PUT", "PUT", "POST"]);
    assert!(seen[0].uri.ends_with("?uploads"));
    assert_eq!(seen[0].header("x-amz-acl"), Some("public-read"));
    assert!(seen[1].uri.contains("partNumber=1&uploadId=upload-1"));
    assert!(seen[3].uri.contains("partNumber=3&uploadId=upload-1"));
    assert_eq!(seen[4].header("x-amz-acl"), Some("public-read"));
}

#[tokio::test]
async fn test_should_finalize_parts_sent_out_of_order() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server);

    let mut session = coordinator
        .initiate("bucket", "reordered", RequestParams::new())
        .await
        .unwrap();
    for n in [3, 1, 2] {
        let data = Bytes::from(vec![b'0' + n as u8; 10]);
        let etag = coordinator.upload_part(&session, n, data).await.unwrap();
        session.record_part(n, etag);
    }
    coordinator.complete(session).await.unwrap();

    let object = server.object("bucket", "reordered").unwrap();
    assert_eq!(&object[..], b"111111111122222222223333333333");
}

#[tokio::test]
async fn test_should_upload_file() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server);
    let data = payload(PART as usize + 1);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&data).unwrap();
    file.flush().unwrap();

    coordinator
        .upload_file("bucket", "from-file", file.path(), RequestParams::new())
        .await
        .unwrap();

    assert_eq!(server.object("bucket", "from-file"), Some(data));
}

#[tokio::test]
async fn test_should_discard_parts_on_abort() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server);

    let session = coordinator
        .initiate("bucket", "broken", RequestParams::new())
        .await
        .unwrap();
    assert_eq!(server.open_uploads(), 1);

    coordinator.abort(session).await.unwrap();
    assert_eq!(server.open_uploads(), 0);
    assert_eq!(server.seen().last().unwrap().method, http::Method::DELETE);
}

#[tokio::test]
async fn test_should_report_server_error_details_on_unknown_upload() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server);

    let session = coordinator
        .initiate("bucket", "gone", RequestParams::new())
        .await
        .unwrap();
    // Abort a clone so the session the caller still holds is stale.
    coordinator.abort(session.clone()).await.unwrap();

    let err = coordinator
        .upload_part(&session, 1, Bytes::from_static(b"late"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProtocolFormat);
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("NoSuchUpload"));
}

#[tokio::test]
async fn test_should_reject_oversized_object_before_any_request() {
    let server = MockServer::start().await;
    let coordinator = coordinator(&server);

    let file = tempfile::NamedTempFile::new().unwrap();
    file.as_file().set_len(MAX_OBJECT_SIZE + 1).unwrap();

    let err = coordinator
        .upload_file("bucket", "huge", file.path(), RequestParams::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SpeedyCloudError::ResourceLimit { .. }));
    assert!(server.seen().is_empty());
    assert_eq!(server.accepted(), 0);
}
