//! PlatformClient against a mocked Daytona API

use daytona_client::{PlatformClient, ProviderConfig};
use daytona_common::{ApiError, CreateSnapshot, SnapshotApi, SnapshotState};
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

fn client_for(server: &Server) -> PlatformClient {
    let config = ProviderConfig {
        token: "test-token".to_string(),
        organization_id: "org-123".to_string(),
        api_url: format!("{}/api", server.url()),
        poll_interval: Duration::from_millis(10),
        operation_timeout: Duration::from_secs(5),
        http_timeout: Duration::from_secs(5),
    };
    PlatformClient::new(&config).unwrap()
}

fn snapshot_body(state: &str) -> String {
    json!({
        "id": "snap-123",
        "name": "test-snap",
        "state": state,
        "cpu": 2,
        "gpu": 0,
        "mem": 4,
        "disk": 10,
        "createdAt": "2025-03-04T05:06:07.123Z",
        "organizationId": "org-123",
        "imageName": "registry.example/proj/myapp:20250304050600",
        "size": 2048.0,
        "errorReason": null
    })
    .to_string()
}

#[tokio::test]
async fn get_snapshot_sends_auth_headers() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/snapshots/test-snap")
        .match_header("authorization", "Bearer test-token")
        .match_header("x-daytona-organization-id", "org-123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(snapshot_body("active"))
        .create_async()
        .await;

    let client = client_for(&server);
    let snapshot = client.get_snapshot("test-snap").await.unwrap();

    assert_eq!(snapshot.id, "snap-123");
    assert_eq!(snapshot.state, SnapshotState::Active);
    assert_eq!(snapshot.mem, 4);
    assert_eq!(snapshot.size, Some(2048.0));
    mock.assert_async().await;
}

#[tokio::test]
async fn missing_snapshot_maps_to_not_found() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/snapshots/snap-404")
        .with_status(404)
        .with_body(r#"{"message":"Snapshot not found"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.get_snapshot("snap-404").await.unwrap_err();

    assert!(err.is_not_found(), "unexpected error: {err}");
    mock.assert_async().await;
}

#[tokio::test]
async fn server_errors_keep_status_and_body() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("DELETE", "/api/snapshots/snap-123")
        .with_status(500)
        .with_body("internal failure")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.remove_snapshot("snap-123").await.unwrap_err();

    match err {
        ApiError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "internal failure");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn create_snapshot_posts_profile() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/snapshots")
        .match_body(Matcher::Json(json!({
            "name": "test-snap",
            "imageName": "registry.example/proj/myapp:20250304050600",
            "cpu": 2,
            "memory": 4,
            "disk": 10
        })))
        .with_status(200)
        .with_body(snapshot_body("pending"))
        .create_async()
        .await;

    let client = client_for(&server);
    let mut request = CreateSnapshot::new("test-snap");
    request.image_name = Some("registry.example/proj/myapp:20250304050600".to_string());
    request.cpu = Some(2);
    request.memory = Some(4);
    request.disk = Some(10);

    let created = client.create_snapshot(request).await.unwrap();
    assert_eq!(created.state, SnapshotState::Pending);
    mock.assert_async().await;
}

#[tokio::test]
async fn push_access_is_decoded() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/docker-registry/registry-push-access")
        .with_status(200)
        .with_body(
            json!({
                "username": "robot$push",
                "secret": "s3cr3t",
                "registryUrl": "registry.example",
                "registryId": "reg-1",
                "project": "proj",
                "expiresAt": "2025-03-04T06:06:07Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let access = client.get_transient_push_access().await.unwrap();

    assert_eq!(access.registry_url, "registry.example");
    assert_eq!(access.project, "proj");
    assert_eq!(access.secret, "s3cr3t");
    mock.assert_async().await;
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/snapshots/snap-123")
        .with_status(200)
        .with_body("{not json")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.get_snapshot("snap-123").await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}
