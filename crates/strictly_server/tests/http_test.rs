//! HTTP routes served by the router.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use strictly_server::{ClientRequest, router};
use tower::ServiceExt;

async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health_reports_counts() {
    let gateway = common::gateway(30_000, 10);
    let alice = common::Client::named(&gateway, "alice").await;
    alice.send(&gateway, ClientRequest::JoinQueue).await;

    let (status, body) = get(router(gateway.clone()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["sessions"], 0);
    assert_eq!(json["waiting"], 1);
    assert_eq!(json["connected"], 1);
}

#[tokio::test]
async fn test_ws_requires_upgrade() {
    let gateway = common::gateway(30_000, 10);
    let (status, _) = get(router(gateway), "/ws").await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_unknown_route() {
    let gateway = common::gateway(30_000, 10);
    let (status, _) = get(router(gateway), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
