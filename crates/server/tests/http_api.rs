//! End-to-end HTTP tests against the assembled router.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use server::{ServerConfig, ServerState, TenantConfig};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

fn test_app(storage_root: &std::path::Path) -> Router {
    let mut config = ServerConfig {
        storage_root: storage_root.to_path_buf(),
        metrics_enabled: false,
        ..ServerConfig::default()
    };
    config.tenants.insert(
        "7".to_string(),
        TenantConfig {
            secret: SECRET.to_string(),
            enabled: true,
        },
    );
    server::build_router(Arc::new(ServerState::new(config).unwrap()))
}

fn pdf_body(event_id: &str) -> String {
    let mut bytes = b"%PDF-1.7\n".to_vec();
    bytes.resize(64, b'x');
    json!({
        "company_id": 7,
        "event_id": event_id,
        "file_base64": BASE64.encode(bytes),
        "file_name": "scan.pdf",
    })
    .to_string()
}

fn signed_request(body: &str, timestamp: i64, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/webhooks/ingest")
        .header("content-type", "application/json")
        .header("x-timestamp", timestamp.to_string())
        .header("x-signature", signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn signed_delivery_stores_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let body = pdf_body("evt-http-1");
    let now = chrono::Utc::now().timestamp();
    let sig = docgate::signature::sign(SECRET, now, body.as_bytes());

    let response = app.oneshot(signed_request(&body, now, &sig)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    let document_id = json["document_id"].as_str().unwrap();

    // The document landed under the tenant-scoped key on disk.
    let mut found = false;
    for entry in walk(dir.path()) {
        if entry.to_string_lossy().contains(document_id) {
            found = entry.file_name().unwrap() == "scan.pdf";
        }
    }
    assert!(found, "stored file not found under {:?}", dir.path());
}

#[tokio::test]
async fn duplicate_delivery_returns_the_original_document() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let body = pdf_body("evt-http-dup");
    let now = chrono::Utc::now().timestamp();
    let sig = docgate::signature::sign(SECRET, now, body.as_bytes());

    let first = app
        .clone()
        .oneshot(signed_request(&body, now, &sig))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first_json = json_body(first).await;

    let second = app.oneshot(signed_request(&body, now, &sig)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second_json = json_body(second).await;

    assert_eq!(second_json["status"], "duplicate");
    assert_eq!(second_json["document_id"], first_json["document_id"]);
}

#[tokio::test]
async fn tampered_signature_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let body = pdf_body("evt-http-bad-sig");
    let now = chrono::Utc::now().timestamp();

    let response = app
        .oneshot(signed_request(&body, now, &"0".repeat(64)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "AuthenticationFailed");
}

#[tokio::test]
async fn stale_timestamp_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let body = pdf_body("evt-http-stale");
    let old = chrono::Utc::now().timestamp() - 3600;
    let sig = docgate::signature::sign(SECRET, old, body.as_bytes());

    let response = app.oneshot(signed_request(&body, old, &sig)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "StaleRequest");
}

#[tokio::test]
async fn invalid_base64_is_a_structured_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let body = json!({
        "company_id": 7,
        "event_id": "evt-http-enc",
        "file_base64": "!!definitely-not-base64!!",
    })
    .to_string();
    let now = chrono::Utc::now().timestamp();
    let sig = docgate::signature::sign(SECRET, now, body.as_bytes());

    let response = app.oneshot(signed_request(&body, now, &sig)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "InvalidEncoding");
}

#[tokio::test]
async fn unknown_company_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let body = json!({
        "company_id": 404404,
        "event_id": "evt-http-unknown",
        "file_base64": BASE64.encode([0u8; 64]),
    })
    .to_string();
    let now = chrono::Utc::now().timestamp();
    let sig = docgate::signature::sign(SECRET, now, body.as_bytes());

    let response = app.oneshot(signed_request(&body, now, &sig)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "UnknownCompany");
}

#[tokio::test]
async fn event_id_header_wins_over_the_body() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let body = pdf_body("evt-body");
    let now = chrono::Utc::now().timestamp();
    let sig = docgate::signature::sign(SECRET, now, body.as_bytes());

    let mut request = signed_request(&body, now, &sig);
    request
        .headers_mut()
        .insert("x-event-id", "evt-header".parse().unwrap());
    let first = app.clone().oneshot(request).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // Same body without the header is a different logical event.
    let second = app.oneshot(signed_request(&body, now, &sig)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let json = json_body(second).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn health_endpoints_are_public() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    for uri in ["/", "/health", "/ready"] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri: {uri}");
    }
}

fn walk(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(walk(&path));
        } else {
            files.push(path);
        }
    }
    files
}
