//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get, post_json};
use serde_json::json;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path()).await;
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;

    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["device"], "cpu");
    assert_eq!(json["cuda_available"], false);
    // Nothing has been generated: no pipeline constructed, none resident.
    assert_eq!(json["image_model_loaded"], false);
    assert_eq!(json["video_model_loaded"], false);
    assert!(json["active_pipe"].is_null());
}

// ---------------------------------------------------------------------------
// Test: health reflects residency after a generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_resident_pipeline_after_generation() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path()).await;

    let response = post_json(
        app.clone(),
        "/api/generate-image",
        json!({ "prompt": "a red cube", "width": 64, "height": 64 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let health = body_json(get(app, "/health").await).await;
    assert_eq!(health["image_model_loaded"], true);
    assert_eq!(health["video_model_loaded"], false);
    assert_eq!(health["active_pipe"], "image");
}

// ---------------------------------------------------------------------------
// Test: CUDA device details are reported
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_gpu_identity() {
    let dir = tempfile::tempdir().unwrap();
    let device =
        draftly_engine::device::DeviceInfo::cuda("NVIDIA GeForce GTX 1050 Ti", 4 * 1024 * 1024 * 1024);
    let app = common::build_test_app_with_device(dir.path(), device).await;

    let json = body_json(get(app, "/health").await).await;
    assert_eq!(json["device"], "cuda");
    assert_eq!(json["cuda_available"], true);
    assert_eq!(json["gpu"], "NVIDIA GeForce GTX 1050 Ti");
    assert_eq!(json["vram"], "4.0 GB");
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path()).await;
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path()).await;
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );

    // The value should be a valid UUID (36 chars with hyphens).
    let id_str = request_id.unwrap().to_str().unwrap();
    assert_eq!(id_str.len(), 36, "x-request-id should be a UUID string");
}

// ---------------------------------------------------------------------------
// Test: CORS preflight OPTIONS request returns correct headers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_preflight_returns_correct_headers() {
    let dir = tempfile::tempdir().unwrap();
    let app = common::build_test_app(dir.path()).await;

    // CORS preflight requires custom headers, so we build the request manually.
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/generate-image")
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    // CORS preflight should return 200.
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();

    // Access-Control-Allow-Origin must match the request origin.
    let allow_origin = headers
        .get("access-control-allow-origin")
        .expect("Missing Access-Control-Allow-Origin header")
        .to_str()
        .unwrap();
    assert_eq!(allow_origin, "http://localhost:3000");

    // Access-Control-Allow-Methods must include POST.
    let allow_methods = headers
        .get("access-control-allow-methods")
        .expect("Missing Access-Control-Allow-Methods header")
        .to_str()
        .unwrap();
    assert!(
        allow_methods.contains("POST"),
        "Allow-Methods should contain POST, got: {allow_methods}"
    );
}
