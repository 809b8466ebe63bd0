use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use draftly_api::config::ServerConfig;
use draftly_api::routes;
use draftly_api::state::AppState;
use draftly_engine::artifacts::ArtifactStore;
use draftly_engine::device::DeviceInfo;
use draftly_engine::procedural::ProceduralFactory;
use draftly_engine::residency::ResidencyManager;
use draftly_engine::service::GenerationService;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(output_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        output_dir: output_dir.to_string_lossy().into_owned(),
        public_base_url: "http://localhost:8000".to_string(),
        device_memory_budget_mib: None,
    }
}

/// Build the full application router on the CPU device.
pub async fn build_test_app(output_dir: &Path) -> Router {
    build_test_app_with_device(output_dir, DeviceInfo::cpu()).await
}

/// Build the full application router with all middleware layers, using the
/// given device.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery, static artifact serving) that production uses.
pub async fn build_test_app_with_device(output_dir: &Path, device: DeviceInfo) -> Router {
    let config = test_config(output_dir);

    let residency = Arc::new(ResidencyManager::new(Box::new(ProceduralFactory::new(
        device.clone(),
    ))));
    let store = ArtifactStore::open(output_dir, &config.public_base_url)
        .await
        .expect("output dir");
    let service = Arc::new(GenerationService::new(Arc::clone(&residency), store));

    let state = AppState {
        config: Arc::new(config.clone()),
        device,
        residency,
        service,
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:3000".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api", routes::api_routes())
        .nest_service("/outputs", ServeDir::new(&config.output_dir))
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

/// Issue a GET request against the app.
#[allow(dead_code)]
pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Issue a POST request with a JSON body against the app.
#[allow(dead_code)]
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
