use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Execution device: `"cuda"` or `"cpu"`.
    pub device: &'static str,
    /// Whether a CUDA accelerator was found at startup.
    pub cuda_available: bool,
    /// GPU marketing name, when known.
    pub gpu: Option<String>,
    /// Total device memory, e.g. `"4.0 GB"`, when known.
    pub vram: Option<String>,
    /// Whether the image pipeline has ever been constructed.
    pub image_model_loaded: bool,
    /// Whether the video pipeline has ever been constructed.
    pub video_model_loaded: bool,
    /// Which pipeline currently holds accelerator residency.
    pub active_pipe: Option<&'static str>,
}

/// GET /health -- device availability and pipeline residency.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let residency = state.residency.snapshot().await;

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        device: state.device.label(),
        cuda_available: state.device.is_cuda(),
        gpu: state.device.name.clone(),
        vram: state
            .device
            .total_memory_bytes
            .map(|bytes| format!("{:.1} GB", bytes as f64 / f64::from(1 << 30))),
        image_model_loaded: residency.image_constructed,
        video_model_loaded: residency.video_constructed,
        active_pipe: residency.active.map(|kind| kind.label()),
    })
}

/// Mount health check routes (root-level, NOT under `/api`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
