use std::sync::Arc;

use draftly_engine::device::DeviceInfo;
use draftly_engine::residency::ResidencyManager;
use draftly_engine::service::GenerationService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Probed accelerator identity (reported by the health endpoint).
    pub device: DeviceInfo,
    /// Residency manager (health reporting; generation goes through the
    /// service, which shares this instance).
    pub residency: Arc<ResidencyManager>,
    /// Generation service.
    pub service: Arc<GenerationService>,
}
