pub mod health;

use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// ```text
/// POST /generate-image    text-to-image
/// POST /generate-video    text-to-clip (optional init image)
/// POST /upload-image      stage an init image (multipart)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/generate-image", post(handlers::generate::generate_image))
        .route("/generate-video", post(handlers::generate::generate_video))
        .route("/upload-image", post(handlers::upload::upload_image))
}
