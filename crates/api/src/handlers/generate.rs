//! Handlers for the two generation endpoints.
//!
//! Routes:
//! - `POST /api/generate-image` — text-to-image
//! - `POST /api/generate-video` — text-to-clip (optionally image-to-clip)
//!
//! Out-of-range parameters are clamped by the generation service, never
//! rejected; the echoed `seed` makes every result reproducible.

use axum::extract::State;
use axum::Json;
use draftly_core::params::{
    ClipParams, ImageParams, DEFAULT_FRAME_RATE, DEFAULT_GUIDANCE_SCALE, DEFAULT_IMAGE_STEPS,
    MAX_CLIP_FRAMES,
};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::state::AppState;

fn default_dimension() -> u32 {
    512
}

fn default_num_images() -> u32 {
    1
}

fn default_guidance_scale() -> f32 {
    DEFAULT_GUIDANCE_SCALE
}

fn default_steps() -> u32 {
    DEFAULT_IMAGE_STEPS
}

fn default_num_frames() -> u32 {
    MAX_CLIP_FRAMES
}

fn default_frame_rate() -> f32 {
    DEFAULT_FRAME_RATE
}

fn default_seed() -> i64 {
    -1
}

// ---------------------------------------------------------------------------
// Image generation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GenerateImageRequest {
    pub prompt: String,
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
    #[serde(default = "default_num_images")]
    pub num_images: u32,
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f32,
    #[serde(default = "default_steps")]
    pub num_inference_steps: u32,
    #[serde(default = "default_seed")]
    pub seed: i64,
}

#[derive(Debug, Serialize)]
pub struct GenerateImageResponse {
    pub images: Vec<String>,
    pub seed: u32,
    pub elapsed: f64,
}

/// POST /api/generate-image
pub async fn generate_image(
    State(state): State<AppState>,
    Json(input): Json<GenerateImageRequest>,
) -> AppResult<Json<GenerateImageResponse>> {
    let outcome = state
        .service
        .synthesize_image(ImageParams {
            prompt: input.prompt,
            width: input.width,
            height: input.height,
            num_images: input.num_images,
            guidance_scale: input.guidance_scale,
            num_inference_steps: input.num_inference_steps,
            seed: input.seed,
        })
        .await?;

    Ok(Json(GenerateImageResponse {
        images: outcome.images,
        seed: outcome.seed,
        elapsed: outcome.elapsed,
    }))
}

// ---------------------------------------------------------------------------
// Clip generation
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GenerateVideoRequest {
    pub prompt: String,
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
    #[serde(default = "default_num_frames")]
    pub num_frames: u32,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    #[serde(default = "default_seed")]
    pub seed: i64,
    /// Optional path of a previously uploaded init image.
    #[serde(default)]
    pub image_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateVideoResponse {
    pub video_url: String,
    pub gif_url: String,
    pub seed: u32,
    pub elapsed: f64,
    pub frames: u32,
}

/// POST /api/generate-video
pub async fn generate_video(
    State(state): State<AppState>,
    Json(input): Json<GenerateVideoRequest>,
) -> AppResult<Json<GenerateVideoResponse>> {
    let outcome = state
        .service
        .synthesize_clip(ClipParams {
            prompt: input.prompt,
            width: input.width,
            height: input.height,
            num_frames: input.num_frames,
            frame_rate: input.frame_rate,
            seed: input.seed,
            init_image: input.image_path.map(Into::into),
        })
        .await?;

    Ok(Json(GenerateVideoResponse {
        video_url: outcome.video_url,
        gif_url: outcome.gif_url,
        seed: outcome.seed,
        elapsed: outcome.elapsed,
        frames: outcome.frames,
    }))
}
