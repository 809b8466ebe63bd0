//! Generation service.
//!
//! Each operation is the same progression: validate, clamp, acquire the
//! right pipeline from the residency manager, execute, persist artifacts,
//! respond. The pipeline call dominates latency (seconds to tens of
//! seconds) and deliberately blocks: the residency guard is held for the
//! full execution so nothing can evict the pipeline mid-run.

use std::sync::Arc;
use std::time::Instant;

use draftly_core::naming;
use draftly_core::params::{self, ClipParams, ImageParams};

use crate::artifacts::ArtifactStore;
use crate::error::{EngineError, GenerateError, PipelineError};
use crate::export;
use crate::pipeline::{PipelineKind, SynthesisJob, SynthesisOutput};
use crate::residency::ResidencyManager;

/// Result of one image generation call.
#[derive(Debug)]
pub struct ImageOutcome {
    /// One retrievable URL per generated image.
    pub images: Vec<String>,
    /// The seed actually used (echoed for reproducibility).
    pub seed: u32,
    /// Pipeline execution time in seconds, rounded to centiseconds.
    pub elapsed: f64,
}

/// Result of one clip generation call.
#[derive(Debug)]
pub struct ClipOutcome {
    /// MP4 URL when the secondary export succeeded, otherwise the GIF URL.
    pub video_url: String,
    pub gif_url: String,
    pub seed: u32,
    pub elapsed: f64,
    /// Frames actually produced (after clamping).
    pub frames: u32,
}

/// Orchestrates residency, execution, and artifact persistence.
pub struct GenerationService {
    residency: Arc<ResidencyManager>,
    store: ArtifactStore,
}

impl GenerationService {
    pub fn new(residency: Arc<ResidencyManager>, store: ArtifactStore) -> Self {
        Self { residency, store }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Generate one batch of still images.
    pub async fn synthesize_image(
        &self,
        request: ImageParams,
    ) -> Result<ImageOutcome, GenerateError> {
        params::validate_prompt(&request.prompt)?;

        let (width, height) =
            params::clamp_resolution(request.width, request.height, params::MAX_IMAGE_DIM);
        let num_images = params::clamp_image_count(request.num_images);
        let seed = params::resolve_seed(request.seed);

        let job = SynthesisJob {
            prompt: request.prompt,
            width,
            height,
            frames: num_images,
            guidance_scale: request.guidance_scale,
            steps: request.num_inference_steps,
            seed,
            init_image: None,
        };

        tracing::info!(
            prompt = %preview(&job.prompt),
            width,
            height,
            num_images,
            seed,
            "Generating image"
        );
        let (output, elapsed) = self.run(PipelineKind::Image, &job).await?;
        tracing::info!(elapsed, "Image generated");

        let mut images = Vec::with_capacity(output.frames.len());
        for frame in &output.frames {
            let stored = self.store.write_png(naming::IMAGE_PREFIX, frame).await?;
            images.push(stored.url);
        }

        Ok(ImageOutcome {
            images,
            seed,
            elapsed,
        })
    }

    /// Generate one short animated clip.
    pub async fn synthesize_clip(
        &self,
        request: ClipParams,
    ) -> Result<ClipOutcome, GenerateError> {
        params::validate_prompt(&request.prompt)?;

        let (width, height) =
            params::clamp_resolution(request.width, request.height, params::MAX_CLIP_DIM);
        let num_frames = params::clamp_frame_count(request.num_frames);
        let seed = params::resolve_seed(request.seed);

        let job = SynthesisJob {
            prompt: request.prompt,
            width,
            height,
            frames: num_frames,
            guidance_scale: params::CLIP_GUIDANCE_SCALE,
            steps: params::CLIP_STEPS,
            seed,
            init_image: request.init_image,
        };

        tracing::info!(
            prompt = %preview(&job.prompt),
            width,
            height,
            num_frames,
            seed,
            "Generating clip"
        );
        let (output, elapsed) = self.run(PipelineKind::Video, &job).await?;
        let frames = output.frames.len() as u32;
        tracing::info!(elapsed, frames, "Clip generated");

        // Primary form: looped GIF. This write must succeed.
        let gif_bytes = encode_gif(&output, request.frame_rate)?;
        let gif = self
            .store
            .write_blob(naming::artifact_filename(naming::CLIP_PREFIX, "gif"), &gif_bytes)
            .await?;

        // Secondary form: MP4 via ffmpeg. Best-effort: the failure is
        // logged and discarded here, never surfaced to the caller.
        let mp4 = self.store.allocate(naming::CLIP_PREFIX, "mp4");
        let video_url = match export::export_mp4(&output.frames, request.frame_rate, &mp4.path)
            .await
        {
            Ok(()) => mp4.url,
            Err(error) => {
                tracing::warn!(%error, "MP4 export unavailable, serving GIF only");
                gif.url.clone()
            }
        };

        Ok(ClipOutcome {
            video_url,
            gif_url: gif.url,
            seed,
            elapsed,
            frames,
        })
    }

    /// Stage an uploaded file (init images for image-to-clip).
    pub async fn store_upload(
        &self,
        original_filename: &str,
        bytes: &[u8],
    ) -> Result<crate::artifacts::StoredArtifact, EngineError> {
        self.store
            .write_blob(naming::upload_filename(original_filename), bytes)
            .await
    }

    /// Acquire, execute, translate failures. Returns the output and the
    /// execution-only elapsed seconds (construction and swapping excluded,
    /// matching what callers want to see as "generation time").
    async fn run(
        &self,
        kind: PipelineKind,
        job: &SynthesisJob,
    ) -> Result<(SynthesisOutput, f64), GenerateError> {
        let guard = self.residency.acquire(kind).await?;
        let start = Instant::now();
        let result = guard.pipeline().synthesize(job).await;
        let elapsed = round_centis(start.elapsed().as_secs_f64());
        drop(guard);

        match result {
            Ok(output) => Ok((output, elapsed)),
            Err(PipelineError::OutOfMemory) => {
                // Recover the device before reporting so the next request
                // starts from a clean accelerator.
                self.residency.release_all().await;
                Err(EngineError::ResourceExhausted.into())
            }
            Err(PipelineError::Failed(message)) => {
                Err(EngineError::GenerationFailed(message).into())
            }
        }
    }
}

fn encode_gif(output: &SynthesisOutput, frame_rate: f32) -> Result<Vec<u8>, GenerateError> {
    export::encode_looped_gif(&output.frames, frame_rate)
        .map_err(|e| EngineError::GenerationFailed(e.to_string()).into())
}

/// First 80 characters of a prompt, for log lines.
fn preview(prompt: &str) -> String {
    prompt.chars().take(80).collect()
}

fn round_centis(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
