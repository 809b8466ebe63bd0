//! Pipeline abstraction: kinds, placement, jobs, and the construction seam.
//!
//! A [`Pipeline`] is a constructed, runnable generative model. Construction
//! is expensive (weight fetch and composition, seconds to minutes) and runs
//! at most once per kind for the life of the process; after that only the
//! pipeline's *placement* changes as the residency manager swaps it on and
//! off the accelerator.

use std::path::PathBuf;

use async_trait::async_trait;
use image::RgbImage;

use crate::error::PipelineError;

/// Which generative pipeline a request needs. The only residency key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Image,
    Video,
}

impl PipelineKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

/// Where a pipeline's weights currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Hybrid accelerator residency: the portion currently executing is
    /// streamed into device memory on demand, the rest stays on host. This
    /// is what lets a pipeline larger than the device run at all.
    Device,
    /// Fully host-resident (idle).
    Host,
}

/// One synthesis call's worth of clamped parameters.
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    /// Images for an image job, clip frames for a video job.
    pub frames: u32,
    pub guidance_scale: f32,
    pub steps: u32,
    pub seed: u32,
    /// Optional init image (image-to-clip).
    pub init_image: Option<PathBuf>,
}

/// Frames produced by one pipeline run.
pub struct SynthesisOutput {
    pub frames: Vec<RgbImage>,
}

/// A constructed, runnable model pipeline.
///
/// Implementations must be deterministic in the job's seed: two runs with
/// identical jobs on the same build produce identical frames.
#[async_trait]
pub trait Pipeline: Send + Sync {
    fn kind(&self) -> PipelineKind;

    /// Move the pipeline's weights. Placing on device enables hybrid
    /// streaming residency; placing on host fully vacates the accelerator.
    async fn place(&mut self, placement: Placement) -> Result<(), PipelineError>;

    /// Run the pipeline synchronously with clamped parameters. Dominant
    /// latency cost of a request; blocks until done or failed.
    async fn synthesize(&self, job: &SynthesisJob) -> Result<SynthesisOutput, PipelineError>;
}

/// Constructs pipelines on first use. Injected into the residency manager
/// so tests can substitute instrumented pipelines.
#[async_trait]
pub trait PipelineFactory: Send + Sync {
    async fn build(&self, kind: PipelineKind) -> Result<Box<dyn Pipeline>, PipelineError>;
}
