use draftly_core::error::CoreError;

/// Failure surface of a single pipeline operation (placement or execution).
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The accelerator ran out of memory.
    #[error("accelerator out of memory")]
    OutOfMemory,

    /// Anything else: malformed input reaching the pipeline, internal
    /// numerical errors, missing weights during construction.
    #[error("{0}")]
    Failed(String),
}

/// Failure surface of the residency manager and generation service.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A pipeline could not be built. The slot stays unconstructed so a
    /// later request can retry; nothing is retried automatically.
    #[error("pipeline construction failed: {0}")]
    Construction(String),

    /// The accelerator ran out of memory during placement or execution.
    /// By the time a caller sees this, the device has been recovered by a
    /// forced full eviction -- the caller should retry with smaller
    /// parameters.
    #[error("accelerator out of memory")]
    ResourceExhausted,

    /// Any other execution failure, surfaced verbatim. Residency state is
    /// left untouched: the pipeline is still considered valid.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// Writing an artifact to the output directory failed.
    #[error("artifact I/O failed: {0}")]
    Artifact(#[from] std::io::Error),

    /// Encoding frames into an artifact format failed.
    #[error("artifact encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Errors surfaced by the generation service: request validation plus
/// everything the engine can produce.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
