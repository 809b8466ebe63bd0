use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use draftly_core::error::CoreError;
use draftly_engine::error::{EngineError, GenerateError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps domain errors from `draftly_core` and `draftly_engine` and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A validation error from `draftly_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An engine error (construction, exhaustion, execution, persistence).
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<GenerateError> for AppError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Invalid(core) => AppError::Core(core),
            GenerateError::Engine(engine) => AppError::Engine(engine),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }

            AppError::Engine(engine) => match engine {
                // The one retryable-by-the-client failure: 507 tells the
                // caller the device itself ran out, not the server logic.
                EngineError::ResourceExhausted => (
                    StatusCode::INSUFFICIENT_STORAGE,
                    "RESOURCE_EXHAUSTED",
                    "GPU out of memory. Try a smaller resolution, fewer images, or fewer frames."
                        .to_string(),
                ),
                EngineError::Construction(msg) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PIPELINE_UNAVAILABLE",
                    format!("Pipeline construction failed: {msg}"),
                ),
                EngineError::GenerationFailed(msg) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "GENERATION_FAILED",
                    msg.clone(),
                ),
                EngineError::Artifact(err) => {
                    tracing::error!(error = %err, "Artifact persistence failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
                EngineError::Encode(err) => {
                    tracing::error!(error = %err, "Artifact encoding failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
