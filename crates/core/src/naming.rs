//! Artifact naming convention.
//!
//! Generated files live in one flat output directory and are named
//! `{prefix}_{12-hex-random}.{ext}`. The prefix identifies what produced
//! the file (generated image, generated clip, user upload); the random
//! token makes every write globally unique so concurrent requests can
//! never collide.

/// Prefix for generated still images.
pub const IMAGE_PREFIX: &str = "img";

/// Prefix for generated clips (GIF and MP4 share it).
pub const CLIP_PREFIX: &str = "vid";

/// Prefix for user-uploaded files.
pub const UPLOAD_PREFIX: &str = "upload";

/// Length of the random hex token embedded in every filename.
const TOKEN_LEN: usize = 12;

/// Generate a fresh 12-character lowercase hex token.
pub fn random_token() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    hex[..TOKEN_LEN].to_string()
}

/// Build an artifact filename: `{prefix}_{12hex}.{ext}`.
pub fn artifact_filename(prefix: &str, ext: &str) -> String {
    format!("{prefix}_{}.{ext}", random_token())
}

/// Build an upload filename: `upload_{12hex}_{sanitized-original-name}`.
///
/// The original name is reduced to its final path component and stripped
/// of anything outside `[A-Za-z0-9._-]` so a client-supplied name can
/// never escape the output directory.
pub fn upload_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);
    let sanitized: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let safe = if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    };
    format!("{UPLOAD_PREFIX}_{}_{safe}", random_token())
}
