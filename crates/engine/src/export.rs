//! Clip export.
//!
//! A generated clip is always written as a looped GIF (universally
//! viewable, no external tooling). When the `ffmpeg` binary is available
//! the same frames are additionally packed into an MP4; that step is
//! best-effort and its failure is the caller's to discard.

use std::path::Path;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbImage};

/// Error type for clip export operations.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("frame encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ffmpeg binary not found: {0}")]
    FfmpegNotFound(std::io::Error),

    #[error("ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    FfmpegFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("clip has no frames")]
    Empty,
}

/// Encode frames as an infinitely-looped GIF.
///
/// `frame_rate` is playback frames per second; each GIF frame gets a
/// `1000 / frame_rate` millisecond delay.
pub fn encode_looped_gif(frames: &[RgbImage], frame_rate: f32) -> Result<Vec<u8>, ExportError> {
    if frames.is_empty() {
        return Err(ExportError::Empty);
    }

    let delay_ms = (1000.0 / frame_rate.max(0.1)) as u32;
    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut bytes, 10);
        encoder.set_repeat(Repeat::Infinite)?;
        for frame in frames {
            let rgba = image::DynamicImage::ImageRgb8(frame.clone()).to_rgba8();
            encoder.encode_frame(Frame::from_parts(
                rgba,
                0,
                0,
                Delay::from_numer_denom_ms(delay_ms, 1),
            ))?;
        }
    }
    Ok(bytes)
}

/// Pack frames into an MP4 at `dest` by staging a PNG sequence and running
/// `ffmpeg`. Returns an error when the binary is missing or exits nonzero;
/// the staged frames are cleaned up either way.
pub async fn export_mp4(
    frames: &[RgbImage],
    frame_rate: f32,
    dest: &Path,
) -> Result<(), ExportError> {
    if frames.is_empty() {
        return Err(ExportError::Empty);
    }

    let scratch = std::env::temp_dir().join(format!(
        "draftly-export-{}",
        draftly_core::naming::random_token()
    ));
    tokio::fs::create_dir_all(&scratch).await?;

    let result = run_ffmpeg(frames, frame_rate, dest, &scratch).await;

    if let Err(error) = tokio::fs::remove_dir_all(&scratch).await {
        tracing::debug!(%error, "Could not remove export scratch directory");
    }
    result
}

async fn run_ffmpeg(
    frames: &[RgbImage],
    frame_rate: f32,
    dest: &Path,
    scratch: &Path,
) -> Result<(), ExportError> {
    for (index, frame) in frames.iter().enumerate() {
        let mut bytes = Vec::new();
        frame.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )?;
        tokio::fs::write(scratch.join(format!("frame_{index:04}.png")), bytes).await?;
    }

    let pattern = scratch.join("frame_%04d.png");
    let output = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-framerate", &format!("{}", frame_rate.max(0.1))])
        .arg("-i")
        .arg(&pattern)
        .args(["-pix_fmt", "yuv420p", "-movflags", "+faststart"])
        .arg(dest)
        .output()
        .await
        .map_err(ExportError::FfmpegNotFound)?;

    if !output.status.success() {
        return Err(ExportError::FfmpegFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}
