//! Filesystem artifact store.
//!
//! A flat directory of generated files plus the URL-forming convention the
//! transport layer serves them under (`{public_base_url}/outputs/{name}`).
//! Writes are append-only under globally-unique names, so concurrent
//! requests can never race on a path.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use draftly_core::naming;
use image::RgbImage;

use crate::error::EngineError;

/// Owns the output directory and the public URL prefix.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    public_base_url: String,
}

/// A named artifact: filesystem path plus retrievable URL.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub filename: String,
    pub path: PathBuf,
    pub url: String,
}

impl ArtifactStore {
    /// Open (creating if needed) the output directory.
    pub async fn open(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> std::io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_for(&self, filename: &str) -> String {
        format!("{}/outputs/{filename}", self.public_base_url)
    }

    /// Reserve a fresh name for `prefix`/`ext` without writing anything.
    /// Used when an external encoder produces the file in place.
    pub fn allocate(&self, prefix: &str, ext: &str) -> StoredArtifact {
        self.entry(naming::artifact_filename(prefix, ext))
    }

    /// Encode an RGB frame as PNG and persist it under a fresh name.
    pub async fn write_png(
        &self,
        prefix: &str,
        frame: &RgbImage,
    ) -> Result<StoredArtifact, EngineError> {
        let mut bytes = Vec::new();
        frame.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        self.write_blob(naming::artifact_filename(prefix, "png"), &bytes)
            .await
    }

    /// Persist raw bytes under the given (already unique) filename.
    pub async fn write_blob(
        &self,
        filename: String,
        bytes: &[u8],
    ) -> Result<StoredArtifact, EngineError> {
        let entry = self.entry(filename);
        tokio::fs::write(&entry.path, bytes).await?;
        Ok(entry)
    }

    fn entry(&self, filename: String) -> StoredArtifact {
        StoredArtifact {
            path: self.root.join(&filename),
            url: self.url_for(&filename),
            filename,
        }
    }
}
