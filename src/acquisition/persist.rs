//! Temporary file lifecycle and stream persistence.
//!
//! Every temp file of an acquisition is owned by a [`TempFile`] which removes
//! it when dropped, so the pipeline cleans up on every exit path including
//! early returns through `?`.

use std::fs;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use super::domain::{AcquireError, MediaStream};

/// A path deleted when this handle is dropped.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Take ownership of `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed temp file {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove temp file {:?}: {}", self.path, e),
        }
    }
}

/// Correlated input/output temp paths for one acquisition call.
#[derive(Debug, Clone)]
pub struct TempPaths {
    token: String,
    dir: PathBuf,
}

impl TempPaths {
    /// Generate a fresh random token under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            token: generate_token(),
            dir: dir.into(),
        }
    }

    /// The random token, also sent upstream as a request id.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn input(&self) -> PathBuf {
        self.dir.join(format!("{}_in.mp4", self.token))
    }

    pub fn output(&self) -> PathBuf {
        self.dir.join(format!("{}_out.mp4", self.token))
    }
}

/// 8 random bytes as 16 lowercase hex chars
fn generate_token() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// Stream `stream` into a new file at `path`.
///
/// The returned [`TempFile`] owns the path; on error the partial file is
/// removed before returning.
pub async fn persist(stream: MediaStream, path: PathBuf) -> Result<(TempFile, u64), AcquireError> {
    let temp = TempFile::new(path);
    let written = write_body(stream, temp.path()).await?;
    tracing::debug!("Persisted {} bytes to {:?}", written, temp.path());
    Ok((temp, written))
}

async fn write_body(stream: MediaStream, path: &Path) -> Result<u64, AcquireError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut body = stream.body;
    let mut written = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}
