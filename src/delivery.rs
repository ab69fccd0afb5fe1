//! Artifact delivery.
//!
//! Acquisition ends with an in-memory [`Artifact`]; a sink puts it
//! somewhere. Delivery runs under its own retry policy, independent of the
//! fetch retries inside the pipeline.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::acquisition::retry::{self, RetryPolicy};
use crate::acquisition::size::format_size;
use crate::acquisition::{AcquireError, Artifact};

/// Destination for finished artifacts
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Deliver the artifact, returning where it ended up.
    async fn deliver(&self, artifact: &Artifact) -> Result<PathBuf, AcquireError>;
}

/// Writes artifacts as `{dir}/{display_name}`
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    max_bytes: u64,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn deliver(&self, artifact: &Artifact) -> Result<PathBuf, AcquireError> {
        let size = artifact.bytes.len() as u64;
        if size > self.max_bytes {
            return Err(AcquireError::Delivery(format!(
                "artifact too large for destination ({} > {})",
                format_size(size),
                format_size(self.max_bytes)
            )));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AcquireError::Delivery(format!("create {:?}: {e}", self.dir)))?;

        // Write to a sibling and rename so readers never see a partial file
        let target = self.dir.join(&artifact.display_name);
        let partial = self.dir.join(format!("{}.part", artifact.display_name));

        if let Err(e) = tokio::fs::write(&partial, &artifact.bytes).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(AcquireError::Delivery(format!("write {:?}: {e}", partial)));
        }
        if let Err(e) = tokio::fs::rename(&partial, &target).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(AcquireError::Delivery(format!("rename to {:?}: {e}", target)));
        }

        tracing::debug!("Delivered {} to {:?}", artifact.display_name, target);
        Ok(target)
    }
}

/// Deliver under `policy`; "too large" refusals are not retried.
pub async fn deliver_with_retry(
    sink: &dyn ArtifactSink,
    artifact: &Artifact,
    policy: &RetryPolicy<AcquireError>,
) -> Result<PathBuf, AcquireError> {
    retry::run(policy, &artifact.display_name, || sink.deliver(artifact)).await
}
