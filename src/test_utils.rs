//! Test utilities and fixtures for sora-fetch tests.
//!
//! Shared helpers for building pipelines out of mocks and for checking
//! that temp directories were left clean.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{dir_entries, test_config};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let dir = tempfile::tempdir().unwrap();
//!     let config = test_config(dir.path());
//!     // ... run the service
//!     assert!(dir_entries(dir.path()).is_empty());
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::acquisition::domain::{AssetId, FetchOutcome, SourceKind};
use crate::acquisition::traits::mocks::MockSource;
use crate::acquisition::traits::{AttemptContext, SourceStrategy};
use crate::acquisition::{AcquireError, AcquisitionConfig, RetryPolicy};

/// Shares a [`MockSource`] with the chain so the test can still read its
/// call count after handing it over.
pub struct ArcSource(pub Arc<MockSource>);

#[async_trait]
impl SourceStrategy for ArcSource {
    fn kind(&self) -> SourceKind {
        self.0.kind()
    }

    async fn attempt(&self, id: &AssetId, ctx: &AttemptContext<'_>) -> FetchOutcome {
        self.0.attempt(id, ctx).await
    }
}

/// All entries of `dir`, sorted. Empty if the directory is gone.
pub fn dir_entries(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    paths.sort();
    paths
}

/// Pipeline config with temp files under `temp_dir` and short retry pauses.
///
/// Keeps the production attempt count so retry behaviour is unchanged.
pub fn test_config(temp_dir: &Path) -> AcquisitionConfig {
    AcquisitionConfig {
        temp_dir: temp_dir.to_path_buf(),
        fetch_retry: RetryPolicy::new(3, Duration::from_millis(10), AcquireError::is_retryable),
        ..AcquisitionConfig::default()
    }
}
