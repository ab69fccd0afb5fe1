//! Trait definitions for the pipeline's replaceable collaborators.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses the HTTP source clients and the ffmpeg filter,
//! while tests substitute the mock implementations below.

use std::path::Path;

use async_trait::async_trait;

use super::domain::{AcquireError, AssetId, Credentials, FetchOutcome, SourceKind};
use super::watermark::CropRegion;

/// Per-call context handed to every source attempt.
#[derive(Debug, Clone)]
pub struct AttemptContext<'a> {
    pub credentials: &'a Credentials,
    /// Random per-call token, also used in temp file names
    pub request_id: &'a str,
}

/// One upstream source of media.
///
/// Implementations must not leave open handles behind on failure and must
/// bound their own network time.
#[async_trait]
pub trait SourceStrategy: Send + Sync {
    /// Provenance recorded when this source wins.
    fn kind(&self) -> SourceKind;

    /// Try to open a media body for `id`.
    async fn attempt(&self, id: &AssetId, ctx: &AttemptContext<'_>) -> FetchOutcome;
}

/// External capability that obscures a rectangular region of a video.
#[async_trait]
pub trait MediaFilter: Send + Sync {
    /// Write a filtered copy of `input` to `output`, audio untouched.
    async fn apply_crop_mask(
        &self,
        input: &Path,
        output: &Path,
        region: &CropRegion,
    ) -> Result<(), AcquireError>;
}
