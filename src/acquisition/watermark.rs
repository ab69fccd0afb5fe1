//! Watermark removal using ffmpeg's `delogo` filter
//!
//! This module shells out to the `ffmpeg` command-line tool. The region is
//! given relative to the frame's bottom-right corner so it works for any
//! resolution, and the audio track is stream-copied untouched.
//!
//! Install ffmpeg:
//! - Windows: `winget install Gyan.FFmpeg`
//! - macOS: `brew install ffmpeg`
//! - Linux: `apt install ffmpeg` or equivalent

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::OnceCell;

use super::domain::AcquireError;
use super::persist::TempFile;
use super::traits::MediaFilter;

#[cfg(windows)]
const FFMPEG_PATHS: &[&str] = &[
    "ffmpeg", // In PATH
    r"C:\ffmpeg\bin\ffmpeg.exe",
    r"C:\Program Files\ffmpeg\bin\ffmpeg.exe",
];

#[cfg(not(windows))]
const FFMPEG_PATHS: &[&str] = &[
    "ffmpeg", // In PATH
    "/usr/bin/ffmpeg",
    "/usr/local/bin/ffmpeg",
    "/opt/homebrew/bin/ffmpeg",
];

/// Overlay rectangle, anchored to the bottom-right corner of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropRegion {
    /// Distance of the region's left edge from the right edge, in pixels
    pub right_offset: u32,
    /// Distance of the region's top edge from the bottom edge, in pixels
    pub bottom_offset: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for CropRegion {
    fn default() -> Self {
        Self {
            right_offset: 160,
            bottom_offset: 60,
            width: 150,
            height: 50,
        }
    }
}

impl CropRegion {
    /// ffmpeg filter expression for this region
    pub fn to_filter(&self) -> String {
        format!(
            "delogo=x=iw-{}:y=ih-{}:w={}:h={}",
            self.right_offset, self.bottom_offset, self.width, self.height
        )
    }
}

/// Find the ffmpeg executable, checking common installation paths
fn find_ffmpeg() -> Option<&'static str> {
    FFMPEG_PATHS
        .iter()
        .find(|&path| {
            std::process::Command::new(path)
                .arg("-version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
        .copied()
}

/// Get the first line of `ffmpeg -version` (for diagnostics)
pub fn get_ffmpeg_version() -> Option<String> {
    let ffmpeg = find_ffmpeg()?;
    std::process::Command::new(ffmpeg)
        .arg("-version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| {
            String::from_utf8_lossy(&o.stdout)
                .lines()
                .next()
                .map(|l| l.trim().to_string())
        })
}

/// [`MediaFilter`] backed by an ffmpeg subprocess.
pub struct FfmpegFilter {
    /// Explicit binary; `None` searches the usual locations
    binary: Option<PathBuf>,
    /// Search result, found once per filter
    located: OnceCell<PathBuf>,
    timeout: Duration,
}

impl FfmpegFilter {
    pub fn new(binary: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary,
            located: OnceCell::new(),
            timeout,
        }
    }

    /// The lookup spawns `ffmpeg -version` synchronously, so it runs on the
    /// blocking pool and only on first use.
    async fn resolve_binary(&self) -> Result<PathBuf, AcquireError> {
        if let Some(ref path) = self.binary {
            return Ok(path.clone());
        }
        self.located
            .get_or_try_init(|| async {
                tokio::task::spawn_blocking(find_ffmpeg)
                    .await
                    .map_err(|e| AcquireError::Io(format!("ffmpeg lookup aborted: {e}")))?
                    .map(PathBuf::from)
                    .ok_or_else(|| {
                        AcquireError::Io("ffmpeg executable could not be located".to_string())
                    })
            })
            .await
            .cloned()
    }

    fn build_args(input: &Path, output: &Path, region: &CropRegion) -> Vec<std::ffi::OsString> {
        vec![
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-vf".into(),
            region.to_filter().into(),
            "-c:a".into(),
            "copy".into(),
            output.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl MediaFilter for FfmpegFilter {
    async fn apply_crop_mask(
        &self,
        input: &Path,
        output: &Path,
        region: &CropRegion,
    ) -> Result<(), AcquireError> {
        let binary = self.resolve_binary().await?;

        let mut command = Command::new(&binary);
        command
            .args(Self::build_args(input, output, region))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Dropping the pending future on timeout kills the child
        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| AcquireError::Timeout(format!("ffmpeg exceeded {:?}", self.timeout)))??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(5)..].join(" | ");
            return Err(AcquireError::Io(format!(
                "ffmpeg exited with {}: {}",
                result.status, tail
            )));
        }

        Ok(())
    }
}

/// Runs a [`MediaFilter`] with the temp file guarantees of the pipeline.
pub struct WatermarkProcessor<'a> {
    filter: &'a dyn MediaFilter,
    region: CropRegion,
}

impl<'a> WatermarkProcessor<'a> {
    pub fn new(filter: &'a dyn MediaFilter, region: CropRegion) -> Self {
        Self { filter, region }
    }

    /// Filter `input` into `output`.
    ///
    /// `input` is always deleted once the filter has exited. `output` is
    /// deleted on failure and handed back on success. Filter diagnostics are
    /// logged; callers only see [`AcquireError::ProcessingFailed`].
    pub async fn process(&self, input: TempFile, output: TempFile) -> Result<TempFile, AcquireError> {
        let result = self
            .filter
            .apply_crop_mask(input.path(), output.path(), &self.region)
            .await;
        drop(input);

        match result {
            Ok(()) => Ok(output),
            Err(e) => {
                tracing::error!("Watermark filter failed: {}", e);
                Err(AcquireError::ProcessingFailed)
            }
        }
    }
}
