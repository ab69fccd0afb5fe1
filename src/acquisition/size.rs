//! Final artifact size ceiling.

use super::domain::AcquireError;

/// Hard ceiling of the downstream delivery channel (50 MiB)
pub const MAX_ARTIFACT_BYTES: u64 = 50 * 1024 * 1024;

/// Format a byte count as megabytes with one decimal, e.g. "12.3 MB"
pub fn format_size(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
}

/// Rejects artifacts above a byte ceiling.
#[derive(Debug, Clone, Copy)]
pub struct SizeGuard {
    limit: u64,
}

impl SizeGuard {
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }

    /// Passes at exactly the limit; one byte over is [`AcquireError::TooLarge`].
    pub fn check(&self, bytes: &[u8]) -> Result<(), AcquireError> {
        self.check_len(bytes.len() as u64)
    }

    /// Same ceiling applied to a known length, e.g. a file's metadata.
    pub fn check_len(&self, len: u64) -> Result<(), AcquireError> {
        if len > self.limit {
            return Err(AcquireError::TooLarge {
                size: format_size(len),
                limit: format_size(self.limit),
            });
        }
        Ok(())
    }
}

impl Default for SizeGuard {
    fn default() -> Self {
        Self::new(MAX_ARTIFACT_BYTES)
    }
}
