//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror` (the
//! acquisition pipeline has [`AcquireError`]), while the CLI uses `anyhow`
//! for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - Module-specific errors ([`AcquireError`], [`ConfigError`]) for detailed handling
//! - All errors implement `std::error::Error` for compatibility
//!
//! # Example
//!
//! ```ignore
//! use sora_fetch::error::{Result, ResultExt};
//!
//! fn read_settings(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path).with_context("reading settings")
//! }
//! ```

use std::path::PathBuf;

use crate::acquisition::AcquireError;
use crate::config::ConfigError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Acquisition pipeline error
    #[error("{0}")]
    Acquire(#[from] AcquireError),

    /// Config file could not be written
    #[error("{0}")]
    ConfigFile(#[from] ConfigError),

    /// Output location problem
    #[error("Output directory not usable: {0}")]
    Output(PathBuf),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an output directory error.
    pub fn output(path: impl Into<PathBuf>) -> Self {
        Self::Output(path.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, AcquireError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Acquire(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::output("/srv/videos");
        assert!(err.to_string().contains("/srv/videos"));
    }

    #[test]
    fn test_acquire_error_keeps_user_message() {
        let err: Error = AcquireError::InvalidInput.into();
        assert_eq!(err.to_string(), "Invalid video URL or code");
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::config("bad key").context("while loading settings");
        let msg = err.to_string();
        assert!(msg.contains("while loading settings"));
        assert!(msg.contains("bad key"));
    }

    #[test]
    fn test_result_ext() {
        let result: std::result::Result<(), AcquireError> = Err(AcquireError::ProcessingFailed);
        let with_ctx = result.with_context("s_abc12345");
        assert_eq!(
            with_ctx.unwrap_err().to_string(),
            "s_abc12345: Watermark processing failed"
        );
    }

    #[test]
    fn test_io_result_ext() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("disk full"));
        let msg = result.with_context("writing artifact").unwrap_err().to_string();
        assert!(msg.starts_with("writing artifact"));
    }
}
