//! Internal domain models for media acquisition.
//!
//! These types are OUR types - upstream response shapes live in the
//! per-source DTO modules and are converted before they reach here.

use std::fmt;
use std::pin::Pin;

use futures::Stream;
use futures::stream::{self, StreamExt};

use crate::acquisition::retry::is_permanent_message;

/// Canonical asset identifier extracted from user input (e.g. `s_abc12345`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetId(String);

impl AssetId {
    pub(crate) fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the final bytes came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    None,
    PrimaryProxy,
    AuthenticatedApi,
    StaticCdn,
}

impl SourceKind {
    /// Human-readable name for summaries and logs
    pub fn display_name(self) -> &'static str {
        match self {
            SourceKind::PrimaryProxy => "CDN Proxy (No Watermark)",
            SourceKind::AuthenticatedApi => "Sora API",
            SourceKind::StaticCdn => "OpenAI CDN",
            SourceKind::None => "Unknown",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Optional credentials for the authenticated API source.
///
/// Both fields may be empty; an empty bearer token disables that source.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub bearer_token: String,
    pub cookie_header: String,
}

impl Credentials {
    pub fn new(bearer_token: impl Into<String>, cookie_header: impl Into<String>) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            cookie_header: cookie_header.into(),
        }
    }

    pub fn has_token(&self) -> bool {
        !self.bearer_token.trim().is_empty()
    }
}

/// Final acquired media, returned by value.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Media bytes after any watermark processing
    pub bytes: Vec<u8>,
    /// Suggested file name (`{id}_HD.mp4`)
    pub display_name: String,
    /// Human-readable size, e.g. "12.3 MB"
    pub size_label: String,
    /// Which source produced the bytes
    pub source: SourceKind,
    /// Whether the overlay filter ran
    pub watermark_removed: bool,
}

/// Boxed chunk stream of a media body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, AcquireError>> + Send>>;

/// An open media body plus whether it still carries the overlay.
pub struct MediaStream {
    pub body: ByteStream,
    pub needs_processing: bool,
}

impl MediaStream {
    /// Wrap an HTTP response body.
    pub fn from_response(response: reqwest::Response, needs_processing: bool) -> Self {
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(AcquireError::from_transport));
        Self {
            body: Box::pin(body),
            needs_processing,
        }
    }

    /// In-memory body, used by mocks and tests.
    pub fn from_bytes(data: Vec<u8>, needs_processing: bool) -> Self {
        Self {
            body: Box::pin(stream::iter(vec![Ok(data)])),
            needs_processing,
        }
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("needs_processing", &self.needs_processing)
            .finish_non_exhaustive()
    }
}

/// Result of one source strategy attempt
#[derive(Debug)]
pub enum FetchOutcome {
    /// The source produced a readable body
    Stream(MediaStream),
    /// The source simply doesn't have it (or was skipped)
    Absent,
    /// The source errored
    Failed(AcquireError),
}

/// Errors that can occur during acquisition
#[derive(Debug, Clone, thiserror::Error)]
pub enum AcquireError {
    #[error("Invalid video URL or code")]
    InvalidInput,

    #[error("Video source unavailable")]
    SourceUnavailable { reasons: Vec<String> },

    #[error("Watermark processing failed")]
    ProcessingFailed,

    #[error("Video too large ({size} > {limit})")]
    TooLarge { size: String, limit: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl AcquireError {
    /// Transient errors may be retried; the taxonomy kinds never are.
    ///
    /// Timeouts always retry. Local I/O (temp files, the filter binary)
    /// never does: another download would hit the same disk.
    pub fn is_retryable(&self) -> bool {
        match self {
            AcquireError::InvalidInput
            | AcquireError::SourceUnavailable { .. }
            | AcquireError::ProcessingFailed
            | AcquireError::TooLarge { .. }
            | AcquireError::Io(_) => false,
            AcquireError::Timeout(_) => true,
            AcquireError::Network(msg) | AcquireError::Delivery(msg) => {
                !is_permanent_message(msg)
            }
        }
    }

    /// Map a reqwest error, keeping timeouts distinguishable.
    ///
    /// The URL is stripped: it carries the user-supplied identifier, which
    /// must not feed the message classifier.
    pub fn from_transport(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            AcquireError::Timeout(err.to_string())
        } else {
            AcquireError::Network(err.to_string())
        }
    }
}

impl From<std::io::Error> for AcquireError {
    fn from(err: std::io::Error) -> Self {
        AcquireError::Io(err.to_string())
    }
}
