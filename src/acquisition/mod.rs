//! Media acquisition pipeline - turns a share link into a clean video artifact.
//!
//! # Architecture
//!
//! - **Domain models** (`domain.rs`) - identifiers, outcomes, artifact, errors
//! - **Identifier** (`identifier.rs`) - pulls the asset code out of user input
//! - **Sources** (`sources/`) - one HTTP client per upstream, tried in order
//! - **Retry** (`retry.rs`) - policy + executor with error classification
//! - **Persist** (`persist.rs`) - self-deleting temp files and stream writer
//! - **Watermark** (`watermark.rs`) - overlay removal via ffmpeg
//! - **Size** (`size.rs`) - final size ceiling
//! - **Service** (`service.rs`) - high-level orchestration
//!
//! # Usage
//!
//! ```ignore
//! use acquisition::{AcquisitionService, Credentials};
//!
//! let service = AcquisitionService::new(&config::load())?;
//! let artifact = service
//!     .acquire("https://sora.chatgpt.com/p/s_abc12345", &Credentials::default())
//!     .await?;
//! println!("{} via {} ({})", artifact.display_name, artifact.source, artifact.size_label);
//! ```

pub mod domain;
pub mod identifier;
pub mod persist;
pub mod retry;
pub mod service;
pub mod size;
pub mod sources;
pub mod traits;
pub mod watermark;

pub use domain::{AcquireError, Artifact, AssetId, Credentials, FetchOutcome, SourceKind};
pub use retry::RetryPolicy;
pub use service::{AcquisitionConfig, AcquisitionService};
