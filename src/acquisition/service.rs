//! Acquisition service - orchestrates the whole pipeline
//!
//! This is the high-level API for acquiring an asset:
//! 1. Extract the identifier from user input
//! 2. Walk the source chain (under retry) and persist the winning stream
//! 3. Remove the overlay if the source served marked content
//! 4. Enforce the size ceiling and assemble the artifact
//!
//! Every temp file lives in a [`TempFile`] owned by this scope, so all of
//! them are gone by the time `acquire` returns, whichever way it returns.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::acquisition::{
    domain::{AcquireError, Artifact, AssetId, Credentials, SourceKind},
    identifier,
    persist::{self, TempFile, TempPaths},
    retry::{self, RetryPolicy},
    size::{SizeGuard, format_size},
    sources::SourceChain,
    traits::{AttemptContext, MediaFilter},
    watermark::{CropRegion, FfmpegFilter, WatermarkProcessor},
};
use crate::config::Config;

/// Tunables of the acquisition pipeline
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Directory for per-call temp files
    pub temp_dir: PathBuf,
    /// Overlay region handed to the filter
    pub region: CropRegion,
    /// Byte ceiling of the final artifact
    pub max_bytes: u64,
    /// Policy around the fetch step (chain + persist)
    pub fetch_retry: RetryPolicy<AcquireError>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            region: CropRegion::default(),
            max_bytes: crate::acquisition::size::MAX_ARTIFACT_BYTES,
            fetch_retry: RetryPolicy::source_fetch(),
        }
    }
}

impl AcquisitionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            temp_dir: config
                .temp_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
            region: config.watermark.region,
            max_bytes: config.limits.max_bytes,
            fetch_retry: RetryPolicy::new(
                config.retry.fetch_attempts,
                Duration::from_secs(config.retry.fetch_delay_secs),
                AcquireError::is_retryable,
            ),
        }
    }
}

/// Winner of the fetch step, already on disk
struct Fetched {
    source: SourceKind,
    needs_processing: bool,
    file: TempFile,
}

/// Service that turns user input into an [`Artifact`]
pub struct AcquisitionService {
    chain: SourceChain,
    filter: Arc<dyn MediaFilter>,
    config: AcquisitionConfig,
}

impl AcquisitionService {
    /// Production service: HTTP sources and the ffmpeg filter
    pub fn new(config: &Config) -> Result<Self, AcquireError> {
        let filter = FfmpegFilter::new(
            config.watermark.ffmpeg_path.clone(),
            Duration::from_secs(config.timeouts.filter_secs),
        );
        let chain = SourceChain::from_config(config)?;
        tracing::debug!("Source chain: {:?}", chain.kinds());
        Ok(Self::with_parts(
            chain,
            Arc::new(filter),
            AcquisitionConfig::from_config(config),
        ))
    }

    /// Assemble a service from explicit parts
    pub fn with_parts(
        chain: SourceChain,
        filter: Arc<dyn MediaFilter>,
        config: AcquisitionConfig,
    ) -> Self {
        Self {
            chain,
            filter,
            config,
        }
    }

    /// Acquire the asset named in `input`.
    ///
    /// Returns exactly one artifact or one error; the error is always one of
    /// `InvalidInput`, `SourceUnavailable`, `ProcessingFailed` or `TooLarge`
    /// unless local I/O fails.
    pub async fn acquire(
        &self,
        input: &str,
        credentials: &Credentials,
    ) -> Result<Artifact, AcquireError> {
        let id = identifier::extract(input).ok_or(AcquireError::InvalidInput)?;
        let paths = TempPaths::new(&self.config.temp_dir);
        tracing::debug!("Acquiring {} (request {})", id, paths.token());

        let fetched = self
            .fetch_to_disk(&id, &paths, credentials)
            .await
            .map_err(|e| match e {
                // Retries exhausted on a transient source error: the chain is
                // exhausted. Local I/O is permanent and passes through as is.
                e if e.is_retryable() => AcquireError::SourceUnavailable {
                    reasons: vec![e.to_string()],
                },
                e => e,
            })?;

        let final_file = if fetched.needs_processing {
            let processor = WatermarkProcessor::new(self.filter.as_ref(), self.config.region);
            processor
                .process(fetched.file, TempFile::new(paths.output()))
                .await?
        } else {
            fetched.file
        };

        // Reject oversized output before pulling it into memory
        let guard = SizeGuard::new(self.config.max_bytes);
        guard.check_len(tokio::fs::metadata(final_file.path()).await?.len())?;

        let bytes = tokio::fs::read(final_file.path()).await?;
        drop(final_file);

        guard.check(&bytes)?;

        let artifact = Artifact {
            display_name: format!("{}_HD.mp4", id),
            size_label: format_size(bytes.len() as u64),
            source: fetched.source,
            watermark_removed: fetched.needs_processing,
            bytes,
        };
        tracing::info!(
            "Acquired {} from {} ({}, watermark removed: {})",
            artifact.display_name,
            artifact.source,
            artifact.size_label,
            artifact.watermark_removed
        );
        Ok(artifact)
    }

    /// Source chain plus persistence, retried as one step so a body that
    /// breaks mid-download is fetched again.
    async fn fetch_to_disk(
        &self,
        id: &AssetId,
        paths: &TempPaths,
        credentials: &Credentials,
    ) -> Result<Fetched, AcquireError> {
        let context = AttemptContext {
            credentials,
            request_id: paths.token(),
        };
        let ctx = &context;

        retry::run(&self.config.fetch_retry, id.as_str(), move || async move {
            let (source, stream) = self.chain.first_stream(id, ctx).await?;
            let needs_processing = stream.needs_processing;
            let (file, _written) = persist::persist(stream, paths.input()).await?;
            Ok(Fetched {
                source,
                needs_processing,
                file,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::traits::mocks::{FILTERED_MARKER, MockBehavior, MockFilter, MockSource};
    use crate::test_utils::{ArcSource, dir_entries, test_config};

    const VIDEO: &[u8] = b"\x00\x00\x00\x18ftypmp42 fake video payload";

    #[tokio::test]
    async fn test_proxy_success_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let filter = Arc::new(MockFilter::succeeding());
        let service = AcquisitionService::with_parts(
            SourceChain::new(vec![
                Box::new(MockSource::streaming(SourceKind::PrimaryProxy, VIDEO, false)),
                Box::new(MockSource::absent(SourceKind::AuthenticatedApi)),
                Box::new(MockSource::streaming(SourceKind::StaticCdn, b"other", true)),
            ]),
            filter.clone(),
            test_config(dir.path()),
        );

        let artifact = service
            .acquire("sora.chatgpt.com/p/s_abc12345", &Credentials::default())
            .await
            .unwrap();

        assert_eq!(artifact.source, SourceKind::PrimaryProxy);
        assert!(!artifact.watermark_removed);
        assert_eq!(artifact.bytes, VIDEO);
        assert_eq!(artifact.display_name, "s_abc12345_HD.mp4");
        assert_eq!(artifact.size_label, "0.0 MB");
        assert_eq!(filter.calls(), 0);
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_cdn_fallback_runs_filter_once() {
        let dir = tempfile::tempdir().unwrap();
        let filter = Arc::new(MockFilter::succeeding());
        let service = AcquisitionService::with_parts(
            SourceChain::new(vec![
                Box::new(MockSource::absent(SourceKind::PrimaryProxy)),
                Box::new(MockSource::absent(SourceKind::AuthenticatedApi)),
                Box::new(MockSource::streaming(SourceKind::StaticCdn, VIDEO, true)),
            ]),
            filter.clone(),
            test_config(dir.path()),
        );

        let artifact = service
            .acquire("sora.chatgpt.com/p/s_abc12345", &Credentials::default())
            .await
            .unwrap();

        assert_eq!(artifact.source, SourceKind::StaticCdn);
        assert!(artifact.watermark_removed);
        assert!(artifact.bytes.starts_with(FILTERED_MARKER));
        assert_eq!(filter.calls(), 1);
        assert_eq!(filter.regions(), vec![CropRegion::default()]);
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let proxy = Arc::new(MockSource::streaming(SourceKind::PrimaryProxy, VIDEO, false));
        let service = AcquisitionService::with_parts(
            SourceChain::new(vec![Box::new(ArcSource(proxy.clone()))]),
            Arc::new(MockFilter::succeeding()),
            test_config(dir.path()),
        );

        let err = service
            .acquire("https://example.com/nothing-here", &Credentials::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AcquireError::InvalidInput));
        assert_eq!(proxy.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_chain_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let cdn = Arc::new(MockSource::absent(SourceKind::StaticCdn));
        let service = AcquisitionService::with_parts(
            SourceChain::new(vec![
                Box::new(MockSource::absent(SourceKind::PrimaryProxy)),
                Box::new(MockSource::absent(SourceKind::AuthenticatedApi)),
                Box::new(ArcSource(cdn.clone())),
            ]),
            Arc::new(MockFilter::succeeding()),
            test_config(dir.path()),
        );

        let err = service
            .acquire("s_abc12345", &Credentials::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AcquireError::SourceUnavailable { .. }));
        assert_eq!(cdn.calls(), 1);
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retried_then_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let proxy = Arc::new(MockSource::new(
            SourceKind::PrimaryProxy,
            MockBehavior::FailThenStream {
                failures: 2,
                error: AcquireError::Timeout("operation timed out".into()),
                data: VIDEO.to_vec(),
                needs_processing: false,
            },
        ));
        let service = AcquisitionService::with_parts(
            SourceChain::new(vec![
                Box::new(ArcSource(proxy.clone())),
                Box::new(MockSource::absent(SourceKind::StaticCdn)),
            ]),
            Arc::new(MockFilter::succeeding()),
            test_config(dir.path()),
        );

        let artifact = service
            .acquire("s_abc12345", &Credentials::default())
            .await
            .unwrap();

        assert_eq!(artifact.source, SourceKind::PrimaryProxy);
        assert_eq!(proxy.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_timeouts_become_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let proxy = Arc::new(MockSource::failing(
            SourceKind::PrimaryProxy,
            AcquireError::Timeout("operation timed out".into()),
        ));
        let service = AcquisitionService::with_parts(
            SourceChain::new(vec![Box::new(ArcSource(proxy.clone()))]),
            Arc::new(MockFilter::succeeding()),
            test_config(dir.path()),
        );

        let err = service
            .acquire("s_abc12345", &Credentials::default())
            .await
            .unwrap_err();

        let AcquireError::SourceUnavailable { reasons } = &err else {
            panic!("expected SourceUnavailable, got {err:?}");
        };
        assert!(reasons[0].contains("timed out"));
        assert_eq!(proxy.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_body_is_retried_and_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let proxy = Arc::new(MockSource::new(
            SourceKind::PrimaryProxy,
            MockBehavior::BrokenStream {
                first_chunk: b"half a vid".to_vec(),
            },
        ));
        let service = AcquisitionService::with_parts(
            SourceChain::new(vec![Box::new(ArcSource(proxy.clone()))]),
            Arc::new(MockFilter::succeeding()),
            test_config(dir.path()),
        );

        let err = service
            .acquire("s_abc12345", &Credentials::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AcquireError::SourceUnavailable { .. }));
        assert_eq!(proxy.calls(), 3);
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_missing_temp_dir_is_local_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let proxy = Arc::new(MockSource::streaming(SourceKind::PrimaryProxy, VIDEO, false));
        let service = AcquisitionService::with_parts(
            SourceChain::new(vec![Box::new(ArcSource(proxy.clone()))]),
            Arc::new(MockFilter::succeeding()),
            test_config(&dir.path().join("does-not-exist")),
        );

        let err = service
            .acquire("s_abc12345", &Credentials::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AcquireError::Io(_)), "got {err:?}");
        assert_ne!(err.to_string(), "Video source unavailable");
        assert_eq!(proxy.calls(), 1);
    }

    #[tokio::test]
    async fn test_filter_failure_cleans_both_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let filter = Arc::new(MockFilter::failing());
        let service = AcquisitionService::with_parts(
            SourceChain::new(vec![Box::new(MockSource::streaming(
                SourceKind::StaticCdn,
                VIDEO,
                true,
            ))]),
            filter.clone(),
            test_config(dir.path()),
        );

        let err = service
            .acquire("s_abc12345", &Credentials::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AcquireError::ProcessingFailed));
        assert_eq!(filter.calls(), 1);
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_too_large_after_processing_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.max_bytes = VIDEO.len() as u64;
        let service = AcquisitionService::with_parts(
            SourceChain::new(vec![Box::new(MockSource::streaming(
                SourceKind::StaticCdn,
                VIDEO,
                true,
            ))]),
            // The marker prefix pushes the filtered output over the limit
            Arc::new(MockFilter::succeeding()),
            config,
        );

        let err = service
            .acquire("s_abc12345", &Credentials::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AcquireError::TooLarge { .. }));
        assert!(err.to_string().contains("MB"));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_exact_limit_passes() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.max_bytes = VIDEO.len() as u64;
        let service = AcquisitionService::with_parts(
            SourceChain::new(vec![Box::new(MockSource::streaming(
                SourceKind::PrimaryProxy,
                VIDEO,
                false,
            ))]),
            Arc::new(MockFilter::succeeding()),
            config,
        );

        let artifact = service
            .acquire("s_abc12345", &Credentials::default())
            .await
            .unwrap();
        assert_eq!(artifact.bytes.len(), VIDEO.len());
    }

    #[tokio::test]
    async fn test_concurrent_calls_use_distinct_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = AcquisitionService::with_parts(
            SourceChain::new(vec![Box::new(MockSource::streaming(
                SourceKind::StaticCdn,
                VIDEO,
                true,
            ))]),
            Arc::new(MockFilter::succeeding()),
            test_config(dir.path()),
        );
        let creds = Credentials::default();

        let (a, b) = tokio::join!(
            service.acquire("s_abc12345", &creds),
            service.acquire("s_zzz98765", &creds)
        );

        assert_eq!(a.unwrap().display_name, "s_abc12345_HD.mp4");
        assert_eq!(b.unwrap().display_name, "s_zzz98765_HD.mp4");
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_config_from_defaults() {
        let config = AcquisitionConfig::from_config(&Config::default());
        assert_eq!(config.max_bytes, 50 * 1024 * 1024);
        assert_eq!(config.fetch_retry.max_attempts, 3);
        assert_eq!(config.fetch_retry.delay, Duration::from_secs(2));
        assert_eq!(config.region, CropRegion::default());
    }
}
