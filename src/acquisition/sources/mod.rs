//! Upstream media sources and the ordered fallback chain.
//!
//! Each source lives in its own module with a thin HTTP client; the
//! authenticated API additionally separates its response DTOs from the
//! adapter that picks a download URL out of them.

pub mod api;
pub mod cdn;
pub mod proxy;

use std::time::Duration;

use reqwest::StatusCode;

pub use api::AuthenticatedApiClient;
pub use cdn::StaticCdnClient;
pub use proxy::PrimaryProxyClient;

use super::domain::{AcquireError, AssetId, FetchOutcome, MediaStream, SourceKind};
use super::traits::{AttemptContext, SourceStrategy};
use crate::config::Config;

/// Build the shared HTTP client.
///
/// Media bodies are already compressed, so no transfer compression is
/// negotiated; per-request timeouts are applied by each source.
pub fn build_http_client(user_agent: &str) -> Result<reqwest::Client, AcquireError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(15))
        .build()
        .map_err(|e| AcquireError::Network(format!("failed to build HTTP client: {e}")))
}

/// Outcome for a non-success status: rate limiting and server errors are
/// transient failures, everything else means the source doesn't have it.
pub(crate) fn outcome_for_status(source: SourceKind, status: StatusCode) -> FetchOutcome {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        // Numeric status only: reason phrases like "Service Unavailable"
        // would read as permanent to the retry classifier.
        FetchOutcome::Failed(AcquireError::Network(format!(
            "HTTP {} from {}",
            status.as_u16(),
            source
        )))
    } else {
        tracing::debug!("{} answered HTTP {}", source, status.as_u16());
        FetchOutcome::Absent
    }
}

/// Sources tried strictly in order; the first stream wins.
pub struct SourceChain {
    strategies: Vec<Box<dyn SourceStrategy>>,
}

impl SourceChain {
    pub fn new(strategies: Vec<Box<dyn SourceStrategy>>) -> Self {
        Self { strategies }
    }

    /// Proxy, then authenticated API, then static CDN.
    pub fn from_config(config: &Config) -> Result<Self, AcquireError> {
        let http = build_http_client(&config.endpoints.user_agent)?;
        let timeouts = &config.timeouts;

        Ok(Self::new(vec![
            Box::new(PrimaryProxyClient::new(
                http.clone(),
                &config.endpoints.proxy_base,
                Duration::from_secs(timeouts.proxy_secs),
            )),
            Box::new(AuthenticatedApiClient::new(
                http.clone(),
                &config.endpoints.api_base,
                &config.endpoints.web_origin,
                Duration::from_secs(timeouts.api_secs),
                Duration::from_secs(timeouts.download_secs),
            )),
            Box::new(StaticCdnClient::new(
                http,
                &config.endpoints.cdn_base,
                &config.endpoints.cdn_extension,
                Duration::from_secs(timeouts.cdn_secs),
            )),
        ]))
    }

    pub fn kinds(&self) -> Vec<SourceKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Try each source once, in order.
    ///
    /// With no stream, returns the last transient failure if there was one
    /// (so the caller may retry the whole chain), otherwise
    /// [`AcquireError::SourceUnavailable`] carrying one reason per source.
    pub async fn first_stream(
        &self,
        id: &AssetId,
        ctx: &AttemptContext<'_>,
    ) -> Result<(SourceKind, MediaStream), AcquireError> {
        let mut reasons = Vec::with_capacity(self.strategies.len());
        let mut transient: Option<AcquireError> = None;

        for strategy in &self.strategies {
            let kind = strategy.kind();
            match strategy.attempt(id, ctx).await {
                FetchOutcome::Stream(stream) => {
                    tracing::info!(
                        "{}: using {} (needs processing: {})",
                        id,
                        kind,
                        stream.needs_processing
                    );
                    return Ok((kind, stream));
                }
                FetchOutcome::Absent => {
                    tracing::debug!("{}: {} does not have it", id, kind);
                    reasons.push(format!("{}: not available", kind));
                }
                FetchOutcome::Failed(err) => {
                    tracing::debug!("{}: {} failed: {}", id, kind, err);
                    reasons.push(format!("{}: {}", kind, err));
                    if err.is_retryable() {
                        transient = Some(err);
                    }
                }
            }
        }

        if let Some(err) = transient {
            return Err(err);
        }

        tracing::warn!("{}: all sources exhausted: {}", id, reasons.join("; "));
        Err(AcquireError::SourceUnavailable { reasons })
    }
}
