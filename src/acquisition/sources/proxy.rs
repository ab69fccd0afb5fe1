//! Download relay client
//!
//! Unauthenticated relay that serves overlay-free media when it has the
//! asset. Anything other than a `200` with a video content type means the
//! relay doesn't have it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::outcome_for_status;
use crate::acquisition::domain::{AcquireError, AssetId, FetchOutcome, MediaStream, SourceKind};
use crate::acquisition::traits::{AttemptContext, SourceStrategy};

/// Relay client
pub struct PrimaryProxyClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl PrimaryProxyClient {
    /// `base_url` is used as a prefix; the identifier is appended to it.
    pub fn new(http_client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            timeout,
        }
    }

    fn url_for(&self, id: &AssetId) -> String {
        format!("{}{}", self.base_url, urlencoding::encode(id.as_str()))
    }

    /// Request the asset from the relay
    pub async fn fetch(&self, id: &AssetId, request_id: &str) -> FetchOutcome {
        let response = match self
            .http_client
            .get(self.url_for(id))
            .header("X-Request-Id", request_id)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return FetchOutcome::Failed(AcquireError::from_transport(e)),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return outcome_for_status(SourceKind::PrimaryProxy, status);
        }

        let is_video = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("video"));

        if !is_video {
            tracing::debug!("Relay answered 200 without a video content type");
            return FetchOutcome::Absent;
        }

        FetchOutcome::Stream(MediaStream::from_response(response, false))
    }
}

#[async_trait]
impl SourceStrategy for PrimaryProxyClient {
    fn kind(&self) -> SourceKind {
        SourceKind::PrimaryProxy
    }

    async fn attempt(&self, id: &AssetId, ctx: &AttemptContext<'_>) -> FetchOutcome {
        self.fetch(id, ctx.request_id).await
    }
}
