//! Static CDN client
//!
//! Last resort: fetches the asset by a constructed URL. Content from here
//! always carries the overlay.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::outcome_for_status;
use crate::acquisition::domain::{AcquireError, AssetId, FetchOutcome, MediaStream, SourceKind};
use crate::acquisition::traits::{AttemptContext, SourceStrategy};

/// Static CDN client
pub struct StaticCdnClient {
    http_client: reqwest::Client,
    base_url: String,
    extension: String,
    timeout: Duration,
}

impl StaticCdnClient {
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        extension: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            extension: extension.into(),
            timeout,
        }
    }

    fn url_for(&self, id: &AssetId) -> String {
        format!("{}{}.{}", self.base_url, id, self.extension)
    }

    /// Fetch the asset by its constructed URL
    pub async fn fetch(&self, id: &AssetId) -> FetchOutcome {
        let response = match self
            .http_client
            .get(self.url_for(id))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return FetchOutcome::Failed(AcquireError::from_transport(e)),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return outcome_for_status(SourceKind::StaticCdn, status);
        }

        FetchOutcome::Stream(MediaStream::from_response(response, true))
    }
}

#[async_trait]
impl SourceStrategy for StaticCdnClient {
    fn kind(&self) -> SourceKind {
        SourceKind::StaticCdn
    }

    async fn attempt(&self, id: &AssetId, _ctx: &AttemptContext<'_>) -> FetchOutcome {
        self.fetch(id).await
    }
}
