//! Authenticated backend API client
//!
//! Looks up the post for an asset with the caller's bearer token and
//! downloads the best URL it advertises.
//!
//! ## Reliability
//!
//! This source depends on undocumented backend internals, so it never fails
//! the chain: a missing token skips it without any request, and every
//! network, status or parse problem is logged and reported as
//! [`FetchOutcome::Absent`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, COOKIE, ORIGIN, REFERER};

use super::{adapter, dto};
use crate::acquisition::domain::{
    AcquireError, AssetId, Credentials, FetchOutcome, MediaStream, SourceKind,
};
use crate::acquisition::traits::{AttemptContext, SourceStrategy};

/// Backend API client
pub struct AuthenticatedApiClient {
    http_client: reqwest::Client,
    base_url: String,
    web_origin: String,
    api_timeout: Duration,
    download_timeout: Duration,
}

impl AuthenticatedApiClient {
    pub fn new(
        http_client: reqwest::Client,
        base_url: impl Into<String>,
        web_origin: impl Into<String>,
        api_timeout: Duration,
        download_timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            web_origin: web_origin.into(),
            api_timeout,
            download_timeout,
        }
    }

    /// Look up and open the asset, swallowing every error as `Absent`.
    pub async fn fetch(&self, id: &AssetId, credentials: &Credentials) -> FetchOutcome {
        if !credentials.has_token() {
            tracing::debug!("No bearer token configured, skipping API source");
            return FetchOutcome::Absent;
        }

        match self.try_fetch(id, credentials).await {
            Ok(Some(stream)) => FetchOutcome::Stream(stream),
            Ok(None) => FetchOutcome::Absent,
            Err(e) => {
                tracing::debug!("API source failed for {}: {}", id, e);
                FetchOutcome::Absent
            }
        }
    }

    async fn try_fetch(
        &self,
        id: &AssetId,
        credentials: &Credentials,
    ) -> Result<Option<MediaStream>, AcquireError> {
        let post = self.lookup_post(id, credentials).await?;

        let Some(choice) = adapter::select_download(&post) else {
            tracing::debug!("Post for {} has no downloadable attachment", id);
            return Ok(None);
        };

        let response = self
            .http_client
            .get(&choice.url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(AcquireError::from_transport)?;

        if response.status() != StatusCode::OK {
            tracing::debug!("Attachment download answered HTTP {}", response.status().as_u16());
            return Ok(None);
        }

        Ok(Some(MediaStream::from_response(
            response,
            choice.needs_processing,
        )))
    }

    /// Fetch and parse the post document
    async fn lookup_post(
        &self,
        id: &AssetId,
        credentials: &Credentials,
    ) -> Result<dto::PostResponse, AcquireError> {
        let mut request = self
            .http_client
            .get(format!("{}{}", self.base_url, id))
            .timeout(self.api_timeout)
            .header(ACCEPT, "application/json")
            .header(REFERER, format!("{}/p/{}", self.web_origin, id))
            .header(ORIGIN, &self.web_origin)
            .header(AUTHORIZATION, format!("Bearer {}", credentials.bearer_token.trim()));

        if !credentials.cookie_header.trim().is_empty() {
            request = request.header(COOKIE, credentials.cookie_header.trim());
        }

        let response = request.send().await.map_err(AcquireError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::Network(format!(
                "HTTP {} from post lookup",
                status.as_u16()
            )));
        }

        response
            .json::<dto::PostResponse>()
            .await
            .map_err(|e| AcquireError::Network(format!("unexpected post body: {e}")))
    }
}

#[async_trait]
impl SourceStrategy for AuthenticatedApiClient {
    fn kind(&self) -> SourceKind {
        SourceKind::AuthenticatedApi
    }

    async fn attempt(&self, id: &AssetId, ctx: &AttemptContext<'_>) -> FetchOutcome {
        self.fetch(id, ctx.credentials).await
    }
}
