//! Converts post API DTOs into a download decision.

use super::dto;

/// Which URL to download and whether its content still carries the overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadChoice {
    pub url: String,
    pub needs_processing: bool,
}

/// Pick a download URL from the first attachment.
///
/// Prefers the pre-cleaned link; otherwise falls back to `downloadable_url`,
/// the watermarked link, then the source encoding path, all of which need
/// processing.
pub fn select_download(response: &dto::PostResponse) -> Option<DownloadChoice> {
    let attachment = response.post.as_ref()?.attachments.first()?;
    let urls = attachment.download_urls.as_ref();

    if let Some(url) = non_empty(urls.and_then(|u| u.no_watermark.as_deref())) {
        return Some(DownloadChoice {
            url,
            needs_processing: false,
        });
    }

    let fallback = non_empty(attachment.downloadable_url.as_deref())
        .or_else(|| non_empty(urls.and_then(|u| u.watermark.as_deref())))
        .or_else(|| {
            non_empty(
                attachment
                    .encodings
                    .as_ref()
                    .and_then(|e| e.source.as_ref())
                    .and_then(|s| s.path.as_deref()),
            )
        })?;

    Some(DownloadChoice {
        url: fallback,
        needs_processing: true,
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).map(str::to_string)
}
