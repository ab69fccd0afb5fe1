//! Backend post API Data Transfer Objects
//!
//! Only the fields we read are modelled; everything is optional because the
//! backend omits keys freely depending on account tier and asset state.

use serde::{Deserialize, Serialize};

/// Top-level response of the post endpoint
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PostResponse {
    pub post: Option<Post>,
}

/// A published post
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Post {
    pub attachments: Vec<Attachment>,
}

/// One media attachment of a post
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Attachment {
    pub download_urls: Option<DownloadUrls>,
    /// Raw (overlay) download URL
    pub downloadable_url: Option<String>,
    pub encodings: Option<Encodings>,
}

/// Pre-signed download links
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DownloadUrls {
    /// Pre-cleaned download, only present for some accounts
    pub no_watermark: Option<String>,
    pub watermark: Option<String>,
}

/// Available encodings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Encodings {
    pub source: Option<Encoding>,
}

/// A single encoding
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Encoding {
    pub path: Option<String>,
}
