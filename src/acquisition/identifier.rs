//! Asset identifier extraction.
//!
//! Accepts either a full share URL (`https://sora.chatgpt.com/p/s_...`) or a
//! bare code. Pure function, no I/O.

use std::sync::LazyLock;

use regex::Regex;

use super::domain::AssetId;

/// `s_` prefix followed by at least 8 of `[0-9A-Za-z_-]`
static ASSET_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"s_[0-9A-Za-z_-]{8,}").expect("valid identifier pattern"));

/// Extract the first identifier found in `input`, or `None` if there is none.
pub fn extract(input: &str) -> Option<AssetId> {
    ASSET_ID_PATTERN
        .find(input)
        .map(|m| AssetId::new(m.as_str()))
}
