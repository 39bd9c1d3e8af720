//! HLS variant selection
//!
//! This module handles HLS sources after resolution:
//! - Detecting HLS URLs
//! - Priming the `hdnea` auth cookie some CDNs require
//! - Picking the highest-bandwidth variant of a master manifest
//! - Producing the header arguments the transcoder needs to fetch it

pub mod manifest;
pub mod selector;

pub use selector::{HlsVariantSelector, ResolvedSource};

use regex::Regex;
use std::sync::LazyLock;

static HLS_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.m3u8($|\?)").expect("valid HLS URL pattern")
});

/// Whether a resolved URL points at an HLS manifest
pub fn is_hls_url(url: &str) -> bool {
    HLS_URL_RE.is_match(url)
}
