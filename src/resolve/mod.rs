//! Source resolution
//!
//! Turns a station's configured URL into a concrete URL:
//! - Redirect chains are followed without reading stream bodies
//! - PLS and M3U playlists are fetched and their first stream URL extracted
//! - HLS manifests are only followed to their final location; variant
//!   selection happens in [`crate::hls`]

pub mod playlist;
pub mod resolver;

pub use resolver::SourceResolver;
