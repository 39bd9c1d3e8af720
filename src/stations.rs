//! Station table
//!
//! Stations are loaded once at startup from a TOML file mapping a station
//! name to its source URL and requested output:
//!
//! ```toml
//! [radio1]
//! url = "https://example.org/live.pls"
//! format = "flac"
//! bits = 24
//! rate = 48000
//! channels = 2
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::{RelayError, Result};

/// Output container/codec family requested by a station
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputFormat {
    Mp4,
    MpegTs,
    #[default]
    Adts,
    Wav,
    Flac,
    /// Unrecognized name, muxed like ADTS
    Other(String),
}

impl OutputFormat {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Self::Mp4,
            "mpegts" => Self::MpegTs,
            "adts" => Self::Adts,
            "wav" => Self::Wav,
            "flac" => Self::Flac,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Mp4 => "mp4",
            Self::MpegTs => "mpegts",
            Self::Adts => "adts",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Other(name) => name,
        }
    }

    /// MIME type served for this format
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Mp4 => "audio/mp4",
            Self::MpegTs => "video/MP2T",
            Self::Adts => "audio/aac",
            Self::Wav => "audio/wav",
            Self::Flac => "audio/flac",
            Self::Other(_) => "application/octet-stream",
        }
    }
}

impl From<String> for OutputFormat {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<OutputFormat> for String {
    fn from(f: OutputFormat) -> Self {
        f.as_str().to_string()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured station
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationSpec {
    /// Source URL: stream, redirect, PLS, M3U or HLS manifest
    pub url: String,

    #[serde(default, alias = "fmt")]
    pub format: OutputFormat,

    /// PCM bit depth for wav/flac (16 or 24)
    #[serde(default, deserialize_with = "lenient_u32")]
    pub bits: Option<u32>,

    /// Output sample rate in Hz
    #[serde(default, deserialize_with = "lenient_u32")]
    pub rate: Option<u32>,

    /// Output channel count
    #[serde(default, deserialize_with = "lenient_u32")]
    pub channels: Option<u32>,
}

/// Accept `24` or `"24"`. Text that is not a number reads as unset, so the
/// transcoder falls back to its defaults.
fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u32),
        Text(String),
    }

    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

/// Read-only station lookup
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    stations: BTreeMap<String, StationSpec>,
}

impl StationRegistry {
    pub fn new(stations: BTreeMap<String, StationSpec>) -> Self {
        Self { stations }
    }

    /// Parse a station table from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let stations: BTreeMap<String, StationSpec> = toml::from_str(content)
            .map_err(|e| RelayError::Config(format!("invalid station table: {}", e)))?;
        Ok(Self::new(stations))
    }

    /// Load the station table from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn get(&self, name: &str) -> Option<&StationSpec> {
        self.stations.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StationSpec)> {
        self.stations.iter()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
