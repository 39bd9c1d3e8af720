//! HLS manifest parsing
//!
//! Only what variant selection needs: line classification, attribute lists
//! and `#EXT-X-STREAM-INF` entries of master manifests.

use url::Url;

/// Tag marking a variant entry in a master manifest
pub const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF";

/// Bandwidth used for variants that do not declare one
pub const UNKNOWN_BANDWIDTH: i64 = -1;

/// A single manifest line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestLine<'a> {
    Blank,
    /// `#EXT...` tag, with the text after the first `:` if any
    Tag {
        name: &'a str,
        value: Option<&'a str>,
    },
    /// Any other `#` line
    Comment(&'a str),
    Uri(&'a str),
}

impl<'a> ManifestLine<'a> {
    pub fn classify(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            ManifestLine::Blank
        } else if line
            .get(..4)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("#EXT"))
        {
            match line.split_once(':') {
                Some((name, value)) => ManifestLine::Tag {
                    name,
                    value: Some(value),
                },
                None => ManifestLine::Tag {
                    name: line,
                    value: None,
                },
            }
        } else if line.starts_with('#') {
            ManifestLine::Comment(line)
        } else {
            ManifestLine::Uri(line)
        }
    }

    fn is_stream_inf(&self) -> bool {
        matches!(self, ManifestLine::Tag { name, .. } if name.eq_ignore_ascii_case(STREAM_INF_TAG))
    }
}

/// Parse an attribute list such as `BANDWIDTH=128000,CODECS="mp4a.40.2,avc1"`.
///
/// Quoted values may contain commas; quotes are stripped.
pub fn parse_attributes(list: &str) -> Vec<(&str, &str)> {
    let mut attrs = Vec::new();
    let mut rest = list;

    while let Some((key, after)) = rest.split_once('=') {
        let (value, remainder) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.split_once('"') {
                Some((value, tail)) => (value, tail.split_once(',').map_or("", |(_, r)| r)),
                None => (quoted, ""),
            },
            None => after.split_once(',').unwrap_or((after, "")),
        };
        attrs.push((key.trim(), value.trim()));
        rest = remainder;
    }

    attrs
}

/// One variant stream of a master manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestVariant {
    pub bandwidth: i64,
    pub uri: String,
}

/// Whether the manifest text is a master manifest
pub fn is_master(text: &str) -> bool {
    text.contains(STREAM_INF_TAG)
}

/// Resolve a child playlist reference against the master manifest URL.
///
/// Every non-absolute reference, including one with a leading `/`, is
/// appended to the directory containing the master. The master's query
/// never carries over to the child.
pub fn resolve_child(master_url: &str, child: &str) -> String {
    let lower = child.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return child.to_string();
    }
    let relative = child.trim_start_matches('/');

    match Url::parse(master_url) {
        Ok(mut base) => {
            let dir = base
                .path()
                .rsplit_once('/')
                .map_or(String::new(), |(dir, _)| dir.to_string());
            base.set_path(&format!("{}/", dir));
            base.set_query(None);
            base.set_fragment(None);
            match base.join(relative) {
                Ok(url) => url.to_string(),
                Err(_) => format!("{}{}", base, relative),
            }
        }
        Err(_) => {
            let base = master_url.split(['?', '#']).next().unwrap_or(master_url);
            let dir = base.rsplit_once('/').map_or(base, |(dir, _)| dir);
            format!("{}/{}", dir, relative)
        }
    }
}

/// Collect every variant of a master manifest.
///
/// The child URI of a `#EXT-X-STREAM-INF` entry is the next line that is
/// neither blank nor a comment. Entries with no such line are dropped.
pub fn parse_variants(text: &str, master_url: &str) -> Vec<ManifestVariant> {
    let lines: Vec<ManifestLine<'_>> = text.lines().map(ManifestLine::classify).collect();
    let mut variants = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !line.is_stream_inf() {
            continue;
        }

        let bandwidth = match line {
            // Exact key only, so AVERAGE-BANDWIDTH never stands in for BANDWIDTH.
            ManifestLine::Tag { value: Some(v), .. } => parse_attributes(v)
                .into_iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("BANDWIDTH"))
                .and_then(|(_, value)| value.parse::<i64>().ok())
                .unwrap_or(UNKNOWN_BANDWIDTH),
            _ => UNKNOWN_BANDWIDTH,
        };

        let child = lines[i + 1..].iter().find_map(|l| match l {
            ManifestLine::Uri(uri) => Some(*uri),
            _ => None,
        });

        if let Some(uri) = child {
            variants.push(ManifestVariant {
                bandwidth,
                uri: resolve_child(master_url, uri),
            });
        }
    }

    variants
}

/// Highest-bandwidth variant; the earliest one wins a tie.
pub fn select_highest(variants: &[ManifestVariant]) -> Option<&ManifestVariant> {
    let mut best: Option<&ManifestVariant> = None;
    for variant in variants {
        match best {
            Some(b) if variant.bandwidth <= b.bandwidth => {}
            _ => best = Some(variant),
        }
    }
    best
}
