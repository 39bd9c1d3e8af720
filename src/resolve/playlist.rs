//! PLS and M3U playlist scanning

/// One `key=value` entry of a PLS body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlsEntry<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

impl PlsEntry<'_> {
    /// Whether this is a `File<N>` entry (case-insensitive, N optional)
    pub fn is_file(&self) -> bool {
        self.key
            .get(..4)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("file"))
            && self.key[4..].bytes().all(|b| b.is_ascii_digit())
    }
}

/// Iterate over the `key=value` lines of a PLS body.
///
/// Section headers, blank lines and lines without `=` are skipped.
pub fn pls_entries(text: &str) -> impl Iterator<Item = PlsEntry<'_>> {
    text.lines().filter_map(|line| {
        let line = line.trim();
        if line.starts_with('[') {
            return None;
        }
        let (key, value) = line.split_once('=')?;
        Some(PlsEntry {
            key: key.trim(),
            value: value.trim(),
        })
    })
}

fn is_http(s: &str) -> bool {
    s.get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("http"))
}

/// First `File<N>=` value of a PLS body that is an HTTP URL
pub fn first_url_from_pls(text: &str) -> Option<&str> {
    pls_entries(text)
        .find(|e| e.is_file() && is_http(e.value))
        .map(|e| e.value)
}

/// First non-comment line of an M3U body that is an HTTP URL
pub fn first_url_from_m3u(text: &str) -> Option<&str> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#') && is_http(line))
}
