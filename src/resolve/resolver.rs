//! Station source resolver

use reqwest::{redirect, Client};
use url::Url;

use crate::config::HttpConfig;
use crate::error::ResolutionError;

use super::playlist::{first_url_from_m3u, first_url_from_pls};

/// Upper bound on redirect hops for any upstream request
const MAX_REDIRECTS: usize = 10;

/// Kind of indirection a source URL represents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `.pls` playlist (or `format=pls` in the query)
    Pls,
    /// `.m3u` playlist
    M3u,
    /// `.m3u8` HLS manifest
    Hls,
    /// Anything else, usually an endless stream
    Direct,
}

impl SourceKind {
    /// Classify a URL by its path suffix and query
    pub fn classify(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        let path = match Url::parse(&lower) {
            Ok(u) => u.path().to_string(),
            Err(_) => lower.split(['?', '#']).next().unwrap_or_default().to_string(),
        };

        if path.ends_with(".pls") || lower.contains("format=pls") {
            SourceKind::Pls
        } else if path.ends_with(".m3u") {
            SourceKind::M3u
        } else if path.ends_with(".m3u8") {
            SourceKind::Hls
        } else {
            SourceKind::Direct
        }
    }
}

/// Build an outbound client that follows redirects and sends `user_agent`.
pub fn build_client(
    http: &HttpConfig,
    user_agent: &str,
    read_timeout: std::time::Duration,
) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(http.connect_timeout())
        .read_timeout(read_timeout)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        .build()
}

/// Resolves one layer of indirection (redirects, PLS, M3U)
#[derive(Clone)]
pub struct SourceResolver {
    client: Client,
}

impl SourceResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolve `url` to the URL that should be handed to the transcoder.
    ///
    /// Playlist bodies are downloaded; stream bodies never are.
    pub async fn resolve(&self, url: &str) -> Result<String, ResolutionError> {
        let parsed =
            Url::parse(url).map_err(|e| ResolutionError::InvalidUrl(format!("{}: {}", url, e)))?;
        let kind = SourceKind::classify(url);
        tracing::debug!(url = %parsed, ?kind, "Resolving source");

        let resolved = match kind {
            SourceKind::Pls => {
                let body = self.fetch_text(parsed).await?;
                first_url_from_pls(&body)
                    .map(str::to_string)
                    .ok_or(ResolutionError::NoPlayableUrl("PLS"))?
            }
            SourceKind::M3u => {
                let body = self.fetch_text(parsed).await?;
                first_url_from_m3u(&body)
                    .map(str::to_string)
                    .ok_or(ResolutionError::NoPlayableUrl("M3U"))?
            }
            SourceKind::Hls => {
                let response = self.client.get(parsed).send().await?.error_for_status()?;
                response.url().to_string()
            }
            SourceKind::Direct => self.probe_final_url(parsed).await?,
        };

        tracing::debug!(resolved = %resolved, "Source resolved");
        Ok(resolved)
    }

    async fn fetch_text(&self, url: Url) -> Result<String, ResolutionError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Learn where a stream URL ends up without reading its body.
    async fn probe_final_url(&self, url: Url) -> Result<String, ResolutionError> {
        match self
            .client
            .head(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(response) => return Ok(response.url().to_string()),
            Err(e) => tracing::debug!("HEAD probe failed, falling back to GET: {}", e),
        }

        // The response is dropped before its body is polled, which closes
        // the connection instead of draining an endless stream.
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.url().to_string())
    }
}
