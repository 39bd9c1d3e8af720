//! HLS variant selector
//!
//! Every call runs in its own cookie session: tokens handed out by the CDN
//! are short-lived and must never be shared between requests.

use regex::Regex;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use reqwest::{redirect, Client, Response};
use std::sync::{Arc, LazyLock};
use url::Url;

use crate::config::HttpConfig;
use crate::error::SelectionError;

use super::manifest;

/// Name of the Akamai auth token cookie
const AUTH_COOKIE_NAME: &str = "hdnea";

static HDNEA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhdnea=[^;]+").expect("valid cookie pattern"));

/// Auth cookie captured while priming an HLS session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCookie {
    pub name: String,
    pub value: String,
}

impl AuthCookie {
    fn from_pair(pair: &str) -> Option<Self> {
        let (name, value) = pair.trim().split_once('=')?;
        Some(Self {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
        })
    }

    /// `name=value`, as sent in a `Cookie` header
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Find the auth cookie in a `Cookie` header value (`a=1; hdnea=...`)
pub fn auth_cookie_from_cookie_header(header: &str) -> Option<AuthCookie> {
    header
        .split(';')
        .filter_map(AuthCookie::from_pair)
        .find(|c| c.name.eq_ignore_ascii_case(AUTH_COOKIE_NAME))
}

/// Scan raw `Set-Cookie` headers for the auth cookie
pub fn auth_cookie_from_set_cookie(headers: &HeaderMap) -> Option<AuthCookie> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|raw| HDNEA_RE.find(raw))
        .and_then(|m| AuthCookie::from_pair(m.as_str()))
}

/// A playable URL plus the transcoder arguments needed to fetch it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub playable_url: String,
    pub header_args: Vec<String>,
}

impl ResolvedSource {
    /// A source that needs no extra request headers
    pub fn direct(url: impl Into<String>) -> Self {
        Self {
            playable_url: url.into(),
            header_args: Vec::new(),
        }
    }
}

/// Picks the best variant of an HLS source
#[derive(Debug, Clone)]
pub struct HlsVariantSelector {
    http: HttpConfig,
    user_agent: String,
}

impl HlsVariantSelector {
    pub fn new(http: HttpConfig, user_agent: impl Into<String>) -> Self {
        Self {
            http,
            user_agent: user_agent.into(),
        }
    }

    /// A client with a fresh cookie jar
    fn session(&self) -> reqwest::Result<(Client, Arc<Jar>)> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .user_agent(self.user_agent.as_str())
            .cookie_provider(Arc::clone(&jar))
            .connect_timeout(self.http.connect_timeout())
            .read_timeout(self.http.read_timeout())
            .redirect(redirect::Policy::limited(10))
            .build()?;
        Ok((client, jar))
    }

    /// Select the playable URL for an HLS manifest URL.
    ///
    /// For a master manifest this is the highest-bandwidth variant, which is
    /// preflighted before being returned. For a media playlist it is the
    /// playlist's own final URL.
    pub async fn select_best(&self, url: &str) -> Result<ResolvedSource, SelectionError> {
        let (client, jar) = self.session()?;

        let cookie = prime_cookie(&client, &jar, url).await;
        if cookie.is_some() {
            tracing::debug!("Primed HLS auth cookie");
        }

        let response = client.get(url).send().await?.error_for_status()?;
        let manifest_url = response.url().to_string();
        let text = response.text().await?;

        let playable_url = if manifest::is_master(&text) {
            let variants = manifest::parse_variants(&text, &manifest_url);
            let best = manifest::select_highest(&variants).ok_or(SelectionError::NoVariants)?;
            tracing::debug!(
                variants = variants.len(),
                bandwidth = best.bandwidth,
                uri = %best.uri,
                "Selected HLS variant"
            );

            let mut preflight = client.get(&best.uri);
            if let Some(cookie) = &cookie {
                preflight = preflight.header(COOKIE, cookie.header_value());
            }
            preflight.send().await?.error_for_status()?;

            best.uri.clone()
        } else {
            manifest_url
        };

        let mut header_args = vec!["-user_agent".to_string(), self.user_agent.clone()];
        if let Some(cookie) = cookie {
            header_args.push("-headers".to_string());
            header_args.push(format!("Cookie: {}", cookie.header_value()));
        }

        Ok(ResolvedSource {
            playable_url,
            header_args,
        })
    }
}

/// Touch `url` so the CDN sets its auth cookie. Never fails.
async fn prime_cookie(client: &Client, jar: &Jar, url: &str) -> Option<AuthCookie> {
    let head = client
        .head(url)
        .send()
        .await
        .ok()
        .filter(|r| r.status().as_u16() < 400);
    let response: Option<Response> = match head {
        Some(r) => Some(r),
        None => client.get(url).send().await.ok(),
    };

    let mut lookup_urls: Vec<Url> = Url::parse(url).into_iter().collect();
    if let Some(r) = &response {
        lookup_urls.push(r.url().clone());
    }
    let from_jar = lookup_urls.iter().find_map(|u| {
        jar.cookies(u)
            .and_then(|v| v.to_str().ok().and_then(auth_cookie_from_cookie_header))
    });
    if from_jar.is_some() {
        return from_jar;
    }

    response.and_then(|r| auth_cookie_from_set_cookie(r.headers()))
}
