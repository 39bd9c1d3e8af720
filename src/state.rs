//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Server configuration
//! - The station table
//! - The shared outbound HTTP client used for source resolution

use reqwest::Client;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::resolve::resolver::build_client;
use crate::stations::{StationRegistry, StationSpec};

/// Application state shared across all handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,

    /// Configured stations, keyed by name
    pub stations: StationRegistry,

    /// Pooled client for redirect and playlist resolution. Holds no cookies;
    /// HLS selection builds its own per-request session.
    pub http_client: Client,
}

impl AppState {
    /// Create a new AppState with the given configuration and stations
    pub fn new(config: ServerConfig, stations: StationRegistry) -> Result<Self> {
        let http_client = build_client(
            &config.http,
            &config.user_agent,
            config.http.resolve_timeout(),
        )?;

        Ok(Self {
            config,
            stations,
            http_client,
        })
    }

    /// Look up a station by name
    pub fn station(&self, name: &str) -> Option<&StationSpec> {
        self.stations.get(name)
    }
}
