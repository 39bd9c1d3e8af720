//! Server configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outbound HTTP timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// TCP/TLS connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Per-read timeout for manifest and cookie requests in seconds
    pub read_timeout_secs: u64,

    /// Per-read timeout used while resolving station sources in seconds
    pub resolve_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 3,
            read_timeout_secs: 10,
            resolve_timeout_secs: 12,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }
}

/// Relay loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Maximum bytes read from the transcoder per chunk
    pub chunk_size: usize,

    /// End the stream after this many seconds without output
    pub stall_timeout_secs: u64,

    /// Backoff between empty reads in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256 * 1024,
            stall_timeout_secs: 60,
            poll_interval_ms: 50,
        }
    }
}

impl RelayConfig {
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(self.stall_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// External transcoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    /// Path or name of the ffmpeg binary
    pub program: String,

    /// Value passed to `-loglevel`
    pub log_level: String,

    /// Value passed to `-probesize`
    pub probe_size: String,

    /// Value passed to `-rw_timeout` (microseconds)
    pub rw_timeout_us: u64,

    /// Grace period between SIGTERM and SIGKILL in milliseconds
    pub terminate_grace_ms: u64,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            log_level: "warning".to_string(),
            probe_size: "32k".to_string(),
            rw_timeout_us: 15_000_000,
            terminate_grace_ms: 2000,
        }
    }
}

impl TranscoderConfig {
    pub fn terminate_grace(&self) -> Duration {
        Duration::from_millis(self.terminate_grace_ms)
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// User-Agent sent upstream and handed to the transcoder
    pub user_agent: String,

    /// Path of the TOML station table
    pub stations_file: String,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,

    /// Outbound HTTP configuration
    pub http: HttpConfig,

    /// Relay loop configuration
    pub relay: RelayConfig,

    /// Transcoder configuration
    pub transcoder: TranscoderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            user_agent: "VLC/3.0".to_string(),
            stations_file: "stations.toml".to_string(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            http: HttpConfig::default(),
            relay: RelayConfig::default(),
            transcoder: TranscoderConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.user_agent, "VLC/3.0");
        assert_eq!(config.relay.chunk_size, 256 * 1024);
        assert_eq!(config.relay.stall_timeout(), Duration::from_secs(60));
        assert_eq!(config.transcoder.terminate_grace(), Duration::from_secs(2));
    }

    #[test]
    fn test_http_timeouts() {
        let http = HttpConfig::default();
        assert_eq!(http.connect_timeout(), Duration::from_secs(3));
        assert!(http.resolve_timeout() > http.read_timeout());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Default::default()
        };
        assert_eq!(config.socket_addr(), "127.0.0.1:8080");
    }
}
