//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

use crate::config::ServerConfig;

/// Live radio relay: resolves station sources and re-muxes them through ffmpeg.
#[derive(Parser, Debug, Clone)]
#[command(name = "station-relay")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "RELAY_CONFIG", default_value = "config.toml")]
    pub config: PathBuf,

    /// Station table (TOML), overrides the config file
    #[arg(short, long, env = "STATIONS_FILE")]
    pub stations: Option<String>,

    /// Port to listen on, overrides the config file
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// User-Agent for upstream requests, overrides the config file
    #[arg(long, env = "UA")]
    pub user_agent: Option<String>,

    /// Write a default configuration file to the --config path and exit
    #[arg(long)]
    pub write_default_config: bool,
}

impl Args {
    /// Apply command-line and environment overrides on top of `config`
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(stations) = &self.stations {
            config.stations_file = stations.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let args = Args::parse_from([
            "station-relay",
            "--stations",
            "/etc/relay/stations.toml",
            "--port",
            "9000",
            "--user-agent",
            "Winamp/5.0",
        ]);
        let mut config = ServerConfig::default();
        args.apply(&mut config);

        assert_eq!(config.stations_file, "/etc/relay/stations.toml");
        assert_eq!(config.port, 9000);
        assert_eq!(config.user_agent, "Winamp/5.0");
    }

    #[test]
    fn test_config_path_flag() {
        let args = Args::parse_from(["station-relay", "--config", "relay.toml"]);
        assert_eq!(args.config, PathBuf::from("relay.toml"));
        assert!(!args.write_default_config);
    }
}
