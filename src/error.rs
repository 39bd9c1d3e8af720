use thiserror::Error;

/// Main error type for the relay server
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Station not found: {0}")]
    StationNotFound(String),

    #[error("Failed to resolve source: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Transcoder error: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors while turning a station source URL into a playable URL
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("no playable URL in {0}")]
    NoPlayableUrl(&'static str),
}

/// Errors while picking an HLS variant
#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("manifest request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no child playlists found in master manifest")]
    NoVariants,
}

/// Transcoder process errors
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transcoder {0} pipe was not captured")]
    MissingPipe(&'static str),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_message_carries_cause() {
        let err = RelayError::from(ResolutionError::NoPlayableUrl("PLS"));
        assert_eq!(
            err.to_string(),
            "Failed to resolve source: no playable URL in PLS"
        );
    }

    #[test]
    fn test_spawn_error_names_program() {
        let err = TranscodeError::Spawn {
            program: "ffmpeg".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().starts_with("failed to spawn ffmpeg"));
    }
}
