use std::path::PathBuf;

use thiserror::Error;

use stargazer_core::{ConfigError, WatcherError};
use stargazer_twilio::TwilioSetupError;

/// Anything that stops the binary from starting or keeps it from running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to read config file {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("listen_addr {0:?} is not a valid address (expected host:port or :port)")]
    InvalidListenAddr(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Twilio(#[from] TwilioSetupError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to bind status server on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("status server error: {0}")]
    Serve(std::io::Error),

    #[error(transparent)]
    Watcher(#[from] WatcherError),
}

impl ServerError {
    /// Whether the error came from bad user input, in which case usage is
    /// worth printing.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::InvalidListenAddr(_) | Self::Config(_) | Self::Twilio(_)
        )
    }
}
