use std::time::Duration;

use thiserror::Error;

use crate::watcher::LoopState;

/// Invalid watch parameters. Raised before any watcher exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("repository must be specified")]
    EmptyRepository,

    #[error("target stargazers must be at least 1")]
    ZeroTarget,

    #[error("minimum interval is one second, got {0:?}")]
    IntervalTooShort(Duration),

    #[error("approach threshold {approach} must be below target {target}")]
    ApproachNotBelowTarget { approach: u64, target: u64 },
}

/// Failure talking to the repository host. Always treated as transient by
/// the polling loop.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("error reaching {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    #[error("unexpected response {status} from {endpoint}")]
    UnexpectedStatus { status: u16, endpoint: String },

    #[error("error decoding response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("no credential configured for {0}")]
    MissingCredential(&'static str),
}

/// Failure sending a text message.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("error reaching SMS API: {0}")]
    Transport(String),

    #[error("SMS API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("bad message status: {0}")]
    BadStatus(String),

    #[error("error decoding SMS API response: {0}")]
    Decode(String),
}

/// Failure inside a crossing hook. Reported, never fatal to the loop.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("sending notification failed: {0}")]
    Notify(#[from] NotifyError),

    #[error("starring repository failed: {0}")]
    Star(#[from] SourceError),
}

/// Misuse of a watcher's lifecycle.
#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("watcher cannot start from the {0} state")]
    NotIdle(LoopState),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
