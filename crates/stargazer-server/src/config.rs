use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use stargazer_core::{ApproachSpec, DEFAULT_INTERVAL, WatchSpec};
use stargazer_github::GitHubConfig;
use stargazer_twilio::TwilioConfig;

use crate::cli::Cli;
use crate::error::ServerError;

pub const DEFAULT_CONFIG_FILE: &str = "stargazer.toml";

pub const ENV_TWILIO_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const ENV_TWILIO_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
pub const ENV_TWILIO_PHONE_NUMBER: &str = "TWILIO_PHONE_NUMBER";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_LISTEN_ADDR: &str = "STARGAZER_LISTEN_ADDR";

/// Top-level configuration, loaded from `stargazer.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StargazerConfig {
    /// Address of the JSON status server.
    pub listen_addr: String,
    pub watch: WatchConfig,
    pub github: GitHubConfig,
    pub twilio: TwilioConfig,
}

impl Default for StargazerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:4040".to_string(),
            watch: WatchConfig::default(),
            github: GitHubConfig::default(),
            twilio: TwilioConfig::default(),
        }
    }
}

/// What to watch and what to do when the target is reached.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Repository in "owner/repo" format.
    pub repository: String,
    pub target: u64,
    #[serde(deserialize_with = "de_duration")]
    pub interval: Duration,
    pub approach_target: Option<u64>,
    #[serde(deserialize_with = "de_opt_duration")]
    pub approach_interval: Option<Duration>,
    /// Star the repository when the target is crossed.
    pub star: bool,
    /// Stop watching and exit once the target is crossed.
    pub exit_after: bool,
    /// Phone number to text when the target is crossed.
    pub phone: Option<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            target: 0,
            interval: DEFAULT_INTERVAL,
            approach_target: None,
            approach_interval: None,
            star: true,
            exit_after: false,
            phone: None,
        }
    }
}

/// Validated watch parameters, ready to build watchers from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPlan {
    pub watch: WatchSpec,
    pub approach: Option<ApproachSpec>,
}

impl StargazerConfig {
    /// Load config from `path`, or from `stargazer.toml` if it exists.
    /// An explicit path that cannot be read is an error; a missing default
    /// file just means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ServerError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                return Ok(Self::default());
            },
            Err(source) => return Err(ServerError::ReadConfig { path, source }),
        };

        let config = toml::from_str::<StargazerConfig>(&content)
            .map_err(|source| ServerError::ParseConfig {
                path: path.clone(),
                source,
            })?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides using `lookup`. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(addr) = var(ENV_LISTEN_ADDR) {
            self.listen_addr = addr;
        }
        if let Some(token) = var(ENV_GITHUB_TOKEN) {
            self.github.token = Some(token);
        }
        if let Some(sid) = var(ENV_TWILIO_ACCOUNT_SID) {
            self.twilio.account_sid = Some(sid);
        }
        if let Some(token) = var(ENV_TWILIO_AUTH_TOKEN) {
            self.twilio.auth_token = Some(token);
        }
        if let Some(number) = var(ENV_TWILIO_PHONE_NUMBER) {
            self.twilio.sender = Some(number);
        }
    }

    /// Apply command-line overrides. Flags win over file and environment.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(addr) = &cli.addr {
            self.listen_addr = addr.clone();
        }
        if let Some(repo) = &cli.repo {
            self.watch.repository = repo.clone();
        }
        if let Some(target) = cli.target {
            self.watch.target = target;
        }
        if let Some(interval) = cli.interval {
            self.watch.interval = interval;
        }
        if let Some(approach) = cli.approach {
            self.watch.approach_target = Some(approach);
        }
        if let Some(interval) = cli.approach_interval {
            self.watch.approach_interval = Some(interval);
        }
        if let Some(phone) = &cli.phone {
            self.watch.phone = Some(phone.clone());
        }
        if let Some(sender) = &cli.sender {
            self.twilio.sender = Some(sender.clone());
        }
        if cli.no_star {
            self.watch.star = false;
        } else if cli.star {
            self.watch.star = true;
        }
        if cli.exit_after {
            self.watch.exit_after = true;
        }
    }

    /// Address to bind the status server on. A bare `:port` listens on
    /// every interface.
    pub fn bind_addr(&self) -> String {
        if self.listen_addr.starts_with(':') {
            format!("0.0.0.0{}", self.listen_addr)
        } else {
            self.listen_addr.clone()
        }
    }

    /// Check everything needed to start, returning the watch plan.
    pub fn validate(&self) -> Result<WatchPlan, ServerError> {
        if !is_listen_addr(&self.bind_addr()) {
            return Err(ServerError::InvalidListenAddr(self.listen_addr.clone()));
        }

        let watch = WatchSpec::new(
            self.watch.repository.trim(),
            self.watch.target,
            self.watch.interval,
        );
        watch.validate()?;

        let approach =
            ApproachSpec::from_parts(self.watch.approach_target, self.watch.approach_interval);
        if let Some(ref approach) = approach {
            approach.validate(&watch)?;
        }

        Ok(WatchPlan { watch, approach })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Secs(u64),
    Text(String),
}

impl RawDuration {
    fn into_duration<E: serde::de::Error>(self) -> Result<Duration, E> {
        match self {
            Self::Secs(secs) => Ok(Duration::from_secs(secs)),
            Self::Text(text) => parse_duration(&text).map_err(E::custom),
        }
    }
}

fn de_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    RawDuration::deserialize(deserializer)?.into_duration()
}

fn de_opt_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error> {
    Option::<RawDuration>::deserialize(deserializer)?
        .map(RawDuration::into_duration)
        .transpose()
}

/// Either an IP socket address or `host:port`.
fn is_listen_addr(addr: &str) -> bool {
    if addr.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match addr.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !host.contains(':') && port.parse::<u16>().is_ok()
        },
        None => false,
    }
}

/// Parse durations like `45`, `500ms`, `30s`, `1m`, `2h`, or `1m30s`.
/// A bare number is seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(input).map_err(|e| format!("invalid duration {input:?}: {e}"))
}
