use std::time::Duration;

use crate::error::ConfigError;

/// Shortest poll interval a watcher accepts.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Poll interval used when none is given.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// What a single watcher polls for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSpec {
    /// Repository to watch in "owner/repo" format.
    pub repository: String,
    /// Stargazer count at which the crossing hook fires.
    pub target: u64,
    /// How often the count is checked.
    pub interval: Duration,
}

impl WatchSpec {
    pub fn new(repository: impl Into<String>, target: u64, interval: Duration) -> Self {
        Self {
            repository: repository.into(),
            target,
            interval,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repository.trim().is_empty() {
            return Err(ConfigError::EmptyRepository);
        }
        if self.target < 1 {
            return Err(ConfigError::ZeroTarget);
        }
        validate_interval(self.interval)
    }
}

/// Lower threshold at which polling switches to a finer interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApproachSpec {
    pub target: u64,
    pub interval: Duration,
}

impl ApproachSpec {
    /// Build an approach pair from optional parts. Returns `None` unless
    /// both parts are present and non-zero.
    pub fn from_parts(target: Option<u64>, interval: Option<Duration>) -> Option<Self> {
        match (target, interval) {
            (Some(target), Some(interval)) if target > 0 && !interval.is_zero() => {
                Some(Self { target, interval })
            },
            _ => None,
        }
    }

    /// Check this pair against the final watch it leads up to.
    pub fn validate(&self, watch: &WatchSpec) -> Result<(), ConfigError> {
        if self.target < 1 {
            return Err(ConfigError::ZeroTarget);
        }
        if self.target >= watch.target {
            return Err(ConfigError::ApproachNotBelowTarget {
                approach: self.target,
                target: watch.target,
            });
        }
        validate_interval(self.interval)
    }
}

fn validate_interval(interval: Duration) -> Result<(), ConfigError> {
    if interval < MIN_INTERVAL {
        return Err(ConfigError::IntervalTooShort(interval));
    }
    Ok(())
}
