use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

use crate::config::WatchSpec;
use crate::error::{ConfigError, HookError, SourceError, WatcherError};
use crate::source::{CounterSource, FetchOutcome, Starrer};
use crate::status::{StatusSnapshot, StatusSource, Tier};

/// Lifecycle of a polling loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopState {
    #[default]
    Idle,
    Polling,
    Paused,
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// What a crossing hook asks the loop to do next.
#[derive(Debug)]
pub enum HookOutcome {
    Continue,
    Stop,
    Failed(HookError),
}

/// Invoked once per upward crossing of a watcher's target.
#[async_trait]
pub trait CrossingHook: Send + Sync {
    async fn on_crossing(&self, watcher: &Watcher) -> HookOutcome;
}

/// Result of a single fetch/evaluate cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    NotModified,
    FetchFailed,
    Observed {
        previous: u64,
        count: u64,
    },
    Crossed {
        previous: u64,
        count: u64,
        stop_requested: bool,
    },
}

/// Why [`Watcher::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// `stop()` was called.
    Stopped,
    /// The crossing hook returned [`HookOutcome::Stop`].
    HookRequestedStop,
}

#[derive(Debug, Default)]
struct Observed {
    count: u64,
    cache_token: Option<String>,
}

/// Polls a repository's stargazer count and fires a hook when it first
/// reaches the target.
///
/// The count starts at zero, so a repository already at or past the target
/// fires the hook on the first tick.
pub struct Watcher {
    spec: WatchSpec,
    source: Arc<dyn CounterSource>,
    observed: RwLock<Observed>,
    hook: RwLock<Option<Arc<dyn CrossingHook>>>,
    control: watch::Sender<LoopState>,
}

impl Watcher {
    pub fn new(spec: WatchSpec, source: Arc<dyn CounterSource>) -> Result<Self, ConfigError> {
        spec.validate()?;
        Ok(Self {
            spec,
            source,
            observed: RwLock::new(Observed::default()),
            hook: RwLock::new(None),
            control: watch::Sender::new(LoopState::Idle),
        })
    }

    pub fn with_hook(mut self, hook: Arc<dyn CrossingHook>) -> Self {
        self.hook = RwLock::new(Some(hook));
        self
    }

    /// Replace the crossing hook, e.g. once the hook needs a handle to this
    /// watcher.
    pub async fn set_hook(&self, hook: Arc<dyn CrossingHook>) {
        *self.hook.write().await = Some(hook);
    }

    pub fn repository(&self) -> &str {
        &self.spec.repository
    }

    pub fn spec(&self) -> &WatchSpec {
        &self.spec
    }

    pub fn state(&self) -> LoopState {
        *self.control.borrow()
    }

    /// Most recently observed stargazer count.
    pub async fn count(&self) -> u64 {
        self.observed.read().await.count
    }

    /// Run the polling loop until stopped. The first fetch happens
    /// immediately, later ones every `interval`.
    pub async fn run(&self) -> Result<RunExit, WatcherError> {
        let mut refused = None;
        self.control.send_if_modified(|state| {
            if *state == LoopState::Idle {
                *state = LoopState::Polling;
                true
            } else {
                refused = Some(*state);
                false
            }
        });
        if let Some(state) = refused {
            return Err(WatcherError::NotIdle(state));
        }

        let span = tracing::info_span!(
            "watcher",
            repo = %self.spec.repository,
            target = self.spec.target
        );
        Ok(self.poll().instrument(span).await)
    }

    async fn poll(&self) -> RunExit {
        tracing::info!(poll_interval = ?self.spec.interval, "Watching for stargazers");

        let mut control = self.control.subscribe();
        let mut ticker = tokio::time::interval(self.spec.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let state = *control.borrow_and_update();
            match state {
                LoopState::Stopped => return RunExit::Stopped,
                LoopState::Paused => {
                    // The sender lives in `self`, so this only fails on drop.
                    if control.changed().await.is_err() {
                        return RunExit::Stopped;
                    }
                    if *control.borrow() == LoopState::Polling {
                        ticker.reset();
                    }
                    continue;
                },
                LoopState::Idle | LoopState::Polling => {},
            }

            tokio::select! {
                _ = ticker.tick() => {},
                changed = control.changed() => {
                    if changed.is_err() {
                        return RunExit::Stopped;
                    }
                    continue;
                },
            }

            if let Tick::Crossed {
                stop_requested: true,
                ..
            } = self.tick().await
            {
                self.stop();
                return RunExit::HookRequestedStop;
            }
        }
    }

    /// Fetch once, record the result, and fire the hook on a crossing.
    pub async fn tick(&self) -> Tick {
        let cache_token = self.observed.read().await.cache_token.clone();
        let fetched = self
            .source
            .fetch(&self.spec.repository, cache_token.as_deref())
            .await;

        let (previous, count) = match fetched {
            Ok(FetchOutcome::NotModified) => {
                tracing::debug!(repo = %self.spec.repository, "Stargazers count not modified");
                return Tick::NotModified;
            },
            Ok(FetchOutcome::Fetched { count, token }) => (self.record(count, token).await, count),
            Err(e) => {
                tracing::error!(
                    repo = %self.spec.repository,
                    error = %e,
                    "Error fetching stargazers count"
                );
                return Tick::FetchFailed;
            },
        };

        if count != previous {
            tracing::info!(
                repo = %self.spec.repository,
                stargazers_count = count,
                prev_stargazers_count = previous,
                "Setting stargazers count"
            );
        }

        if !crossed(previous, count, self.spec.target) {
            return Tick::Observed { previous, count };
        }

        tracing::info!(
            repo = %self.spec.repository,
            target = self.spec.target,
            count,
            "Stargazers target reached"
        );

        let hook = self.hook.read().await.clone();
        let stop_requested = match hook {
            Some(hook) => match hook.on_crossing(self).await {
                HookOutcome::Continue => false,
                HookOutcome::Stop => true,
                HookOutcome::Failed(e) => {
                    tracing::warn!(
                        repo = %self.spec.repository,
                        error = %e,
                        "Error calling stargazer target hook"
                    );
                    false
                },
            },
            None => false,
        };

        Tick::Crossed {
            previous,
            count,
            stop_requested,
        }
    }

    /// Star the watched repository, then refresh the count without the
    /// cached token. Returns the refreshed count, or `None` if the refresh
    /// failed after a successful star.
    pub async fn star(&self, starrer: &dyn Starrer) -> Result<Option<u64>, SourceError> {
        starrer.star(&self.spec.repository).await?;
        tracing::info!(repo = %self.spec.repository, "Starred repository");

        match self.source.fetch(&self.spec.repository, None).await {
            Ok(FetchOutcome::Fetched { count, token }) => {
                self.record(count, token).await;
                Ok(Some(count))
            },
            Ok(FetchOutcome::NotModified) => Ok(Some(self.count().await)),
            Err(e) => {
                tracing::warn!(
                    repo = %self.spec.repository,
                    error = %e,
                    "Unable to fetch updated stargazer count after starring"
                );
                Ok(None)
            },
        }
    }

    /// Suspend ticking, keeping the observed count and token.
    pub fn pause(&self) -> bool {
        self.transition(|state| (state == LoopState::Polling).then_some(LoopState::Paused))
    }

    /// Resume ticking after a pause. The next fetch waits a full interval.
    pub fn unpause(&self) -> bool {
        self.transition(|state| (state == LoopState::Paused).then_some(LoopState::Polling))
    }

    /// Stop the loop for good. An in-flight tick finishes first.
    pub fn stop(&self) -> bool {
        self.transition(|state| (state != LoopState::Stopped).then_some(LoopState::Stopped))
    }

    fn transition(&self, next: impl FnOnce(LoopState) -> Option<LoopState>) -> bool {
        self.control.send_if_modified(|state| match next(*state) {
            Some(to) => {
                *state = to;
                true
            },
            None => false,
        })
    }

    /// Store a fetched count and token, returning the previous count.
    async fn record(&self, count: u64, token: Option<String>) -> u64 {
        let mut observed = self.observed.write().await;
        if let Some(token) = token
            && observed.cache_token.as_deref() != Some(token.as_str())
        {
            observed.cache_token = Some(token);
        }
        std::mem::replace(&mut observed.count, count)
    }

    pub(crate) async fn snapshot_as(&self, tier: Tier) -> StatusSnapshot {
        let count = self.observed.read().await.count;
        StatusSnapshot {
            repository: self.spec.repository.clone(),
            target: self.spec.target,
            interval_secs: self.spec.interval.as_secs(),
            count,
            state: self.state(),
            tier,
        }
    }
}

#[async_trait]
impl StatusSource for Watcher {
    async fn snapshot(&self) -> StatusSnapshot {
        self.snapshot_as(Tier::Single).await
    }
}

/// A crossing happened when the count moved from below the target to at or
/// above it.
pub fn crossed(previous: u64, count: u64, target: u64) -> bool {
    previous < target && count >= target
}
