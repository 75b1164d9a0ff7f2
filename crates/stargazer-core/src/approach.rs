//! Two-tier watching: poll on a coarse interval until an approach threshold
//! is reached, then hand off to a watcher on a finer interval for the real
//! target.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::{ApproachSpec, WatchSpec};
use crate::error::{ConfigError, WatcherError};
use crate::source::CounterSource;
use crate::status::{StatusSnapshot, StatusSource, Tier};
use crate::watcher::{CrossingHook, HookOutcome, RunExit, Watcher};

struct Active {
    watcher: Arc<Watcher>,
    tier: Tier,
    stopped: bool,
}

/// Owns whichever watcher is currently polling and performs the swap from
/// the approach tier to the final tier. Only one loop runs at a time.
pub struct ApproachWatcher {
    final_spec: WatchSpec,
    source: Arc<dyn CounterSource>,
    final_hook: Arc<dyn CrossingHook>,
    active: RwLock<Active>,
}

/// Hook for the approach tier: pause and ask the loop to stop so the
/// composite can start the final tier.
struct Handoff;

#[async_trait]
impl CrossingHook for Handoff {
    async fn on_crossing(&self, watcher: &Watcher) -> HookOutcome {
        tracing::info!(
            repo = %watcher.repository(),
            approach_target = watcher.spec().target,
            "Reached approaching threshold, switching to final watcher"
        );
        watcher.pause();
        HookOutcome::Stop
    }
}

impl ApproachWatcher {
    /// `watch.interval` is the coarse interval used until `approach.target`
    /// is reached; `approach.interval` is used afterwards.
    pub fn new(
        watch: WatchSpec,
        approach: ApproachSpec,
        source: Arc<dyn CounterSource>,
        final_hook: Arc<dyn CrossingHook>,
    ) -> Result<Self, ConfigError> {
        watch.validate()?;
        approach.validate(&watch)?;

        let coarse = WatchSpec {
            target: approach.target,
            ..watch.clone()
        };
        let coarse = Watcher::new(coarse, Arc::clone(&source))?.with_hook(Arc::new(Handoff));
        let final_spec = WatchSpec {
            interval: approach.interval,
            ..watch
        };

        Ok(Self {
            final_spec,
            source,
            final_hook,
            active: RwLock::new(Active {
                watcher: Arc::new(coarse),
                tier: Tier::Approaching,
                stopped: false,
            }),
        })
    }

    /// The watcher currently polling (or about to).
    pub async fn active(&self) -> Arc<Watcher> {
        Arc::clone(&self.active.read().await.watcher)
    }

    pub async fn tier(&self) -> Tier {
        self.active.read().await.tier
    }

    /// Run the approach tier, and the final tier once the approach
    /// threshold is crossed.
    pub async fn run(&self) -> Result<RunExit, WatcherError> {
        let coarse = self.active().await;
        if coarse.run().await? == RunExit::Stopped {
            return Ok(RunExit::Stopped);
        }

        let fine = {
            let mut active = self.active.write().await;
            if active.stopped {
                return Ok(RunExit::Stopped);
            }
            let fine = Watcher::new(self.final_spec.clone(), Arc::clone(&self.source))?
                .with_hook(Arc::clone(&self.final_hook));
            let fine = Arc::new(fine);
            active.watcher = Arc::clone(&fine);
            active.tier = Tier::Final;
            fine
        };

        tracing::info!(
            repo = %self.final_spec.repository,
            new_threshold = self.final_spec.target,
            new_interval = ?self.final_spec.interval,
            "Starting final watcher"
        );
        fine.run().await
    }

    /// Stop whichever tier is active and prevent any further handoff.
    pub async fn stop(&self) {
        let mut active = self.active.write().await;
        active.stopped = true;
        active.watcher.stop();
    }
}

#[async_trait]
impl StatusSource for ApproachWatcher {
    async fn snapshot(&self) -> StatusSnapshot {
        let (watcher, tier) = {
            let active = self.active.read().await;
            (Arc::clone(&active.watcher), active.tier)
        };
        watcher.snapshot_as(tier).await
    }
}
