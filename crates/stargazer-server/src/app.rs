//! Builds the watch loop from configuration.

use std::sync::Arc;

use stargazer_core::{
    ApproachWatcher, ConfigError, CounterSource, CrossingHook, NotifyOnCrossing, RunExit,
    SmsTarget, Starrer, StatusSource, Watcher, WatcherError,
};
use stargazer_github::GitHubClient;
use stargazer_twilio::TwilioSmsSender;

use crate::config::{StargazerConfig, WatchPlan};
use crate::error::ServerError;

pub const USER_AGENT: &str = concat!("github-stargazer/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by the GitHub and Twilio adapters. Timeouts are set
/// per request by each adapter.
pub fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}

/// The watch loop the binary runs: a single watcher, or an approach tier
/// that hands off to a final tier.
pub enum Stargazer {
    Single(Arc<Watcher>),
    Approach(Arc<ApproachWatcher>),
}

impl Stargazer {
    pub fn new(
        plan: WatchPlan,
        source: Arc<dyn CounterSource>,
        hook: Arc<dyn CrossingHook>,
    ) -> Result<Self, ConfigError> {
        match plan.approach {
            Some(approach) => Ok(Self::Approach(Arc::new(ApproachWatcher::new(
                plan.watch, approach, source, hook,
            )?))),
            None => Ok(Self::Single(Arc::new(
                Watcher::new(plan.watch, source)?.with_hook(hook),
            ))),
        }
    }

    /// Wire up GitHub, Twilio, and the crossing hook from `config`.
    pub fn from_config(
        config: &StargazerConfig,
        plan: WatchPlan,
        http: reqwest::Client,
    ) -> Result<Self, ServerError> {
        let github = Arc::new(GitHubClient::new(&config.github, http.clone()));
        let hook = crossing_hook(config, Arc::clone(&github) as Arc<dyn Starrer>, http)?;
        Ok(Self::new(plan, github, Arc::new(hook))?)
    }

    pub async fn run(&self) -> Result<RunExit, WatcherError> {
        match self {
            Self::Single(watcher) => watcher.run().await,
            Self::Approach(watcher) => watcher.run().await,
        }
    }

    /// Stop polling. A tick already in progress is allowed to finish.
    pub async fn stop(&self) {
        match self {
            Self::Single(watcher) => {
                watcher.stop();
            },
            Self::Approach(watcher) => watcher.stop().await,
        }
    }

    pub fn status_source(&self) -> Arc<dyn StatusSource> {
        match self {
            Self::Single(watcher) => Arc::clone(watcher) as Arc<dyn StatusSource>,
            Self::Approach(watcher) => Arc::clone(watcher) as Arc<dyn StatusSource>,
        }
    }
}

/// Build the SMS-and-star hook. Missing SMS settings disable texting and
/// a missing GitHub token disables starring; neither is fatal.
pub fn crossing_hook(
    config: &StargazerConfig,
    starrer: Arc<dyn Starrer>,
    http: reqwest::Client,
) -> Result<NotifyOnCrossing, ServerError> {
    let mut hook = NotifyOnCrossing::new().exit_after(config.watch.exit_after);

    let phone = config.watch.phone.as_deref().filter(|p| !p.is_empty());
    let missing = config.twilio.missing();
    match phone {
        Some(phone) if missing.is_empty() => {
            let sender = TwilioSmsSender::new(&config.twilio, http)?;
            tracing::info!(to = %phone, "SMS notifications enabled");
            hook = hook.with_sms(SmsTarget {
                notifier: Arc::new(sender),
                to: phone.to_string(),
            });
        },
        _ => {
            let mut missing = missing;
            if phone.is_none() {
                missing.push("phone");
            }
            tracing::info!(missing = ?missing, "SMS notifications disabled");
        },
    }

    if config.watch.star {
        if starrer.has_credential() {
            hook = hook.with_starrer(starrer);
        } else {
            tracing::warn!("Starring requested but no GitHub token is configured; skipping");
        }
    }

    Ok(hook)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use stargazer_core::test_helpers::{CountingHook, RecordingStarrer, ScriptedSource};
    use stargazer_core::{ApproachSpec, LoopState, Tier, WatchSpec};

    use super::*;

    fn plan(approach: Option<ApproachSpec>) -> WatchPlan {
        WatchPlan {
            watch: WatchSpec::new("owner/repo", 100, Duration::from_secs(60)),
            approach,
        }
    }

    #[tokio::test]
    async fn single_plan_builds_single_watcher() {
        let source = Arc::new(ScriptedSource::counts(&[10]));
        let stargazer =
            Stargazer::new(plan(None), source, Arc::new(CountingHook::continuing())).unwrap();
        assert!(matches!(stargazer, Stargazer::Single(_)));

        let snapshot = stargazer.status_source().snapshot().await;
        assert_eq!(snapshot.tier, Tier::Single);
        assert_eq!(snapshot.state, LoopState::Idle);
    }

    #[tokio::test]
    async fn approach_plan_builds_approach_watcher() {
        let source = Arc::new(ScriptedSource::counts(&[10]));
        let approach = ApproachSpec {
            target: 90,
            interval: Duration::from_secs(5),
        };
        let stargazer = Stargazer::new(
            plan(Some(approach)),
            source,
            Arc::new(CountingHook::continuing()),
        )
        .unwrap();

        let snapshot = stargazer.status_source().snapshot().await;
        assert_eq!(snapshot.tier, Tier::Approaching);
        assert_eq!(snapshot.target, 90);
        assert_eq!(snapshot.interval_secs, 60);
    }

    #[tokio::test]
    async fn stopped_loop_cannot_start() {
        let source = Arc::new(ScriptedSource::counts(&[10]));
        let stargazer =
            Stargazer::new(plan(None), source, Arc::new(CountingHook::continuing())).unwrap();
        stargazer.stop().await;
        assert!(stargazer.run().await.is_err());
    }

    #[test]
    fn hook_builds_without_sms_or_token() {
        let config = StargazerConfig::default();
        let github = Arc::new(GitHubClient::new(&config.github, reqwest::Client::new()));
        assert!(!github.has_credential());
        assert!(crossing_hook(&config, github, reqwest::Client::new()).is_ok());
    }

    #[test]
    fn hook_builds_with_full_sms_settings() {
        let mut config = StargazerConfig::default();
        config.watch.phone = Some("+15555550100".to_string());
        config.twilio.account_sid = Some("AC123".to_string());
        config.twilio.auth_token = Some("secret".to_string());
        config.twilio.sender = Some("+15555550199".to_string());
        let starrer = Arc::new(RecordingStarrer::new());
        assert!(crossing_hook(&config, starrer, reqwest::Client::new()).is_ok());
    }

    #[test]
    fn user_agent_names_the_binary() {
        assert!(USER_AGENT.starts_with("github-stargazer/"));
    }
}
