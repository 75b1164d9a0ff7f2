use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{HookError, NotifyError};
use crate::notify::Notifier;
use crate::source::Starrer;
use crate::watcher::{CrossingHook, HookOutcome, Watcher};

/// A notifier bound to the phone number that should receive messages.
#[derive(Clone)]
pub struct SmsTarget {
    pub notifier: Arc<dyn Notifier>,
    pub to: String,
}

/// The crossing hook used by the binary: text the operator, optionally star
/// the repository, and optionally stop watching.
#[derive(Clone, Default)]
pub struct NotifyOnCrossing {
    sms: Option<SmsTarget>,
    starrer: Option<Arc<dyn Starrer>>,
    exit_after: bool,
}

impl NotifyOnCrossing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sms(mut self, sms: SmsTarget) -> Self {
        self.sms = Some(sms);
        self
    }

    pub fn with_starrer(mut self, starrer: Arc<dyn Starrer>) -> Self {
        self.starrer = Some(starrer);
        self
    }

    /// Ask the loop to stop once the hook has run.
    pub fn exit_after(mut self, exit_after: bool) -> Self {
        self.exit_after = exit_after;
        self
    }

    async fn send_sms(&self, body: String) -> Result<(), NotifyError> {
        let Some(sms) = &self.sms else {
            return Ok(());
        };
        let result = sms.notifier.send(&sms.to, &body).await;
        if let Err(ref e) = result {
            tracing::warn!(error = %e, "Unable to send SMS");
        }
        result
    }

    async fn star(&self, watcher: &Watcher, starrer: &dyn Starrer) -> Result<(), HookError> {
        let repo = watcher.repository();
        let refreshed = match watcher.star(starrer).await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                tracing::warn!(repo = %repo, error = %e, "Unable to star repo");
                return Err(e.into());
            },
        };
        let body = match refreshed {
            Some(count) => format!(
                "Hey! GitHub repo {repo} has been starred by you, and now has {count} stars!"
            ),
            None => format!("Hey! GitHub repo {repo} has been starred by you!"),
        };
        self.send_sms(body).await?;
        Ok(())
    }
}

#[async_trait]
impl CrossingHook for NotifyOnCrossing {
    async fn on_crossing(&self, watcher: &Watcher) -> HookOutcome {
        let repo = watcher.repository();
        let count = watcher.count().await;

        let mut failure = self
            .send_sms(format!(
                "Hey! GitHub repo {repo} has reached {count} stargazers!"
            ))
            .await
            .err()
            .map(HookError::from);

        if let Some(starrer) = &self.starrer
            && let Err(e) = self.star(watcher, starrer.as_ref()).await
            && failure.is_none()
        {
            failure = Some(e);
        }

        if self.exit_after {
            if let Some(e) = failure {
                tracing::warn!(repo = %repo, error = %e, "Threshold hook finished with errors");
            }
            tracing::info!(repo = %repo, "Exiting after threshold crossed");
            return HookOutcome::Stop;
        }

        match failure {
            Some(e) => HookOutcome::Failed(e),
            None => HookOutcome::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::WatchSpec;
    use crate::error::SourceError;
    use crate::source::CounterSource;
    use crate::test_helpers::{
        RecordingNotifier, RecordingStarrer, ScriptedSource, fetched, transport_error,
    };
    use crate::watcher::Tick;

    fn watcher(source: Vec<Result<crate::source::FetchOutcome, SourceError>>) -> Watcher {
        let source: Arc<dyn CounterSource> = Arc::new(ScriptedSource::new(source));
        Watcher::new(
            WatchSpec::new("ianfoo/github-stargazer", 100, Duration::from_secs(60)),
            source,
        )
        .unwrap()
    }

    fn sms(notifier: &Arc<RecordingNotifier>) -> SmsTarget {
        SmsTarget {
            notifier: Arc::clone(notifier) as Arc<dyn Notifier>,
            to: "+15555550100".to_string(),
        }
    }

    #[tokio::test]
    async fn texts_when_target_reached() {
        let notifier = Arc::new(RecordingNotifier::new());
        let w = watcher(vec![fetched(101)]);
        w.set_hook(Arc::new(NotifyOnCrossing::new().with_sms(sms(&notifier))))
            .await;

        let tick = w.tick().await;

        assert!(matches!(
            tick,
            Tick::Crossed {
                stop_requested: false,
                ..
            }
        ));
        assert_eq!(
            notifier.sent(),
            vec![(
                "+15555550100".to_string(),
                "Hey! GitHub repo ianfoo/github-stargazer has reached 101 stargazers!".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn stars_and_reports_the_refreshed_count() {
        let notifier = Arc::new(RecordingNotifier::new());
        let starrer = Arc::new(RecordingStarrer::new());
        let w = watcher(vec![fetched(100), fetched(101)]);
        w.tick().await;

        let hook = NotifyOnCrossing::new()
            .with_sms(sms(&notifier))
            .with_starrer(Arc::clone(&starrer) as Arc<dyn Starrer>);
        let outcome = hook.on_crossing(&w).await;

        assert!(matches!(outcome, HookOutcome::Continue));
        assert_eq!(starrer.calls(), 1);
        let bodies: Vec<String> = notifier.sent().into_iter().map(|(_, b)| b).collect();
        assert_eq!(
            bodies,
            vec![
                "Hey! GitHub repo ianfoo/github-stargazer has reached 100 stargazers!".to_string(),
                "Hey! GitHub repo ianfoo/github-stargazer has been starred by you, and now has 101 stars!"
                    .to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn star_without_refresh_still_texts() {
        let notifier = Arc::new(RecordingNotifier::new());
        let w = watcher(vec![fetched(100), transport_error()]);
        w.tick().await;

        let hook = NotifyOnCrossing::new()
            .with_sms(sms(&notifier))
            .with_starrer(Arc::new(RecordingStarrer::new()));
        assert!(matches!(hook.on_crossing(&w).await, HookOutcome::Continue));
        assert_eq!(
            notifier.sent()[1].1,
            "Hey! GitHub repo ianfoo/github-stargazer has been starred by you!"
        );
    }

    #[tokio::test]
    async fn star_failure_is_reported_but_first_text_goes_out() {
        let notifier = Arc::new(RecordingNotifier::new());
        let w = watcher(vec![fetched(100)]);
        w.tick().await;

        let hook = NotifyOnCrossing::new()
            .with_sms(sms(&notifier))
            .with_starrer(Arc::new(RecordingStarrer::failing()));
        let outcome = hook.on_crossing(&w).await;

        assert!(matches!(outcome, HookOutcome::Failed(HookError::Star(_))));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn sms_failure_is_reported() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let w = watcher(vec![fetched(100)]);
        w.tick().await;

        let hook = NotifyOnCrossing::new().with_sms(sms(&notifier));
        assert!(matches!(
            hook.on_crossing(&w).await,
            HookOutcome::Failed(HookError::Notify(_))
        ));
    }

    #[tokio::test]
    async fn exit_after_stops_even_on_failure() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let w = watcher(vec![fetched(100)]);
        w.tick().await;

        let hook = NotifyOnCrossing::new()
            .with_sms(sms(&notifier))
            .exit_after(true);
        assert!(matches!(hook.on_crossing(&w).await, HookOutcome::Stop));
    }

    #[tokio::test]
    async fn without_sms_or_star_it_just_continues() {
        let w = watcher(vec![fetched(100)]);
        w.tick().await;
        assert!(matches!(
            NotifyOnCrossing::new().on_crossing(&w).await,
            HookOutcome::Continue
        ));
    }
}
