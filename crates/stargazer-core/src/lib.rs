pub mod approach;
pub mod config;
pub mod error;
pub mod hooks;
pub mod notify;
pub mod source;
pub mod status;
pub mod watcher;

pub use approach::ApproachWatcher;
pub use config::{ApproachSpec, DEFAULT_INTERVAL, MIN_INTERVAL, WatchSpec};
pub use error::{ConfigError, HookError, NotifyError, SourceError, WatcherError};
pub use hooks::{NotifyOnCrossing, SmsTarget};
pub use notify::Notifier;
pub use source::{CounterSource, FetchOutcome, Starrer};
pub use status::{StatusSnapshot, StatusSource, Tier};
pub use watcher::{CrossingHook, HookOutcome, LoopState, RunExit, Tick, Watcher};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::{Notify, Semaphore};

    use crate::error::{HookError, NotifyError, SourceError};
    use crate::notify::Notifier;
    use crate::source::{CounterSource, FetchOutcome, Starrer};
    use crate::watcher::{CrossingHook, HookOutcome, Watcher};

    pub type Scripted = Result<FetchOutcome, SourceError>;

    pub fn fetched(count: u64) -> Scripted {
        Ok(FetchOutcome::Fetched { count, token: None })
    }

    pub fn fetched_with_token(count: u64, token: &str) -> Scripted {
        Ok(FetchOutcome::Fetched {
            count,
            token: Some(token.to_string()),
        })
    }

    pub fn not_modified() -> Scripted {
        Ok(FetchOutcome::NotModified)
    }

    pub fn transport_error() -> Scripted {
        Err(SourceError::Transport {
            endpoint: "https://api.github.test/repos/owner/repo".to_string(),
            message: "connection refused".to_string(),
        })
    }

    /// Counter source that replays a fixed script, then reports
    /// "not modified" forever.
    #[derive(Default)]
    pub struct ScriptedSource {
        script: Mutex<VecDeque<Scripted>>,
        tokens_seen: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedSource {
        pub fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                tokens_seen: Mutex::new(Vec::new()),
            }
        }

        pub fn counts(counts: &[u64]) -> Self {
            Self::new(counts.iter().map(|&c| fetched(c)).collect())
        }

        pub fn push(&self, item: Scripted) {
            self.script.lock().unwrap().push_back(item);
        }

        pub fn calls(&self) -> usize {
            self.tokens_seen.lock().unwrap().len()
        }

        /// Cache tokens passed to each fetch, in call order.
        pub fn tokens_seen(&self) -> Vec<Option<String>> {
            self.tokens_seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CounterSource for ScriptedSource {
        async fn fetch(
            &self,
            _repository: &str,
            cache_token: Option<&str>,
        ) -> Result<FetchOutcome, SourceError> {
            self.tokens_seen
                .lock()
                .unwrap()
                .push(cache_token.map(str::to_string));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(FetchOutcome::NotModified))
        }
    }

    /// Counter source whose fetches block until [`GatedSource::release`]
    /// is called, then report a fixed count.
    pub struct GatedSource {
        count: u64,
        gate: Semaphore,
        entered: Notify,
        calls: AtomicUsize,
    }

    impl GatedSource {
        pub fn new(count: u64) -> Self {
            Self {
                count,
                gate: Semaphore::new(0),
                entered: Notify::new(),
                calls: AtomicUsize::new(0),
            }
        }

        /// Wait until a fetch is blocked on the gate.
        pub async fn wait_entered(&self) {
            self.entered.notified().await;
        }

        /// Let one blocked fetch complete.
        pub fn release(&self) {
            self.gate.add_permits(1);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CounterSource for GatedSource {
        async fn fetch(
            &self,
            _repository: &str,
            _cache_token: Option<&str>,
        ) -> Result<FetchOutcome, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            Ok(FetchOutcome::Fetched {
                count: self.count,
                token: None,
            })
        }
    }

    /// Notifier that records every message it is asked to send.
    #[derive(Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, to: &str, body: &str) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), body.to_string()));
            if self.fail {
                return Err(NotifyError::Api {
                    code: 21211,
                    message: "invalid 'To' phone number".to_string(),
                });
            }
            Ok(())
        }
    }

    /// Starrer that counts calls and optionally fails.
    #[derive(Default)]
    pub struct RecordingStarrer {
        calls: AtomicUsize,
        fail: bool,
    }

    impl RecordingStarrer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Starrer for RecordingStarrer {
        fn has_credential(&self) -> bool {
            true
        }

        async fn star(&self, repository: &str) -> Result<(), SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SourceError::UnexpectedStatus {
                    status: 404,
                    endpoint: format!("https://api.github.test/user/starred/{repository}"),
                });
            }
            Ok(())
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Mode {
        Continue,
        Stop,
        Fail,
    }

    /// Hook that counts invocations and records the count it saw.
    pub struct CountingHook {
        mode: Mode,
        calls: AtomicUsize,
        seen_counts: Mutex<Vec<u64>>,
    }

    impl CountingHook {
        fn with_mode(mode: Mode) -> Self {
            Self {
                mode,
                calls: AtomicUsize::new(0),
                seen_counts: Mutex::new(Vec::new()),
            }
        }

        pub fn continuing() -> Self {
            Self::with_mode(Mode::Continue)
        }

        pub fn stopping() -> Self {
            Self::with_mode(Mode::Stop)
        }

        pub fn failing() -> Self {
            Self::with_mode(Mode::Fail)
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn seen_counts(&self) -> Vec<u64> {
            self.seen_counts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CrossingHook for CountingHook {
        async fn on_crossing(&self, watcher: &Watcher) -> HookOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let count = watcher.count().await;
            self.seen_counts.lock().unwrap().push(count);
            match self.mode {
                Mode::Continue => HookOutcome::Continue,
                Mode::Stop => HookOutcome::Stop,
                Mode::Fail => HookOutcome::Failed(HookError::Notify(NotifyError::Transport(
                    "timed out".to_string(),
                ))),
            }
        }
    }
}
