use async_trait::async_trait;

use crate::error::SourceError;

/// Result of a conditional fetch of the stargazer count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The host confirmed nothing changed since the cached token was issued.
    NotModified,
    /// A fresh count, with a new revalidation token if the host sent one.
    Fetched { count: u64, token: Option<String> },
}

/// Where a watcher reads its count from.
#[async_trait]
pub trait CounterSource: Send + Sync {
    /// Fetch the current count. When `cache_token` is set the host may answer
    /// with [`FetchOutcome::NotModified`] instead of a full payload.
    async fn fetch(
        &self,
        repository: &str,
        cache_token: Option<&str>,
    ) -> Result<FetchOutcome, SourceError>;
}

/// Marks a repository as starred on behalf of the operator.
#[async_trait]
pub trait Starrer: Send + Sync {
    /// Whether a credential is available to star with at all.
    fn has_credential(&self) -> bool;

    async fn star(&self, repository: &str) -> Result<(), SourceError>;
}
