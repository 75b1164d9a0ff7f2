use async_trait::async_trait;
use serde::Serialize;

use crate::watcher::LoopState;

/// Which threshold tier produced a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// A plain watcher with no approach threshold.
    #[default]
    Single,
    /// Polling on the coarse interval for the approach threshold.
    Approaching,
    /// Polling on the fine interval for the real target.
    Final,
}

/// Point-in-time view of the active watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub repository: String,
    pub target: u64,
    pub interval_secs: u64,
    pub count: u64,
    pub state: LoopState,
    pub tier: Tier,
}

/// Anything that can report a [`StatusSnapshot`] without side effects.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn snapshot(&self) -> StatusSnapshot;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_flat() {
        let snapshot = StatusSnapshot {
            repository: "owner/repo".to_string(),
            target: 100,
            interval_secs: 60,
            count: 42,
            state: LoopState::Polling,
            tier: Tier::Approaching,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["repository"], "owner/repo");
        assert_eq!(json["target"], 100);
        assert_eq!(json["interval_secs"], 60);
        assert_eq!(json["count"], 42);
        assert_eq!(json["state"], "polling");
        assert_eq!(json["tier"], "approaching");
    }
}
