//! Sync progress and outcome states surfaced to clients.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Every sync outcome maps to exactly one of these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncStatus {
    /// Handed off to the deferred scheduler
    Queued,
    /// Push is waiting for geocoding to settle
    WaitingGeocoding,
    /// Push started with this many unsynced thoughts
    Syncing { count: usize },
    /// Nothing to push
    AlreadySynced,
    /// Push finished
    SyncComplete { count: usize },
    /// Push failed
    SyncFailed { error: String },
    /// Pull merged this many remote thoughts
    DownloadComplete { count: usize },
}

impl SyncStatus {
    /// Whether this state ends a sync run
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::WaitingGeocoding | Self::Syncing { .. })
    }

    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::SyncFailed { .. })
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => write!(f, "Sync queued"),
            Self::WaitingGeocoding => write!(f, "Waiting for geocoding..."),
            Self::Syncing { count } => write!(f, "Syncing {count} thought(s)..."),
            Self::AlreadySynced => write!(f, "Already synced"),
            Self::SyncComplete { count } => write!(f, "Synced {count} thought(s)"),
            Self::SyncFailed { error } => write!(f, "Sync failed: {error}"),
            Self::DownloadComplete { count } => write!(f, "Downloaded {count} thought(s)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_json_shape() {
        let json = serde_json::to_string(&SyncStatus::SyncComplete { count: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"sync_complete","count":3}"#);
        let json = serde_json::to_string(&SyncStatus::AlreadySynced).unwrap();
        assert_eq!(json, r#"{"type":"already_synced"}"#);
    }

    #[test]
    fn test_terminal_states() {
        assert!(SyncStatus::Queued.is_terminal());
        assert!(!SyncStatus::Syncing { count: 1 }.is_terminal());
        assert!(SyncStatus::SyncFailed {
            error: "boom".into()
        }
        .is_failure());
    }
}
