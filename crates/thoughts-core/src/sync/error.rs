use thiserror::Error;

/// Errors from the remote file store and the sync engine.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Sync is not configured")]
    NotConfigured,
    #[error("Invalid sync configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Sync HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Store(#[from] crate::error::Error),
    /// Writing one day's file failed; later days were not attempted
    #[error("{date}: {source}")]
    Day {
        date: String,
        #[source]
        source: Box<SyncError>,
    },
}

pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// Whether the remote rejected a write because the file changed underneath it
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Api { status, .. } => matches!(status, 409 | 422),
            Self::Day { source, .. } => source.is_conflict(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_error_names_the_date_and_keeps_conflicts_visible() {
        let error = SyncError::Day {
            date: "2024-01-02".into(),
            source: Box::new(SyncError::Api {
                status: 409,
                message: "sha does not match (409)".into(),
            }),
        };
        assert_eq!(error.to_string(), "2024-01-02: sha does not match (409)");
        assert!(error.is_conflict());
        assert!(!SyncError::NotConfigured.is_conflict());
    }
}
