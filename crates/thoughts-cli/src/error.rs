use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] thoughts_core::Error),
    #[error(transparent)]
    Sync(#[from] thoughts_core::sync::SyncError),
    #[error(transparent)]
    Geocode(#[from] thoughts_core::geocode::GeocodeError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No thought text provided")]
    EmptyContent,
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Sync failed: {0}")]
    SyncFailed(String),
    #[error(
        "Sync is not configured. Run `thoughts config sync --token <TOKEN> --repo <OWNER/NAME>`."
    )]
    SyncNotConfigured,
}
