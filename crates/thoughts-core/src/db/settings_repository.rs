//! Settings repository implementation

use std::sync::Arc;

use super::{get_json, set_json, KeyValueStore};
use crate::error::Result;
use crate::models::{InputMode, SyncSettings};

/// Key sync settings are persisted under
pub const SYNC_SETTINGS_KEY: &str = "github_sync_settings";
/// Key the capture input mode is persisted under
pub const INPUT_MODE_KEY: &str = "input_mode";

/// Reads and writes user settings in the key/value store
#[derive(Clone)]
pub struct SettingsRepository {
    kv: Arc<dyn KeyValueStore>,
}

impl SettingsRepository {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Stored sync settings; `None` means sync is disabled.
    ///
    /// An unreadable value is treated as absent.
    pub fn sync_settings(&self) -> Option<SyncSettings> {
        match get_json(self.kv.as_ref(), SYNC_SETTINGS_KEY) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!("Ignoring unreadable sync settings: {}", error);
                None
            }
        }
    }

    pub fn save_sync_settings(&self, settings: &SyncSettings) -> Result<()> {
        set_json(self.kv.as_ref(), SYNC_SETTINGS_KEY, settings)
    }

    pub fn clear_sync_settings(&self) -> Result<()> {
        self.kv.remove(SYNC_SETTINGS_KEY)
    }

    /// Stored input mode; anything unrecognized falls back to the default.
    pub fn input_mode(&self) -> InputMode {
        self.kv
            .get(INPUT_MODE_KEY)
            .ok()
            .flatten()
            .and_then(|value| InputMode::parse(&value))
            .unwrap_or_default()
    }

    pub fn save_input_mode(&self, mode: InputMode) -> Result<()> {
        self.kv.set(INPUT_MODE_KEY, mode.as_str())
    }
}
