//! Local persistence for Thoughts

mod connection;
mod kv_repository;
mod migrations;
mod settings_repository;

pub use connection::Database;
pub use kv_repository::{
    get_json, set_json, KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore,
};
pub use settings_repository::{SettingsRepository, INPUT_MODE_KEY, SYNC_SETTINGS_KEY};
