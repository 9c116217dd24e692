use std::path::Path;

use serde::Serialize;
use thoughts_core::db::SettingsRepository;
use thoughts_core::services::status_line;
use thoughts_core::RecordStore;

use crate::commands::common::{open_kv, SyncSettingsView};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub status: String,
    pub total: usize,
    pub unsynced: usize,
    pub sync: Option<SyncSettingsView>,
}

pub fn load_status(db_path: &Path) -> Result<StatusReport, CliError> {
    let kv = open_kv(db_path)?;
    let store = RecordStore::new(kv.clone());
    let settings = SettingsRepository::new(kv);

    let total = store.all()?.len();
    let unsynced = store.unsynced_count()?;
    Ok(StatusReport {
        status: status_line(unsynced),
        total,
        unsynced,
        sync: settings
            .sync_settings()
            .as_ref()
            .map(SyncSettingsView::from),
    })
}

pub fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let report = load_status(db_path)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} ({} total)", report.status, report.total);
    match &report.sync {
        Some(sync) => println!(
            "Sync: {} on {} -> {} ({})",
            sync.repo, sync.branch, sync.path, sync.sync_mode
        ),
        None => println!("Sync: not configured"),
    }
    Ok(())
}
