use std::path::Path;

use thoughts_core::SyncStatus;

use crate::commands::common::open_service;
use crate::error::CliError;

/// Pull today's remote file, push unsynced thoughts, or both when neither
/// flag is given.
pub async fn run_sync(pull: bool, push: bool, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path)?;
    let engine = service.engine();
    if !engine.is_configured() {
        return Err(CliError::SyncNotConfigured);
    }

    let (pull, push) = if pull || push { (pull, push) } else { (true, true) };

    if pull {
        match engine.pull().await? {
            Some(status) => println!("{status}"),
            None => println!("Nothing new to pull"),
        }
    }

    if push {
        match engine.push().await {
            SyncStatus::SyncFailed { error } => return Err(CliError::SyncFailed(error)),
            status => println!("{status}"),
        }
    }

    Ok(())
}
