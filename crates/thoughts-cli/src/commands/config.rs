use std::env;
use std::path::Path;

use thoughts_core::models::{InputMode, SyncMode, SyncSettings};

use crate::cli::{ConfigCommands, InputModeArg, SyncModeArg};
use crate::commands::common::{open_settings, SyncSettingsView, GITHUB_TOKEN_ENV};
use crate::error::CliError;

/// Values given to `config sync`; `None` keeps what is already stored.
#[derive(Debug, Default)]
pub struct SyncSettingsInput {
    pub token: Option<String>,
    pub repo: Option<String>,
    pub path: Option<String>,
    pub branch: Option<String>,
    pub mode: Option<SyncMode>,
}

pub fn run_config(command: ConfigCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Sync {
            token,
            repo,
            path,
            branch,
            mode,
        } => {
            let input = SyncSettingsInput {
                token: token.or_else(|| env::var(GITHUB_TOKEN_ENV).ok()),
                repo,
                path,
                branch,
                mode: mode.map(SyncModeArg::into),
            };
            run_config_sync(input, db_path)
        }
        ConfigCommands::Show { json } => run_config_show(json, db_path),
        ConfigCommands::Clear => {
            open_settings(db_path)?.clear_sync_settings()?;
            println!("Sync settings cleared");
            Ok(())
        }
        ConfigCommands::InputMode { mode } => run_config_input_mode(mode, db_path),
    }
}

pub fn run_config_sync(input: SyncSettingsInput, db_path: &Path) -> Result<(), CliError> {
    let repository = open_settings(db_path)?;
    let settings = merge_sync_settings(repository.sync_settings(), input)?;
    repository.save_sync_settings(&settings)?;

    let view = SyncSettingsView::from(&settings);
    println!(
        "Sync configured: {} on {} -> {} ({})",
        view.repo, view.branch, view.path, view.sync_mode
    );
    Ok(())
}

/// Overlay `input` on the stored settings. Token and repo must come from
/// one or the other.
pub fn merge_sync_settings(
    current: Option<SyncSettings>,
    input: SyncSettingsInput,
) -> Result<SyncSettings, CliError> {
    let token = input
        .token
        .or_else(|| current.as_ref().map(|settings| settings.token.clone()))
        .ok_or_else(|| {
            CliError::Config(format!(
                "a token is required (--token or {GITHUB_TOKEN_ENV})"
            ))
        })?;
    let repo = input
        .repo
        .or_else(|| current.as_ref().map(|settings| settings.repo.clone()))
        .ok_or_else(|| CliError::Config("a repository is required (--repo)".into()))?;
    let path = input
        .path
        .or_else(|| current.as_ref().map(|settings| settings.path.clone()));
    let branch = input
        .branch
        .or_else(|| current.as_ref().map(|settings| settings.branch.clone()));
    let mode = input
        .mode
        .or_else(|| current.as_ref().map(|settings| settings.sync_mode))
        .unwrap_or_default();

    Ok(SyncSettings::new(token, repo, path, branch, mode)?)
}

pub fn run_config_show(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let repository = open_settings(db_path)?;
    let view = repository
        .sync_settings()
        .as_ref()
        .map(SyncSettingsView::from);
    let input_mode = repository.input_mode();

    if as_json {
        let json = serde_json::json!({
            "sync": view,
            "input_mode": input_mode.as_str(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    match view {
        Some(view) => {
            println!("repo:       {}", view.repo);
            println!("path:       {}", view.path);
            println!("branch:     {}", view.branch);
            println!("sync mode:  {}", view.sync_mode);
            println!("token:      {}", view.token);
        }
        None => println!("sync:       not configured"),
    }
    println!("input mode: {}", input_mode.as_str());
    Ok(())
}

pub fn run_config_input_mode(mode: InputModeArg, db_path: &Path) -> Result<(), CliError> {
    let mode = InputMode::from(mode);
    open_settings(db_path)?.save_input_mode(mode)?;
    println!("Input mode: {}", mode.as_str());
    Ok(())
}
