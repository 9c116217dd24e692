use std::env;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use serde::Serialize;
use thoughts_core::config::EndpointConfig;
use thoughts_core::db::{KeyValueStore, SettingsRepository, SqliteKeyValueStore};
use thoughts_core::geocode::{GeocodePipeline, NominatimClient};
use thoughts_core::models::{InputMode, Location, SyncSettings, Thought};
use thoughts_core::remote::GitHubContentsClient;
use thoughts_core::services::ThoughtService;
use thoughts_core::sync::{StatusObserver, SyncEngine, UnsupportedTrigger};
use thoughts_core::{RecordStore, SyncStatus};

use crate::error::CliError;

pub const DB_PATH_ENV: &str = "THOUGHTS_DB_PATH";
pub const GITHUB_TOKEN_ENV: &str = "THOUGHTS_GITHUB_TOKEN";
pub const GITHUB_API_URL_ENV: &str = "THOUGHTS_GITHUB_API_URL";
pub const NOMINATIM_URL_ENV: &str = "THOUGHTS_NOMINATIM_URL";

#[derive(Debug, Serialize)]
pub struct ThoughtListItem {
    pub id: i64,
    pub preview: String,
    pub text: String,
    pub timestamp: String,
    pub relative_time: String,
    pub location: Option<Location>,
    pub synced: bool,
}

/// Sync settings as shown to the user; the token is never printed.
#[derive(Debug, Serialize)]
pub struct SyncSettingsView {
    pub repo: String,
    pub path: String,
    pub branch: String,
    pub sync_mode: String,
    pub token: String,
}

impl From<&SyncSettings> for SyncSettingsView {
    fn from(settings: &SyncSettings) -> Self {
        Self {
            repo: settings.repo.clone(),
            path: settings.path.clone(),
            branch: settings.branch.clone(),
            sync_mode: if settings.is_auto() { "auto" } else { "manual" }.to_string(),
            token: redact_token(&settings.token),
        }
    }
}

pub fn open_kv(db_path: &Path) -> Result<Arc<dyn KeyValueStore>, CliError> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(SqliteKeyValueStore::open(db_path)?))
}

pub fn open_settings(db_path: &Path) -> Result<SettingsRepository, CliError> {
    Ok(SettingsRepository::new(open_kv(db_path)?))
}

pub fn endpoint_config() -> Result<EndpointConfig, CliError> {
    EndpointConfig::with_overrides(
        env::var(GITHUB_API_URL_ENV).ok(),
        env::var(NOMINATIM_URL_ENV).ok(),
    )
    .map_err(CliError::Config)
}

/// Wire the store, geocoder and sync engine over the database at `db_path`.
///
/// A terminal has no background scheduler, so dispatched syncs always run
/// in the foreground. Progress states are reported on stderr.
pub fn open_service(db_path: &Path) -> Result<ThoughtService, CliError> {
    let kv = open_kv(db_path)?;
    let endpoints = endpoint_config()?;

    let store = Arc::new(RecordStore::new(Arc::clone(&kv)));
    let remote = Arc::new(GitHubContentsClient::new(endpoints.github_api_url)?);
    let geocoder = GeocodePipeline::new(
        Arc::new(NominatimClient::new(endpoints.nominatim_url)?),
        Arc::clone(&kv),
    );
    let observer: StatusObserver = Arc::new(report_progress);

    let engine = SyncEngine::builder(Arc::clone(&store), Arc::clone(&kv), remote)
        .geocoder(geocoder.clone())
        .trigger(Arc::new(UnsupportedTrigger))
        .observer(observer)
        .build();

    Ok(ThoughtService::new(kv, store, engine, Some(geocoder)))
}

fn report_progress(status: &SyncStatus) {
    if !status.is_terminal() {
        eprintln!("{status}");
    }
}

pub fn format_thought_lines(thoughts: &[Thought]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    thoughts
        .iter()
        .map(|thought| {
            let id = thought.id.to_string();
            let preview = thought_preview(thought, 40);
            let relative_time = format_relative_time(thought.timestamp.timestamp_millis(), now_ms);
            let marker = if thought.synced { " " } else { "*" };
            let place = render_location(thought.location.as_ref());

            if place.is_empty() {
                format!("{marker} {id:<13}  {preview:<40}  {relative_time}")
            } else {
                format!("{marker} {id:<13}  {preview:<40}  {relative_time:<10}  {place}")
            }
        })
        .collect()
}

pub fn thought_to_list_item(thought: &Thought) -> ThoughtListItem {
    let now_ms = Utc::now().timestamp_millis();
    ThoughtListItem {
        id: thought.id.as_i64(),
        preview: thought_preview(thought, 80),
        text: thought.text.clone(),
        timestamp: thought.timestamp.to_rfc3339(),
        relative_time: format_relative_time(thought.timestamp.timestamp_millis(), now_ms),
        location: thought.location.clone(),
        synced: thought.synced,
    }
}

pub fn thought_preview(thought: &Thought, max_chars: usize) -> String {
    let first_line = thought.text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn render_location(location: Option<&Location>) -> String {
    match location {
        Some(location) if location.has_name() => {
            format!("@ {}", location.name.as_deref().unwrap_or_default())
        }
        Some(location) if location.has_coordinates() => {
            format!("@ {}, {}", location.lat, location.lon)
        }
        _ => String::new(),
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Keep only the last four characters of a credential.
pub fn redact_token(token: &str) -> String {
    let count = token.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail = token.chars().skip(count - 4).collect::<String>();
    format!("****{tail}")
}

/// Text from the command line, then piped stdin, then an interactive prompt
/// shaped by the input mode.
pub fn resolve_thought_text(
    text_parts: &[String],
    input_mode: InputMode,
) -> Result<String, CliError> {
    if let Some(text) = normalize_content(&text_parts.join(" ")) {
        return Ok(text);
    }

    if let Some(text) = read_piped_stdin()? {
        return Ok(text);
    }

    let captured = match input_mode {
        InputMode::Single => prompt_single_line()?,
        InputMode::Multiline => capture_editor_input()?,
    };
    captured.ok_or(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn prompt_single_line() -> Result<Option<String>, CliError> {
    let mut stderr = io::stderr();
    write!(stderr, "> ")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(normalize_content(&line))
}

pub fn capture_editor_input() -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_thought_file_path();
    std::fs::write(&temp_file, "")?;

    let launch_result = launch_editor(&editor, &temp_file);
    let text = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&text))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_thought_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("thought-{}-{now}.md", std::process::id()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match cli_db_path.or_else(|| env::var_os(DB_PATH_ENV).map(PathBuf::from)) {
        Some(path) => Ok(path),
        None => default_db_path(),
    }
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("thoughts").join("thoughts.db"))
        .ok_or_else(|| CliError::Config("failed to resolve the data directory".into()))
}
