use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use clap::Parser;
use pretty_assertions::assert_eq;
use thoughts_core::db::MemoryKeyValueStore;
use thoughts_core::export::ExportScope;
use thoughts_core::flags::{Feature, FeatureFlags};
use thoughts_core::geocode::{GeocodeCache, GeocodeError, ReverseGeocoder};
use thoughts_core::models::{InputMode, Location, SyncMode, SyncSettings, Thought};
use thoughts_core::RecordStore;

use crate::cli::{Cli, Commands, ExportFormat, FlagsCommands, InputModeArg};
use crate::commands::common::{
    default_editor, format_relative_time, format_thought_lines, normalize_content, open_kv,
    open_settings, redact_token, render_location, resolve_db_path, thought_preview,
};
use crate::commands::config::{
    merge_sync_settings, run_config_input_mode, run_config_sync, SyncSettingsInput,
};
use crate::commands::export::{export_target, run_export};
use crate::commands::flags::run_flags;
use crate::commands::geocode::lookup_place;
use crate::commands::status::load_status;
use crate::error::CliError;

fn temp_db_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("nested").join("thoughts.db")
}

struct CountingGeocoder {
    calls: AtomicUsize,
}

#[async_trait]
impl ReverseGeocoder for CountingGeocoder {
    async fn reverse(&self, _lat: f64, _lon: f64) -> Result<Option<String>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some("Warsaw, Poland".to_string()))
    }
}

#[test]
fn normalize_content_trims_and_rejects_empty() {
    assert_eq!(normalize_content("  hello  "), Some("hello".to_string()));
    assert_eq!(normalize_content(" \n\t "), None);
}

#[test]
fn normalize_content_keeps_multiline_text() {
    assert_eq!(
        normalize_content("line 1\nline 2\n"),
        Some("line 1\nline 2".to_string())
    );
}

#[test]
fn default_editor_is_defined() {
    assert!(!default_editor().is_empty());
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
}

#[test]
fn thought_preview_truncates_with_ellipsis() {
    let thought = Thought::new("This is a very long sentence that should be shortened");
    assert_eq!(thought_preview(&thought, 20), "This is a very lo...");
}

#[test]
fn thought_preview_uses_first_line_only() {
    let thought = Thought::new("first   line\nsecond line");
    assert_eq!(thought_preview(&thought, 40), "first line");
}

#[test]
fn render_location_prefers_name() {
    let named = Location::new(52.2297, 21.0122).with_name("Warsaw, Poland");
    assert_eq!(render_location(Some(&named)), "@ Warsaw, Poland");
    assert_eq!(
        render_location(Some(&Location::new(52.2297, 21.0122))),
        "@ 52.2297, 21.0122"
    );
    assert_eq!(render_location(None), "");
}

#[test]
fn format_thought_lines_mark_unsynced() {
    let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 0).unwrap();
    let mut synced = Thought::captured_at("done", timestamp);
    synced.synced = true;
    let queued = Thought::captured_at("pending", timestamp)
        .with_location(Location::new(1.0, 2.0).with_name("Somewhere"));

    let lines = format_thought_lines(&[queued, synced]);
    assert!(lines[0].starts_with("* "));
    assert!(lines[0].ends_with("@ Somewhere"));
    assert!(lines[1].starts_with("  "));
    assert!(lines[1].contains("done"));
}

#[test]
fn redact_token_keeps_tail() {
    assert_eq!(redact_token("ghp_abcdef1234"), "****1234");
    assert_eq!(redact_token("abc"), "****");
}

#[test]
fn resolve_db_path_prefers_cli_argument() {
    let path = PathBuf::from("/tmp/explicit.db");
    assert_eq!(resolve_db_path(Some(path.clone())).unwrap(), path);
}

#[test]
fn quick_capture_collects_trailing_words() {
    let cli = Cli::try_parse_from(["thoughts", "buy", "milk"]).unwrap();
    assert!(cli.command.is_none());
    assert_eq!(cli.thought, vec!["buy".to_string(), "milk".to_string()]);
}

#[test]
fn add_accepts_negative_coordinates() {
    let cli =
        Cli::try_parse_from(["thoughts", "add", "here", "--lat", "-33.8688", "--lon", "151.2"])
            .unwrap();
    match cli.command {
        Some(Commands::Add { text, lat, lon }) => {
            assert_eq!(text, vec!["here".to_string()]);
            assert_eq!(lat, Some(-33.8688));
            assert_eq!(lon, Some(151.2));
        }
        _ => panic!("expected add command"),
    }
}

#[test]
fn add_requires_both_coordinates() {
    assert!(Cli::try_parse_from(["thoughts", "add", "x", "--lat", "1.0"]).is_err());
}

#[test]
fn sync_flags_are_exclusive() {
    assert!(Cli::try_parse_from(["thoughts", "sync", "--pull", "--push"]).is_err());
    let cli = Cli::try_parse_from(["thoughts", "sync", "--pull"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Sync {
            pull: true,
            push: false
        })
    ));
}

#[test]
fn merge_sync_settings_keeps_stored_values() {
    let current = SyncSettings::new(
        "stored-token",
        "me/notes",
        Some("journal/{date}.md".into()),
        None,
        SyncMode::Auto,
    )
    .unwrap();

    let merged = merge_sync_settings(
        Some(current),
        SyncSettingsInput {
            mode: Some(SyncMode::Manual),
            ..SyncSettingsInput::default()
        },
    )
    .unwrap();

    assert_eq!(merged.token, "stored-token");
    assert_eq!(merged.path, "journal/{date}.md");
    assert_eq!(merged.sync_mode, SyncMode::Manual);
}

#[test]
fn merge_sync_settings_requires_token_and_repo() {
    let error = merge_sync_settings(
        None,
        SyncSettingsInput {
            repo: Some("me/notes".into()),
            ..SyncSettingsInput::default()
        },
    )
    .unwrap_err();
    assert!(matches!(error, CliError::Config(_)));

    let error = merge_sync_settings(
        None,
        SyncSettingsInput {
            token: Some("tok".into()),
            ..SyncSettingsInput::default()
        },
    )
    .unwrap_err();
    assert!(matches!(error, CliError::Config(_)));
}

#[test]
fn config_sync_is_reported_by_status() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = temp_db_path(&dir);

    run_config_sync(
        SyncSettingsInput {
            token: Some("ghp_secret".into()),
            repo: Some("me/notes".into()),
            mode: Some(SyncMode::Manual),
            ..SyncSettingsInput::default()
        },
        &db_path,
    )
    .unwrap();

    let store = RecordStore::new(open_kv(&db_path).unwrap());
    store.append(Thought::new("queued")).unwrap();

    let report = load_status(&db_path).unwrap();
    assert_eq!(report.status, "1 queued");
    assert_eq!(report.total, 1);
    let sync = report.sync.unwrap();
    assert_eq!(sync.repo, "me/notes");
    assert_eq!(sync.sync_mode, "manual");
    assert_eq!(sync.token, "****cret");
}

#[test]
fn config_input_mode_persists() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = temp_db_path(&dir);

    run_config_input_mode(InputModeArg::Single, &db_path).unwrap();
    assert_eq!(
        open_settings(&db_path).unwrap().input_mode(),
        InputMode::Single
    );
}

#[test]
fn export_into_directory_uses_suggested_name() {
    let dir = tempfile::tempdir().unwrap();
    let target = export_target(dir.path(), ExportScope::Day, ExportFormat::Markdown, "2024-01-15");
    assert_eq!(target, dir.path().join("thoughts-2024-01-15.md"));

    let file = dir.path().join("out.json");
    assert_eq!(
        export_target(&file, ExportScope::All, ExportFormat::Json, "2024-01-15"),
        file
    );
}

#[test]
fn export_writes_all_thoughts_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = temp_db_path(&dir);
    let store = RecordStore::new(open_kv(&db_path).unwrap());
    store.append(Thought::new("exported")).unwrap();

    let output = dir.path().join("export.json");
    run_export(false, ExportFormat::Json, Some(&output), &db_path).unwrap();

    let written: Vec<Thought> =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].text, "exported");
}

#[test]
fn flags_enable_persists_and_rejects_unknown_names() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = temp_db_path(&dir);

    run_flags(
        FlagsCommands::Enable {
            feature: "geocoding".into(),
        },
        &db_path,
    )
    .unwrap();
    let flags = FeatureFlags::new(open_kv(&db_path).unwrap());
    assert!(flags.is_enabled(Feature::Geocoding));

    let error = run_flags(
        FlagsCommands::Enable {
            feature: "teleport".into(),
        },
        &db_path,
    )
    .unwrap_err();
    assert!(matches!(error, CliError::Core(_)));
}

#[tokio::test(flavor = "current_thread")]
async fn lookup_place_uses_cache_before_geocoder() {
    let cache = GeocodeCache::load(Arc::new(MemoryKeyValueStore::new()));
    let geocoder = CountingGeocoder {
        calls: AtomicUsize::new(0),
    };

    let first = lookup_place(&cache, &geocoder, 52.2297, 21.0122)
        .await
        .unwrap();
    let second = lookup_place(&cache, &geocoder, 52.2301, 21.0119)
        .await
        .unwrap();

    assert_eq!(first.as_deref(), Some("Warsaw, Poland"));
    assert_eq!(second, first);
    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
}
