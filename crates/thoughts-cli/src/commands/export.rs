use std::path::{Path, PathBuf};

use thoughts_core::export::{self, render_export, suggested_export_file_name, ExportScope};
use thoughts_core::util::today;
use thoughts_core::RecordStore;

use crate::cli::ExportFormat;
use crate::commands::common::open_kv;
use crate::error::CliError;

impl From<ExportFormat> for export::ExportFormat {
    fn from(value: ExportFormat) -> Self {
        match value {
            ExportFormat::Json => Self::Json,
            ExportFormat::Markdown => Self::Markdown,
        }
    }
}

pub fn run_export(
    today_only: bool,
    format: ExportFormat,
    output_path: Option<&Path>,
    db_path: &Path,
) -> Result<(), CliError> {
    let store = RecordStore::new(open_kv(db_path)?);
    let thoughts = store.all()?;

    let scope = if today_only {
        ExportScope::Day
    } else {
        ExportScope::All
    };
    let date = today();
    let rendered = render_export(&thoughts, scope, format.into(), &date)?;

    if let Some(path) = output_path {
        let path = export_target(path, scope, format, &date);
        std::fs::write(&path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}

/// A directory target gets the suggested file name appended.
pub fn export_target(path: &Path, scope: ExportScope, format: ExportFormat, date: &str) -> PathBuf {
    if path.is_dir() {
        path.join(suggested_export_file_name(scope, format.into(), date))
    } else {
        path.to_path_buf()
    }
}
