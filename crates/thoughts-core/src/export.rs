//! Export helpers shared by clients.

use serde::{Deserialize, Serialize};

use crate::markdown;
use crate::models::Thought;

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// Which thoughts an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    /// Only thoughts captured on the given day
    Day,
    /// Everything in the store
    All,
}

/// Render `thoughts` for `scope`, with `date` naming the day for a
/// [`ExportScope::Day`] export.
pub fn render_export(
    thoughts: &[Thought],
    scope: ExportScope,
    format: ExportFormat,
    date: &str,
) -> serde_json::Result<String> {
    let selected: Vec<Thought> = match scope {
        ExportScope::Day => thoughts
            .iter()
            .filter(|thought| thought.date() == date)
            .cloned()
            .collect(),
        ExportScope::All => thoughts.to_vec(),
    };

    match (format, scope) {
        (ExportFormat::Json, _) => serde_json::to_string_pretty(&selected),
        (ExportFormat::Markdown, ExportScope::Day) => Ok(markdown::day_file(date, &selected)),
        (ExportFormat::Markdown, ExportScope::All) => Ok(markdown::export_all(&selected)),
    }
}

/// Default file name for an export taken on `date`.
#[must_use]
pub fn suggested_export_file_name(scope: ExportScope, format: ExportFormat, date: &str) -> String {
    match (scope, format) {
        (ExportScope::Day, ExportFormat::Markdown) => markdown::day_export_file_name(date),
        (ExportScope::All, ExportFormat::Markdown) => markdown::full_export_file_name(date),
        (ExportScope::Day, format) => format!("thoughts-{date}.{}", format.extension()),
        (ExportScope::All, format) => format!("thoughts-export-{date}.{}", format.extension()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn thoughts() -> Vec<Thought> {
        vec![
            Thought::captured_at("today", Utc.with_ymd_and_hms(2024, 1, 2, 9, 15, 0).unwrap()),
            Thought::captured_at(
                "yesterday",
                Utc.with_ymd_and_hms(2024, 1, 1, 22, 0, 0).unwrap(),
            ),
        ]
    }

    #[test]
    fn day_export_keeps_only_that_day() {
        let rendered = render_export(
            &thoughts(),
            ExportScope::Day,
            ExportFormat::Markdown,
            "2024-01-02",
        )
        .unwrap();
        assert_eq!(rendered, "# Thoughts - 2024-01-02\n\n- **09:15**\n  today\n\n");
    }

    #[test]
    fn full_export_lists_newest_day_first() {
        let rendered = render_export(
            &thoughts(),
            ExportScope::All,
            ExportFormat::Markdown,
            "2024-01-02",
        )
        .unwrap();
        assert_eq!(
            rendered,
            "# Captured Thoughts\n\n## 2024-01-02\n\n- **09:15**\n  today\n\n## 2024-01-01\n\n- **22:00**\n  yesterday\n\n"
        );
    }

    #[test]
    fn json_export_round_trips() {
        let rendered =
            render_export(&thoughts(), ExportScope::All, ExportFormat::Json, "2024-01-02").unwrap();
        let parsed: Vec<Thought> = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, thoughts());
    }

    #[test]
    fn suggested_export_file_names() {
        assert_eq!(
            suggested_export_file_name(ExportScope::Day, ExportFormat::Markdown, "2024-01-02"),
            "thoughts-2024-01-02.md"
        );
        assert_eq!(
            suggested_export_file_name(ExportScope::All, ExportFormat::Markdown, "2024-01-02"),
            "thoughts-export-2024-01-02.md"
        );
        assert_eq!(
            suggested_export_file_name(ExportScope::All, ExportFormat::Json, "2024-01-02"),
            "thoughts-export-2024-01-02.json"
        );
    }
}
