//! Markdown representation of thoughts.
//!
//! One file per day, one list entry per thought:
//!
//! ```text
//! # Thoughts - 2024-01-01
//!
//! - **10:00** | 📍 Warsaw, Poland | [52.2297, 21.0122](https://www.google.com/maps?q=52.2297,21.0122)
//!   First line
//!   second line
//! ```
//!
//! The remote copy doubles as a human-readable archive, so decoding tolerates
//! hand edits: anything it does not recognize is skipped rather than rejected.
//! Times are `HH:MM` in UTC, so a decoded thought has whole-minute precision.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::{NaiveTime, TimeZone, Utc};
use regex::Regex;

use crate::models::{Location, Thought, ThoughtId};
use crate::util::{format_time, normalize_text_option, parse_date_key};

const BODY_INDENT: &str = "  ";

static ENTRY_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-\s+\*\*").expect("valid entry marker regex"));

static ENTRY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\s+\*\*(\d{2}):(\d{2})\*\*(.*)$").expect("valid entry header regex")
});

static LOCATION_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*\|\s*📍\s*(?:(.*?)\s*\|\s*)?\[\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*\](?:\([^)]*\))?\s*$",
    )
    .expect("valid location segment regex")
});

/// Render one thought as a list entry (no trailing newline).
#[must_use]
pub fn encode(thought: &Thought) -> String {
    let time = format_time(thought.timestamp);
    let location = thought
        .location
        .as_ref()
        .map(encode_location)
        .unwrap_or_default();
    let body = thought
        .text
        .replace("\r\n", "\n")
        .replace('\n', &format!("\n{BODY_INDENT}"));
    format!("- **{time}**{location}\n{BODY_INDENT}{body}")
}

fn encode_location(location: &Location) -> String {
    let coords = format!(
        "[{}, {}]({})",
        location.lat,
        location.lon,
        location.maps_url()
    );
    match location.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => {
            let name = name.replace(['\n', '\r', '|'], " ");
            format!(" | 📍 {name} | {coords}")
        }
        _ => format!(" | 📍 {coords}"),
    }
}

/// Parse every recognizable entry of a day file.
///
/// Timestamps are rebuilt as `<date>T<HH:MM>:00Z`, ids from that instant,
/// and every result is marked synced since it came from the remote copy.
#[must_use]
pub fn decode(markdown: &str, date: &str) -> Vec<Thought> {
    let Some(day) = parse_date_key(date) else {
        tracing::warn!("Cannot decode markdown for invalid date '{}'", date);
        return Vec::new();
    };

    let lines: Vec<&str> = markdown.lines().collect();
    let mut thoughts = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let Some(header) = ENTRY_HEADER.captures(lines[idx]) else {
            idx += 1;
            continue;
        };
        idx += 1;

        let time = header[1]
            .parse()
            .ok()
            .zip(header[2].parse().ok())
            .and_then(|(hour, minute)| NaiveTime::from_hms_opt(hour, minute, 0));
        let location = parse_location_segment(&header[3]);

        // Body: starts on the next (indented) line and runs until a blank
        // line, a heading, the next entry or end of text.
        let mut body = Vec::new();
        if lines
            .get(idx)
            .is_some_and(|line| line.starts_with(char::is_whitespace) && !line.trim().is_empty())
        {
            while idx < lines.len() {
                let line = lines[idx];
                if line.is_empty() || line.starts_with('#') || ENTRY_MARKER.is_match(line) {
                    break;
                }
                body.push(line.strip_prefix(BODY_INDENT).unwrap_or_else(|| line.trim_start()));
                idx += 1;
            }
        }

        let (Some(time), Some(location), Some(text)) =
            (time, location, normalize_text_option(Some(body.join("\n"))))
        else {
            tracing::debug!("Skipping unrecognized entry near line {}", idx);
            continue;
        };

        let timestamp = Utc.from_utc_datetime(&day.and_time(time));
        thoughts.push(Thought {
            id: ThoughtId::from_timestamp(timestamp),
            text,
            timestamp,
            location,
            synced: true,
        });
    }

    thoughts
}

/// `Some(None)` for an empty segment, `Some(Some(..))` for a recognized
/// location, `None` when the header carries something unrecognizable.
fn parse_location_segment(segment: &str) -> Option<Option<Location>> {
    if segment.trim().is_empty() {
        return Some(None);
    }
    let captures = LOCATION_SEGMENT.captures(segment)?;
    let lat = captures[2].parse().ok()?;
    let lon = captures[3].parse().ok()?;
    let mut location = Location::new(lat, lon);
    location.name = normalize_text_option(captures.get(1).map(|name| name.as_str().to_string()));
    Some(Some(location))
}

/// Thoughts ordered oldest first (stable for equal timestamps).
fn chronological<'a>(thoughts: impl IntoIterator<Item = &'a Thought>) -> Vec<&'a Thought> {
    let mut ordered: Vec<&Thought> = thoughts.into_iter().collect();
    ordered.sort_by_key(|thought| thought.timestamp);
    ordered
}

/// Encoded entries, oldest first, each followed by a blank line.
#[must_use]
pub fn encode_entries(thoughts: &[Thought]) -> String {
    let mut output = String::new();
    for thought in chronological(thoughts) {
        output.push_str(&encode(thought));
        output.push_str("\n\n");
    }
    output
}

/// A fresh day file: heading followed by the entries.
#[must_use]
pub fn day_file(date: &str, thoughts: &[Thought]) -> String {
    format!("# Thoughts - {date}\n\n{}", encode_entries(thoughts))
}

/// Append entries to the current remote content of a day file, or start a
/// new file when there is none.
#[must_use]
pub fn append_to_day_file(existing: Option<&str>, date: &str, thoughts: &[Thought]) -> String {
    match existing.filter(|content| !content.is_empty()) {
        Some(content) => format!("{}\n\n{}", content.trim_end(), encode_entries(thoughts)),
        None => day_file(date, thoughts),
    }
}

/// Render every thought as a single document, newest day first.
#[must_use]
pub fn export_all(thoughts: &[Thought]) -> String {
    let mut by_date: BTreeMap<String, Vec<Thought>> = BTreeMap::new();
    for thought in thoughts {
        by_date
            .entry(thought.date())
            .or_default()
            .push(thought.clone());
    }

    let mut output = String::from("# Captured Thoughts\n\n");
    for (date, day) in by_date.iter().rev() {
        let _ = write!(output, "## {date}\n\n");
        output.push_str(&encode_entries(day));
    }
    output
}

/// File name for a single-day export.
#[must_use]
pub fn day_export_file_name(date: &str) -> String {
    format!("thoughts-{date}.md")
}

/// File name for a full export taken on `date`.
#[must_use]
pub fn full_export_file_name(date: &str) -> String {
    format!("thoughts-export-{date}.md")
}
