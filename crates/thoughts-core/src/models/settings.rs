//! Sync and input settings models

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// Default remote path template; `{date}` is replaced with `YYYY-MM-DD`.
pub const DEFAULT_PATH_TEMPLATE: &str = "Daily Notes/{date}.md";
/// Default branch commits land on.
pub const DEFAULT_BRANCH: &str = "main";

/// When captures are pushed to the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Sync on capture and pull on startup
    #[default]
    Auto,
    /// Sync only when asked
    Manual,
}

/// Capture input style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// One line, Enter captures
    Single,
    /// Multi-line, Ctrl+Enter captures
    #[default]
    Multiline,
}

impl InputMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multiline => "multiline",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "single" => Some(Self::Single),
            "multiline" => Some(Self::Multiline),
            _ => None,
        }
    }
}

/// Remote sync configuration. Absence of a stored value disables sync.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    /// Static bearer credential
    pub token: String,
    /// Repository in `owner/name` form
    pub repo: String,
    /// Path template containing a `{date}` placeholder
    pub path: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub sync_mode: SyncMode,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

impl std::fmt::Debug for SyncSettings {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncSettings")
            .field("token", &"[REDACTED]")
            .field("repo", &self.repo)
            .field("path", &self.path)
            .field("branch", &self.branch)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

impl SyncSettings {
    /// Build validated settings; token, repo and path are required.
    pub fn new(
        token: impl Into<String>,
        repo: impl Into<String>,
        path: Option<String>,
        branch: Option<String>,
        sync_mode: SyncMode,
    ) -> Result<Self> {
        let token = normalize_text_option(Some(token.into()))
            .ok_or_else(|| Error::InvalidInput("sync token must not be empty".into()))?;
        let repo = normalize_text_option(Some(repo.into()))
            .ok_or_else(|| Error::InvalidInput("sync repo must not be empty".into()))?;
        if !repo.contains('/') {
            return Err(Error::InvalidInput(
                "sync repo must be in owner/name form".into(),
            ));
        }
        let path = normalize_text_option(path).unwrap_or_else(|| DEFAULT_PATH_TEMPLATE.into());
        let branch = normalize_text_option(branch).unwrap_or_else(default_branch);

        Ok(Self {
            token,
            repo,
            path,
            branch,
            sync_mode,
        })
    }

    /// Remote path of the file for a given date
    pub fn path_for(&self, date: &str) -> String {
        self.path.replace("{date}", date)
    }

    pub const fn is_auto(&self) -> bool {
        matches!(self.sync_mode, SyncMode::Auto)
    }
}
