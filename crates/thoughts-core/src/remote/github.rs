//! GitHub contents API client.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{RemoteFile, RemoteFileStore};
use crate::models::SyncSettings;
use crate::sync::{SyncError, SyncResult};
use crate::util::{compact_text, is_http_url, normalize_text_option};

pub const GITHUB_API_URL: &str = "https://api.github.com";
pub const GITHUB_USER_AGENT: &str = concat!("thoughts/", env!("CARGO_PKG_VERSION"));

const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";
const GITHUB_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct GitHubContentsClient {
    api_url: String,
    client: reqwest::Client,
}

impl GitHubContentsClient {
    pub fn new(api_url: impl Into<String>) -> SyncResult<Self> {
        let api_url = normalize_text_option(Some(api_url.into()))
            .filter(|url| is_http_url(url))
            .ok_or_else(|| {
                SyncError::InvalidConfiguration(
                    "GitHub API URL must include http:// or https://".to_string(),
                )
            })?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .user_agent(GITHUB_USER_AGENT)
                .timeout(Duration::from_secs(GITHUB_HTTP_TIMEOUT_SECS))
                .build()?,
        })
    }

    pub fn github() -> SyncResult<Self> {
        Self::new(GITHUB_API_URL)
    }

    fn contents_url(&self, settings: &SyncSettings, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_url,
            settings.repo.trim_matches('/'),
            encode_path(path)
        )
    }
}

#[async_trait]
impl RemoteFileStore for GitHubContentsClient {
    async fn fetch(&self, settings: &SyncSettings, path: &str) -> SyncResult<Option<RemoteFile>> {
        let response = self
            .client
            .get(self.contents_url(settings, path))
            .query(&[("ref", settings.branch.as_str())])
            .bearer_auth(&settings.token)
            .header("Accept", GITHUB_ACCEPT)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Remote file {} does not exist yet", path);
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                message: parse_api_error(status, &body),
            });
        }

        let payload = response.json::<ContentsResponse>().await?;
        payload.try_into().map(Some)
    }

    async fn store(
        &self,
        settings: &SyncSettings,
        path: &str,
        content: &str,
        message: &str,
        revision: Option<&str>,
    ) -> SyncResult<()> {
        let body = PutContentsRequest {
            message,
            content: STANDARD.encode(content.as_bytes()),
            sha: revision,
            branch: &settings.branch,
        };

        let response = self
            .client
            .put(self.contents_url(settings, path))
            .bearer_auth(&settings.token)
            .header("Accept", GITHUB_ACCEPT)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Api {
                status: status.as_u16(),
                message: parse_api_error(status, &body),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: Option<String>,
    sha: Option<String>,
}

impl TryFrom<ContentsResponse> for RemoteFile {
    type Error = SyncError;

    fn try_from(value: ContentsResponse) -> SyncResult<Self> {
        let revision = value
            .sha
            .and_then(|sha| normalize_text_option(Some(sha)))
            .ok_or_else(|| SyncError::InvalidPayload("response did not include sha".into()))?;

        // GitHub wraps the base64 body at 60 columns
        let encoded: String = value
            .content
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = STANDARD.decode(encoded).map_err(|error| {
            SyncError::InvalidPayload(format!("invalid base64 content: {error}"))
        })?;
        let content = String::from_utf8(bytes)
            .map_err(|_| SyncError::InvalidPayload("file content is not UTF-8".into()))?;

        Ok(Self { content, revision })
    }
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<GitHubErrorBody>(body) {
        if let Some(message) = payload.message {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

/// Percent-encode each path segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
