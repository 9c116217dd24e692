//! Endpoint configuration for client apps.
//!
//! Clients start from the public defaults and may override each endpoint
//! (for self-hosted Nominatim, GitHub Enterprise, or test servers).

use serde::{Deserialize, Serialize};

use crate::geocode::NOMINATIM_BASE_URL;
use crate::remote::GITHUB_API_URL;
use crate::util::{is_http_url, normalize_text_option};

/// Base URLs of the external services the client talks to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub github_api_url: String,
    pub nominatim_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            github_api_url: GITHUB_API_URL.to_string(),
            nominatim_url: NOMINATIM_BASE_URL.to_string(),
        }
    }
}

impl EndpointConfig {
    /// Apply optional overrides; blank overrides are ignored.
    pub fn with_overrides(
        github_api_url: Option<String>,
        nominatim_url: Option<String>,
    ) -> Result<Self, String> {
        let defaults = Self::default();
        Ok(Self {
            github_api_url: match normalize_text_option(github_api_url) {
                Some(url) => normalize_required_http_url(url, "github_api_url")?,
                None => defaults.github_api_url,
            },
            nominatim_url: match normalize_text_option(nominatim_url) {
                Some(url) => normalize_required_http_url(url, "nominatim_url")?,
                None => defaults.nominatim_url,
            },
        })
    }
}

fn normalize_required_http_url(raw: String, field: &str) -> Result<String, String> {
    let value = normalize_text_option(Some(raw))
        .ok_or_else(|| format!("endpoint '{field}' is required"))?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(format!("endpoint '{field}' must include http:// or https://"))
    }
}
