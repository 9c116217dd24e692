//! Reverse geocoding against a Nominatim (OpenStreetMap) endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::util::{is_http_url, normalize_text_option};

pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Nominatim's usage policy requires an identifying client.
pub const GEOCODER_USER_AGENT: &str = concat!(
    "thoughts/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/ishakuta/thoughts)"
);

const GEOCODE_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Invalid geocoder configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Geocoding failed: HTTP {0}")]
    Api(u16),
}

/// Coordinates → human-readable place name.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// `Ok(None)` when the service knows nothing useful about the spot.
    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<String>, GeocodeError>;
}

#[derive(Clone)]
pub struct NominatimClient {
    base_url: String,
    client: reqwest::Client,
}

impl NominatimClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GeocodeError> {
        let base_url = normalize_text_option(Some(base_url.into()))
            .filter(|url| is_http_url(url))
            .ok_or_else(|| {
                GeocodeError::InvalidConfiguration(
                    "geocoder URL must include http:// or https://".to_string(),
                )
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .user_agent(GEOCODER_USER_AGENT)
                .timeout(Duration::from_secs(GEOCODE_HTTP_TIMEOUT_SECS))
                .build()?,
        })
    }

    pub fn openstreetmap() -> Result<Self, GeocodeError> {
        Self::new(NOMINATIM_BASE_URL)
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimClient {
    async fn reverse(&self, lat: f64, lon: f64) -> Result<Option<String>, GeocodeError> {
        let response = self
            .client
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("format", "json".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Api(response.status().as_u16()));
        }

        let payload = response.json::<ReverseResponse>().await?;
        Ok(payload.address.as_ref().and_then(Address::place_name))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

impl Address {
    fn place_name(&self) -> Option<String> {
        let locality = [
            &self.city,
            &self.town,
            &self.village,
            &self.municipality,
            &self.county,
        ]
        .into_iter()
        .find_map(|field| normalize_text_option(field.clone()));
        let country = normalize_text_option(self.country.clone());

        match (locality, country) {
            (Some(locality), Some(country)) => Some(format!("{locality}, {country}")),
            (Some(locality), None) => Some(locality),
            (None, Some(country)) => Some(country),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn place_name_prefers_city_then_smaller_localities() {
        let address = Address {
            town: Some("Zakopane".into()),
            county: Some("Tatra County".into()),
            country: Some("Poland".into()),
            ..Address::default()
        };
        assert_eq!(address.place_name().as_deref(), Some("Zakopane, Poland"));

        let country_only = Address {
            country: Some("Poland".into()),
            ..Address::default()
        };
        assert_eq!(country_only.place_name().as_deref(), Some("Poland"));

        let locality_only = Address {
            village: Some("Hel".into()),
            ..Address::default()
        };
        assert_eq!(locality_only.place_name().as_deref(), Some("Hel"));

        assert_eq!(Address::default().place_name(), None);
    }

    #[test]
    fn client_rejects_invalid_url() {
        assert!(NominatimClient::new("nominatim.local").is_err());
        assert!(NominatimClient::new("  ").is_err());
    }

    #[tokio::test]
    async fn reverse_combines_city_and_country() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("lat", "52.2297"))
            .and(query_param("lon", "21.0122"))
            .and(query_param("format", "json"))
            .and(header("user-agent", GEOCODER_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "address": { "city": "Warsaw", "country": "Poland" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = NominatimClient::new(server.uri()).unwrap();
        let name = client.reverse(52.2297, 21.0122).await.unwrap();
        assert_eq!(name.as_deref(), Some("Warsaw, Poland"));
    }

    #[tokio::test]
    async fn reverse_without_address_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "error": "Unable to geocode" })),
            )
            .mount(&server)
            .await;

        let client = NominatimClient::new(server.uri()).unwrap();
        assert_eq!(client.reverse(0.0, 0.0).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reverse_surfaces_http_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = NominatimClient::new(server.uri()).unwrap();
        let error = client.reverse(1.0, 2.0).await.unwrap_err();
        assert!(matches!(error, GeocodeError::Api(429)));
    }
}
