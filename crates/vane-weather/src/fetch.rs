//! Upstream weather fetchers.
//!
//! The upstream call is a stand-in for any external dependency. Two
//! backends behind one enum: a real HTTP client and a fixed-response
//! fetcher for development and simulated-upstream deployments.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::types::{FetchError, WeatherReport};

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m";

/// A single-attempt upstream fetch. Retries live in the engine, not here.
#[derive(Debug, Clone)]
pub enum Fetcher {
    /// Real upstream over HTTP.
    Http(HttpFetcher),

    /// Fixed response, no I/O.
    Static(StaticFetcher),
}

impl Fetcher {
    pub async fn fetch(&self, location: &str) -> Result<WeatherReport, FetchError> {
        match self {
            Self::Http(fetcher) => fetcher.fetch(location).await,
            Self::Static(fetcher) => Ok(fetcher.fetch(location)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UpstreamResponse {
    current: UpstreamCurrent,
}

#[derive(Debug, Deserialize)]
struct UpstreamCurrent {
    #[serde(rename = "temperature_2m")]
    temperature: f64,
    #[serde(rename = "relative_humidity_2m")]
    humidity: Option<f64>,
    #[serde(rename = "wind_speed_10m")]
    wind_speed: Option<f64>,
}

/// HTTP fetcher against an Open-Meteo-shaped endpoint.
///
/// A non-2xx status, a transport error, and a malformed payload are all
/// fetch failures; the caller decides whether to retry.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub async fn fetch(&self, location: &str) -> Result<WeatherReport, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("location", location), ("current", CURRENT_FIELDS)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamStatus(status.as_u16()));
        }

        let payload: UpstreamResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))?;

        Ok(WeatherReport {
            temperature: payload.current.temperature,
            conditions: "Operational".to_string(),
            humidity: payload.current.humidity,
            wind_speed: payload.current.wind_speed,
            cached: false,
        })
    }
}

/// Fetcher that always returns the same report.
#[derive(Debug, Clone)]
pub struct StaticFetcher {
    temperature: f64,
    conditions: String,
}

impl Default for StaticFetcher {
    fn default() -> Self {
        Self {
            temperature: 72.0,
            conditions: "Sunny".to_string(),
        }
    }
}

impl StaticFetcher {
    pub fn new(temperature: f64, conditions: impl Into<String>) -> Self {
        Self {
            temperature,
            conditions: conditions.into(),
        }
    }

    fn fetch(&self, _location: &str) -> WeatherReport {
        WeatherReport {
            temperature: self.temperature,
            conditions: self.conditions.clone(),
            humidity: None,
            wind_speed: None,
            cached: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn upstream_body(temperature: f64) -> serde_json::Value {
        serde_json::json!({
            "current": {
                "temperature_2m": temperature,
                "relative_humidity_2m": 40.0,
                "wind_speed_10m": 10.0
            }
        })
    }

    #[tokio::test]
    async fn test_http_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("location", "lubbock"))
            .respond_with(ResponseTemplate::new(200).set_body_json(upstream_body(70.0)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(
            format!("{}/v1/forecast", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();
        let report = fetcher.fetch("lubbock").await.unwrap();

        assert_eq!(report.temperature, 70.0);
        assert_eq!(report.conditions, "Operational");
        assert_eq!(report.humidity, Some(40.0));
        assert_eq!(report.wind_speed, Some(10.0));
        assert!(!report.cached);
    }

    #[tokio::test]
    async fn test_http_fetch_non_2xx_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch("lubbock").await.unwrap_err();

        assert!(matches!(err, FetchError::UpstreamStatus(503)));
    }

    #[tokio::test]
    async fn test_http_fetch_malformed_payload_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch("lubbock").await.unwrap_err();

        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_static_fetch_never_fails() {
        let fetcher = Fetcher::Static(StaticFetcher::default());
        let report = fetcher.fetch("anywhere").await.unwrap();

        assert_eq!(report.temperature, 72.0);
        assert_eq!(report.conditions, "Sunny");
        assert!(!report.cached);
    }
}
