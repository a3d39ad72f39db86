//! Forecast API client.

use std::time::Duration;

use reqwest::Client;
use tracing::instrument;
use url::Url;

use crate::retry::{with_retry, RetryPolicy};
use crate::types::WeatherError;

pub const DEFAULT_BASE_URL: &str = "https://andfun-weather.udacity.com";
const STATIC_ENDPOINT: &str = "staticweather";
const DYNAMIC_ENDPOINT: &str = "weather";
const USER_AGENT: &str = "Sunshine/0.1.0";

const QUERY_PARAM: &str = "q";
const LAT_PARAM: &str = "lat";
const LON_PARAM: &str = "lon";
const FORMAT_PARAM: &str = "mode";
const UNITS_PARAM: &str = "units";
const DAYS_PARAM: &str = "cnt";

const FORMAT: &str = "json";
const UNITS: &str = "metric";

/// What to ask the server a forecast for.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastQuery {
    Coordinates { latitude: f64, longitude: f64 },
    Location(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Use the live endpoint instead of the static sample data
    pub dynamic: bool,
    pub days: u32,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            dynamic: false,
            days: 14,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: Client,
    config: ClientConfig,
}

impl ForecastClient {
    pub fn new(config: ClientConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the request URL for a query.
    pub fn build_url(&self, query: &ForecastQuery) -> Result<Url, WeatherError> {
        let endpoint = if self.config.dynamic {
            DYNAMIC_ENDPOINT
        } else {
            STATIC_ENDPOINT
        };
        let mut url = Url::parse(&format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        ))?;

        {
            let mut pairs = url.query_pairs_mut();
            match query {
                ForecastQuery::Coordinates {
                    latitude,
                    longitude,
                } => {
                    pairs.append_pair(LAT_PARAM, &latitude.to_string());
                    pairs.append_pair(LON_PARAM, &longitude.to_string());
                }
                ForecastQuery::Location(location) => {
                    pairs.append_pair(QUERY_PARAM, location);
                }
            }
            pairs
                .append_pair(FORMAT_PARAM, FORMAT)
                .append_pair(UNITS_PARAM, UNITS)
                .append_pair(DAYS_PARAM, &self.config.days.to_string());
        }

        Ok(url)
    }

    /// Fetch the raw forecast body for a query.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(&self, query: &ForecastQuery) -> Result<String, WeatherError> {
        let url = self.build_url(query)?;
        tracing::debug!("Requesting forecast from {}", url);

        let response = with_retry(&self.config.retry, || self.client.get(url.clone()).send()).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.is_empty() {
            return Err(WeatherError::EmptyResponse);
        }

        Ok(body)
    }
}
