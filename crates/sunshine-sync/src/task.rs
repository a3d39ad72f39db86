//! One forecast sync: fetch, parse, and atomically replace the stored rows.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::Mutex;
use tracing::instrument;

use sunshine_core::{ApiConfig, Config, DefaultsConfig};
use sunshine_data::{PreferenceDefaults, Preferences, SharedDatabase, WeatherProvider};
use sunshine_weather::dates::normalized_utc_date_for_today;
use sunshine_weather::{parse_forecast, ClientConfig, ForecastClient, RetryPolicy, UnitSystem};

use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The stored forecast was replaced with this many rows.
    Updated(usize),
    /// The server had nothing usable; stored rows were kept.
    NoData,
}

pub struct SyncTask {
    client: ForecastClient,
    provider: Arc<WeatherProvider>,
    preferences: Preferences,
    running: Mutex<()>,
}

impl SyncTask {
    pub fn new(
        client: ForecastClient,
        provider: Arc<WeatherProvider>,
        preferences: Preferences,
    ) -> Self {
        Self {
            client,
            provider,
            preferences,
            running: Mutex::new(()),
        }
    }

    /// Wire a task to `db` using the `api` and `defaults` config sections.
    pub fn from_config(config: &Config, db: SharedDatabase) -> Result<Self, SyncError> {
        let client = ForecastClient::new(client_config(&config.api))?;
        let provider = Arc::new(WeatherProvider::new(db.clone()));
        let preferences = Preferences::new(db, preference_defaults(&config.defaults));
        Ok(Self::new(client, provider, preferences))
    }

    pub fn provider(&self) -> &Arc<WeatherProvider> {
        &self.provider
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Sync using the viewer's local date as day zero of the forecast.
    pub async fn sync_weather(&self) -> Result<SyncOutcome, SyncError> {
        let today = normalized_utc_date_for_today(&Local::now());
        self.sync_weather_for_day(today).await
    }

    /// Sync with `today` (a normalized date) as the date of the first row.
    ///
    /// Concurrent calls wait for each other. On any error the stored
    /// forecast is left as it was. A forecast fetched for a location the
    /// user has since replaced is discarded.
    #[instrument(skip(self), level = "info")]
    pub async fn sync_weather_for_day(&self, today: i64) -> Result<SyncOutcome, SyncError> {
        let _running = self.running.lock().await;

        let query = self.preferences.forecast_query()?;
        let body = self.client.fetch(&query).await?;

        let Some(forecast) = parse_forecast(&body, today)? else {
            tracing::info!("Server returned no forecast for {:?}", query);
            return Ok(SyncOutcome::NoData);
        };

        let current = self.preferences.record_resolved_location(
            &query,
            forecast.city.latitude,
            forecast.city.longitude,
            forecast.city.name.as_deref(),
        )?;
        if !current {
            tracing::info!("Location changed during sync, discarding forecast for {:?}", query);
            return Ok(SyncOutcome::NoData);
        }

        if forecast.entries.is_empty() {
            tracing::info!("Forecast response had no days, keeping stored rows");
            return Ok(SyncOutcome::NoData);
        }

        let stored = self.provider.replace_forecast(&forecast.entries)?;
        tracing::info!("Forecast sync stored {} days", stored);
        Ok(SyncOutcome::Updated(stored))
    }
}

pub fn client_config(api: &ApiConfig) -> ClientConfig {
    ClientConfig {
        base_url: api.base_url.clone(),
        dynamic: api.dynamic,
        days: api.days,
        timeout: Duration::from_secs(api.timeout_secs),
        retry: RetryPolicy {
            max_retries: api.retry_attempts,
            ..RetryPolicy::default()
        },
    }
}

pub fn preference_defaults(defaults: &DefaultsConfig) -> PreferenceDefaults {
    PreferenceDefaults {
        location: defaults.location.clone(),
        latitude: defaults.latitude,
        longitude: defaults.longitude,
        units: UnitSystem::parse(&defaults.units).unwrap_or_default(),
    }
}
