use thiserror::Error;

use sunshine_core::{
    AppError, ConfigError, DatabaseError, NetworkError, ReqwestErrorExt, RusqliteErrorExt,
};
use sunshine_data::DataError;
use sunshine_weather::WeatherError;

/// Why a forecast sync failed. The stored forecast is unchanged in every case.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Data(#[from] DataError),
}

impl SyncError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Weather(e) => e.user_message().to_string(),
            Self::Data(e) => e.user_message(),
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Weather(WeatherError::Network(e)) => {
                AppError::Network(e.into_network_error())
            }
            SyncError::Weather(WeatherError::Http { status }) => {
                AppError::Network(NetworkError::ServerError {
                    status,
                    message: format!("forecast request returned {}", status),
                })
            }
            SyncError::Weather(WeatherError::EmptyResponse) => AppError::Network(
                NetworkError::InvalidResponse("empty response body".to_string()),
            ),
            SyncError::Weather(e @ WeatherError::InvalidUrl(_)) => {
                AppError::Config(ConfigError::Invalid(e.to_string()))
            }
            SyncError::Weather(WeatherError::Parse(message)) => AppError::Forecast(message),
            SyncError::Data(DataError::Database(e)) => AppError::Database(e.into_database_error()),
            SyncError::Data(DataError::Io(e)) => AppError::Io(e),
            SyncError::Data(e @ DataError::DateNotNormalized(_)) => {
                AppError::Database(DatabaseError::Rejected(e.to_string()))
            }
            SyncError::Data(e) => AppError::Database(DatabaseError::QueryFailed(e.to_string())),
        }
    }
}
