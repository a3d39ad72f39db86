//! Local store error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Unknown URI: {0}")]
    UnknownUri(String),

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("{operation} is not supported for {uri}")]
    Unsupported {
        operation: &'static str,
        uri: String,
    },

    #[error("Dates must be normalized, got {0}")]
    DateNotNormalized(i64),

    #[error("Invalid value for preference {key}: {value}")]
    InvalidPreference { key: String, value: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownUri(_) | Self::InvalidUri(_) | Self::Unsupported { .. } => {
                "Unsupported data request".to_string()
            }
            Self::DateNotNormalized(_) => "Forecast data was rejected".to_string(),
            Self::InvalidPreference { key, .. } => format!("Invalid setting: {}", key),
            Self::Database(_) | Self::Io(_) => {
                "Local data error. Try restarting the app.".to_string()
            }
        }
    }
}
