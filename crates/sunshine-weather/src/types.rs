use serde::{Deserialize, Serialize};

/// Unit system used for display.
///
/// Forecast rows are always stored in metric; imperial is a presentation
/// concern only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Preference value for this unit system.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    /// Parse a stored preference value. Unknown values are rejected.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "metric" => Some(Self::Metric),
            "imperial" => Some(Self::Imperial),
            _ => None,
        }
    }

    pub fn is_metric(&self) -> bool {
        matches!(self, Self::Metric)
    }
}

impl std::fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weather condition categories mapped from OpenWeatherMap condition ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    LightClouds,
    Clouds,
    Fog,
    LightRain,
    Rain,
    Snow,
    Storm,
}

impl WeatherCondition {
    /// Convert an OpenWeatherMap condition id to a WeatherCondition
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_owm_id(id: i32) -> Self {
        match id {
            200..=232 => Self::Storm,
            300..=321 => Self::LightRain,
            511 => Self::Snow, // Freezing rain
            500..=531 => Self::Rain,
            600..=622 => Self::Snow,
            761 | 771 | 781 => Self::Storm, // Dust, squalls, tornado
            701..=781 => Self::Fog,
            800 => Self::Clear,
            801 => Self::LightClouds,
            802..=804 => Self::Clouds,
            900..=906 | 958..=962 => Self::Storm,
            951..=957 => Self::Clear,
            _ => Self::Clear,
        }
    }

    /// Get a human-readable category name
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::LightClouds => "Light Clouds",
            Self::Clouds => "Clouds",
            Self::Fog => "Fog",
            Self::LightRain => "Light Rain",
            Self::Rain => "Rain",
            Self::Snow => "Snow",
            Self::Storm => "Storm",
        }
    }

    /// Icon resource name for this condition
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "ic_clear",
            Self::LightClouds => "ic_light_clouds",
            Self::Clouds => "ic_cloudy",
            Self::Fog => "ic_fog",
            Self::LightRain => "ic_light_rain",
            Self::Rain => "ic_rain",
            Self::Snow => "ic_snow",
            Self::Storm => "ic_storm",
        }
    }
}

/// One day of forecast, ready for storage.
///
/// `date` is a normalized date: UTC millis at the start of a calendar day.
/// Temperatures are Celsius, wind speed is km/h, pressure is hPa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherValues {
    pub date: i64,
    pub weather_id: i32,
    pub min: f64,
    pub max: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub degrees: f64,
}

impl WeatherValues {
    pub fn condition(&self) -> WeatherCondition {
        WeatherCondition::from_owm_id(self.weather_id)
    }
}

/// City block of a forecast response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityInfo {
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

/// Result of parsing a forecast response
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedForecast {
    pub city: CityInfo,
    pub entries: Vec<WeatherValues>,
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Server returned status {status}")]
    Http { status: u16 },
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Empty response body")]
    EmptyResponse,
    #[error("Parse error: {0}")]
    Parse(String),
}

impl WeatherError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(_) => "Network error. Check your connection.",
            Self::Http { status } if *status >= 500 => {
                "Weather service unavailable. Please try again later."
            }
            Self::Http { .. } => "Weather request failed. Please try again.",
            Self::InvalidUrl(_) => "Weather service address is invalid. Check settings.",
            Self::EmptyResponse | Self::Parse(_) => "Received unexpected weather data.",
        }
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
