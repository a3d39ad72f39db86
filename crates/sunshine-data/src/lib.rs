//! Local storage for Sunshine.
//!
//! A SQLite database holds the forecast rows, keyed by normalized date, and
//! the user's preferences. Rows are read and written through
//! [`WeatherProvider`] using `content://` URIs.

pub mod contract;
pub mod database;
pub mod error;
pub mod preferences;
pub mod provider;

pub use contract::{
    select_today_onwards, weather_uri, weather_uri_with_date, ContentUri, Selection, SortOrder,
};
pub use database::{SharedDatabase, WeatherDatabase};
pub use error::DataError;
pub use preferences::{PreferenceDefaults, Preferences};
pub use provider::{ChangeEvent, WeatherEntry, WeatherProvider};
