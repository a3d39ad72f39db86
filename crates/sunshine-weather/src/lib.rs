//! Forecast retrieval for Sunshine
//!
//! Builds forecast requests, fetches them with bounded retry, parses the
//! JSON response into normalized daily rows, and formats stored values for
//! display.

pub mod client;
pub mod dates;
pub mod format;
pub mod json;
pub mod retry;
pub mod types;

pub use client::{ClientConfig, ForecastClient, ForecastQuery};
pub use json::parse_forecast;
pub use retry::RetryPolicy;
pub use types::*;
