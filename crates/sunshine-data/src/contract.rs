//! Names shared by everything that reads or writes the local store: the
//! content authority, URIs, table and column names.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone};
use sunshine_weather::dates::normalized_utc_date_for_today;

use crate::error::DataError;

pub const CONTENT_SCHEME: &str = "content";
pub const CONTENT_AUTHORITY: &str = "example.com.sunshine";
pub const PATH_WEATHER: &str = "weather";

/// Table and column names of the weather table.
pub mod weather_entry {
    pub const TABLE_NAME: &str = "weather";
    pub const COLUMN_ID: &str = "_id";
    pub const COLUMN_DATE: &str = "date";
    pub const COLUMN_WEATHER_ID: &str = "weatherId";
    pub const COLUMN_MIN_TEMP: &str = "min";
    pub const COLUMN_MAX_TEMP: &str = "max";
    pub const COLUMN_HUMIDITY: &str = "humidity";
    pub const COLUMN_PRESSURE: &str = "pressure";
    pub const COLUMN_WIND_SPEED: &str = "wind";
    pub const COLUMN_DEGREES: &str = "degrees";

    /// A second row for an existing date replaces the first.
    pub const CREATE_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS weather (
            _id INTEGER PRIMARY KEY AUTOINCREMENT,
            date INTEGER NOT NULL,
            weatherId INTEGER NOT NULL,
            min REAL NOT NULL,
            max REAL NOT NULL,
            humidity REAL NOT NULL,
            pressure REAL NOT NULL,
            wind REAL NOT NULL,
            degrees REAL NOT NULL,
            UNIQUE (date) ON CONFLICT REPLACE
        );
    "#;

    pub const DROP_TABLE: &str = "DROP TABLE IF EXISTS weather;";
}

/// A `content://authority/path/...` address naming data in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentUri {
    authority: String,
    segments: Vec<String>,
}

impl ContentUri {
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            segments: Vec::new(),
        }
    }

    /// Append a path segment.
    #[must_use]
    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn last_segment(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Whether `self` is `other` or lies beneath it.
    pub fn is_descendant_of(&self, other: &ContentUri) -> bool {
        self.authority == other.authority && self.segments.starts_with(&other.segments)
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", CONTENT_SCHEME, self.authority)?;
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for ContentUri {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(CONTENT_SCHEME)
            .and_then(|r| r.strip_prefix("://"))
            .ok_or_else(|| DataError::InvalidUri(s.to_string()))?;

        let mut parts = rest.split('/');
        let authority = parts
            .next()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| DataError::InvalidUri(s.to_string()))?;

        Ok(Self {
            authority: authority.to_string(),
            segments: parts
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

/// `content://example.com.sunshine/weather`
pub fn weather_uri() -> ContentUri {
    ContentUri::new(CONTENT_AUTHORITY).with_segment(PATH_WEATHER)
}

/// URI of the single row for a normalized date.
pub fn weather_uri_with_date(date: i64) -> ContentUri {
    weather_uri().with_segment(date.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Literal(String),
    /// `#`: a run of digits
    Number,
    /// `*`: any single segment
    Text,
}

impl PatternSegment {
    fn matches(&self, segment: &str) -> bool {
        match self {
            Self::Literal(lit) => lit == segment,
            Self::Number => !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()),
            Self::Text => !segment.is_empty(),
        }
    }
}

/// Maps URIs to codes using `authority` + path patterns where `#` matches a
/// number and `*` matches any segment.
#[derive(Debug, Clone)]
pub struct UriMatcher<T> {
    routes: Vec<(String, Vec<PatternSegment>, T)>,
}

impl<T: Copy> Default for UriMatcher<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T: Copy> UriMatcher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_uri(&mut self, authority: &str, path: &str, code: T) {
        let pattern = path
            .split('/')
            .filter(|p| !p.is_empty())
            .map(|p| match p {
                "#" => PatternSegment::Number,
                "*" => PatternSegment::Text,
                lit => PatternSegment::Literal(lit.to_string()),
            })
            .collect();
        self.routes.push((authority.to_string(), pattern, code));
    }

    /// Code of the first route matching `uri`, if any.
    pub fn match_uri(&self, uri: &ContentUri) -> Option<T> {
        self.routes
            .iter()
            .find(|(authority, pattern, _)| {
                authority == uri.authority()
                    && pattern.len() == uri.segments().len()
                    && pattern
                        .iter()
                        .zip(uri.segments())
                        .all(|(p, s)| p.matches(s))
            })
            .map(|(_, _, code)| *code)
    }
}

/// Codes for the URIs the weather provider serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriCode {
    Weather,
    WeatherWithDate,
}

pub fn build_uri_matcher() -> UriMatcher<UriCode> {
    let mut matcher = UriMatcher::new();
    matcher.add_uri(CONTENT_AUTHORITY, PATH_WEATHER, UriCode::Weather);
    matcher.add_uri(
        CONTENT_AUTHORITY,
        &format!("{}/#", PATH_WEATHER),
        UriCode::WeatherWithDate,
    );
    matcher
}

/// Row filter for weather queries and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    DateFrom(i64),
    DateEquals(i64),
}

impl Selection {
    /// SQL `WHERE` clause and its single optional argument.
    pub(crate) fn to_sql(self) -> (&'static str, Option<i64>) {
        match self {
            Self::All => ("", None),
            Self::DateFrom(date) => (" WHERE date >= ?1", Some(date)),
            Self::DateEquals(date) => (" WHERE date = ?1", Some(date)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    DateAscending,
    DateDescending,
}

impl SortOrder {
    pub(crate) fn to_sql(self) -> &'static str {
        match self {
            Self::DateAscending => " ORDER BY date ASC",
            Self::DateDescending => " ORDER BY date DESC",
        }
    }
}

/// Rows whose date is today (in the viewer's calendar) or later.
pub fn select_today_onwards<Tz: TimeZone>(now: &DateTime<Tz>) -> Selection {
    Selection::DateFrom(normalized_utc_date_for_today(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_weather_uri_display() {
        assert_eq!(
            weather_uri().to_string(),
            "content://example.com.sunshine/weather"
        );
        assert_eq!(
            weather_uri_with_date(1_717_804_800_000).to_string(),
            "content://example.com.sunshine/weather/1717804800000"
        );
    }

    #[test]
    fn test_parse_uri() {
        let uri: ContentUri = "content://example.com.sunshine/weather/42".parse().unwrap();
        assert_eq!(uri.authority(), CONTENT_AUTHORITY);
        assert_eq!(uri.segments(), &["weather".to_string(), "42".to_string()]);
        assert_eq!(uri.last_segment(), Some("42"));
        assert_eq!(uri, weather_uri_with_date(42));
    }

    #[test]
    fn test_parse_invalid_uri() {
        assert!("http://example.com/weather".parse::<ContentUri>().is_err());
        assert!("content:///weather".parse::<ContentUri>().is_err());
    }

    #[test]
    fn test_matcher_weather() {
        let matcher = build_uri_matcher();
        assert_eq!(matcher.match_uri(&weather_uri()), Some(UriCode::Weather));
    }

    #[test]
    fn test_matcher_weather_with_date() {
        let matcher = build_uri_matcher();
        assert_eq!(
            matcher.match_uri(&weather_uri_with_date(1_717_804_800_000)),
            Some(UriCode::WeatherWithDate)
        );
    }

    #[test]
    fn test_matcher_rejects_non_numeric_date() {
        let matcher = build_uri_matcher();
        let uri = weather_uri().with_segment("today");
        assert_eq!(matcher.match_uri(&uri), None);
    }

    #[test]
    fn test_matcher_number_is_digits_only() {
        let matcher = build_uri_matcher();
        for segment in ["-86400000", "+5", "1e9", "12 "] {
            let uri = weather_uri().with_segment(segment);
            assert_eq!(matcher.match_uri(&uri), None, "segment {:?}", segment);
        }
    }

    #[test]
    fn test_matcher_rejects_other_authority_and_paths() {
        let matcher = build_uri_matcher();
        assert_eq!(
            matcher.match_uri(&ContentUri::new("other.authority").with_segment("weather")),
            None
        );
        assert_eq!(
            matcher.match_uri(&ContentUri::new(CONTENT_AUTHORITY).with_segment("location")),
            None
        );
        assert_eq!(
            matcher.match_uri(&weather_uri_with_date(1).with_segment("extra")),
            None
        );
    }

    #[test]
    fn test_wildcard_segment() {
        let mut matcher = UriMatcher::new();
        matcher.add_uri("a", "items/*", 7);
        assert_eq!(
            matcher.match_uri(&ContentUri::new("a").with_segment("items").with_segment("x")),
            Some(7)
        );
    }

    #[test]
    fn test_descendant() {
        assert!(weather_uri_with_date(5).is_descendant_of(&weather_uri()));
        assert!(!weather_uri().is_descendant_of(&weather_uri_with_date(5)));
    }

    #[test]
    fn test_select_today_onwards() {
        let now = Utc.with_ymd_and_hms(2024, 6, 8, 15, 30, 0).unwrap();
        assert_eq!(
            select_today_onwards(&now),
            Selection::DateFrom(1_717_804_800_000)
        );
    }
}
