//! User preferences stored as key/value rows next to the forecast.

use rusqlite::{params, Connection, OptionalExtension};

use sunshine_weather::{ForecastQuery, UnitSystem};

use crate::database::SharedDatabase;
use crate::error::DataError;

pub const PREF_LOCATION: &str = "location";
pub const PREF_UNITS: &str = "units";
pub const PREF_CITY_NAME: &str = "city_name";
pub const PREF_COORD_LAT: &str = "coord_lat";
pub const PREF_COORD_LON: &str = "coord_lon";

/// Values used when the user has not chosen anything yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceDefaults {
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub units: UnitSystem,
}

impl Default for PreferenceDefaults {
    fn default() -> Self {
        Self {
            location: "94043, USA".to_string(),
            latitude: 37.4284,
            longitude: -122.0724,
            units: UnitSystem::Metric,
        }
    }
}

#[derive(Clone)]
pub struct Preferences {
    db: SharedDatabase,
    defaults: PreferenceDefaults,
}

impl Preferences {
    pub fn new(db: SharedDatabase, defaults: PreferenceDefaults) -> Self {
        Self { db, defaults }
    }

    pub fn defaults(&self) -> &PreferenceDefaults {
        &self.defaults
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, DataError> {
        let db = self.db.lock();
        read_value(db.conn(), key)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), DataError> {
        let db = self.db.lock();
        db.conn().execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        tracing::debug!("Preference {} set to {}", key, value);
        Ok(())
    }

    /// The location string the user asked for, or the default.
    pub fn preferred_location(&self) -> Result<String, DataError> {
        let db = self.db.lock();
        read_location(db.conn(), &self.defaults)
    }

    /// Change the location. Coordinates belonged to the old location and are
    /// cleared; the next sync fills them in again.
    pub fn set_location(&self, location: &str) -> Result<(), DataError> {
        let mut db = self.db.lock();
        let tx = db.conn_mut().transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![PREF_LOCATION, location],
        )?;
        clear_location_details(&tx)?;
        tx.commit()?;
        tracing::info!("Location set to {}", location);
        Ok(())
    }

    /// Store what the server resolved for `query`, unless the location was
    /// changed since `query` was built. Returns whether anything was written.
    ///
    /// The check and the writes happen under one lock, so a concurrent
    /// [`Preferences::set_location`] either lands before (and the details
    /// are dropped) or after (and clears them).
    pub fn record_resolved_location(
        &self,
        query: &ForecastQuery,
        latitude: f64,
        longitude: f64,
        city_name: Option<&str>,
    ) -> Result<bool, DataError> {
        let mut db = self.db.lock();
        let tx = db.conn_mut().transaction()?;

        if read_query(&tx, &self.defaults)? != *query {
            return Ok(false);
        }

        write_coordinates(&tx, latitude, longitude)?;
        if let Some(name) = city_name.filter(|n| !n.is_empty()) {
            tx.execute(
                "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
                params![PREF_CITY_NAME, name],
            )?;
        }
        tx.commit()?;
        Ok(true)
    }

    pub fn city_name(&self) -> Result<Option<String>, DataError> {
        self.get(PREF_CITY_NAME)
    }

    /// Stored coordinates, if both are present.
    pub fn location_coordinates(&self) -> Result<Option<(f64, f64)>, DataError> {
        let db = self.db.lock();
        read_coordinates(db.conn())
    }

    pub fn is_location_available(&self) -> Result<bool, DataError> {
        Ok(self.location_coordinates()?.is_some())
    }

    /// Display units. An unreadable stored value falls back to the default.
    pub fn units(&self) -> Result<UnitSystem, DataError> {
        let units = match self.get(PREF_UNITS)? {
            None => self.defaults.units,
            Some(raw) => UnitSystem::parse(&raw).unwrap_or_else(|| {
                tracing::warn!("Ignoring unknown units preference {:?}", raw);
                self.defaults.units
            }),
        };
        Ok(units)
    }

    pub fn is_metric(&self) -> Result<bool, DataError> {
        Ok(self.units()?.is_metric())
    }

    pub fn set_units(&self, units: UnitSystem) -> Result<(), DataError> {
        self.set(PREF_UNITS, units.as_str())
    }

    /// What to ask the server for: coordinates when known, else the location
    /// string.
    pub fn forecast_query(&self) -> Result<ForecastQuery, DataError> {
        let db = self.db.lock();
        read_query(db.conn(), &self.defaults)
    }
}

fn read_value(conn: &Connection, key: &str) -> Result<Option<String>, DataError> {
    let value = conn
        .query_row(
            "SELECT value FROM preferences WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn read_f64(conn: &Connection, key: &str) -> Result<Option<f64>, DataError> {
    match read_value(conn, key)? {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| DataError::InvalidPreference {
                key: key.to_string(),
                value: raw,
            }),
    }
}

fn read_location(conn: &Connection, defaults: &PreferenceDefaults) -> Result<String, DataError> {
    Ok(read_value(conn, PREF_LOCATION)?
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| defaults.location.clone()))
}

fn read_coordinates(conn: &Connection) -> Result<Option<(f64, f64)>, DataError> {
    let lat = read_f64(conn, PREF_COORD_LAT)?;
    let lon = read_f64(conn, PREF_COORD_LON)?;
    Ok(lat.zip(lon))
}

fn read_query(conn: &Connection, defaults: &PreferenceDefaults) -> Result<ForecastQuery, DataError> {
    match read_coordinates(conn)? {
        Some((latitude, longitude)) => Ok(ForecastQuery::Coordinates {
            latitude,
            longitude,
        }),
        None => Ok(ForecastQuery::Location(read_location(conn, defaults)?)),
    }
}

fn write_coordinates(conn: &Connection, latitude: f64, longitude: f64) -> Result<(), DataError> {
    for (key, value) in [(PREF_COORD_LAT, latitude), (PREF_COORD_LON, longitude)] {
        conn.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![key, value.to_string()],
        )?;
    }
    Ok(())
}

fn clear_location_details(conn: &Connection) -> Result<(), DataError> {
    conn.execute(
        "DELETE FROM preferences WHERE key IN (?1, ?2, ?3)",
        params![PREF_COORD_LAT, PREF_COORD_LON, PREF_CITY_NAME],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::WeatherDatabase;

    fn prefs() -> Preferences {
        Preferences::new(
            WeatherDatabase::in_memory().unwrap().into_shared(),
            PreferenceDefaults::default(),
        )
    }

    fn resolve(prefs: &Preferences, latitude: f64, longitude: f64, city: Option<&str>) {
        let query = prefs.forecast_query().unwrap();
        assert!(prefs
            .record_resolved_location(&query, latitude, longitude, city)
            .unwrap());
    }

    #[test]
    fn test_defaults() {
        let prefs = prefs();
        assert_eq!(prefs.preferred_location().unwrap(), "94043, USA");
        assert_eq!(prefs.units().unwrap(), UnitSystem::Metric);
        assert!(prefs.is_metric().unwrap());
        assert!(!prefs.is_location_available().unwrap());
        assert_eq!(prefs.defaults().latitude, 37.4284);
        assert_eq!(prefs.defaults().longitude, -122.0724);
    }

    #[test]
    fn test_forecast_query_uses_location_without_coordinates() {
        let prefs = prefs();
        assert_eq!(
            prefs.forecast_query().unwrap(),
            ForecastQuery::Location("94043, USA".to_string())
        );
    }

    #[test]
    fn test_location_details_switch_query_to_coordinates() {
        let prefs = prefs();
        resolve(&prefs, 48.8566, 2.3522, None);

        assert!(prefs.is_location_available().unwrap());
        assert_eq!(
            prefs.forecast_query().unwrap(),
            ForecastQuery::Coordinates {
                latitude: 48.8566,
                longitude: 2.3522
            }
        );
    }

    #[test]
    fn test_set_location_resets_coordinates() {
        let prefs = prefs();
        resolve(&prefs, 48.8566, 2.3522, Some("Paris"));

        prefs.set_location("London, UK").unwrap();

        assert_eq!(prefs.preferred_location().unwrap(), "London, UK");
        assert!(!prefs.is_location_available().unwrap());
        assert!(prefs.city_name().unwrap().is_none());
        assert_eq!(
            prefs.forecast_query().unwrap(),
            ForecastQuery::Location("London, UK".to_string())
        );
    }

    #[test]
    fn test_blank_location_falls_back_to_default() {
        let prefs = prefs();
        prefs.set(PREF_LOCATION, "  ").unwrap();
        assert_eq!(prefs.preferred_location().unwrap(), "94043, USA");
    }

    #[test]
    fn test_units_round_trip_and_unknown_value() {
        let prefs = prefs();
        prefs.set_units(UnitSystem::Imperial).unwrap();
        assert_eq!(prefs.units().unwrap(), UnitSystem::Imperial);

        prefs.set(PREF_UNITS, "kelvin").unwrap();
        assert_eq!(prefs.units().unwrap(), UnitSystem::Metric);
    }

    #[test]
    fn test_half_set_coordinates_are_unavailable() {
        let prefs = prefs();
        prefs.set(PREF_COORD_LAT, "1.5").unwrap();
        assert!(!prefs.is_location_available().unwrap());

        prefs.set(PREF_COORD_LON, "oops").unwrap();
        assert!(matches!(
            prefs.location_coordinates(),
            Err(DataError::InvalidPreference { .. })
        ));
    }

    #[test]
    fn test_record_resolved_location_for_current_query() {
        let prefs = prefs();
        let query = prefs.forecast_query().unwrap();

        let written = prefs
            .record_resolved_location(&query, 37.4056, -122.0775, Some("Mountain View"))
            .unwrap();

        assert!(written);
        assert_eq!(
            prefs.location_coordinates().unwrap(),
            Some((37.4056, -122.0775))
        );
        assert_eq!(prefs.city_name().unwrap().as_deref(), Some("Mountain View"));
    }

    #[test]
    fn test_record_resolved_location_after_location_change_is_dropped() {
        let prefs = prefs();
        let stale = prefs.forecast_query().unwrap();
        prefs.set_location("Paris, FR").unwrap();

        let written = prefs
            .record_resolved_location(&stale, 37.4056, -122.0775, Some("Mountain View"))
            .unwrap();

        assert!(!written);
        assert!(!prefs.is_location_available().unwrap());
        assert!(prefs.city_name().unwrap().is_none());
        assert_eq!(
            prefs.forecast_query().unwrap(),
            ForecastQuery::Location("Paris, FR".to_string())
        );
    }
}
