//! SQLite database holding forecast rows and preferences.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::contract::weather_entry;
use crate::error::DataError;

pub const DATABASE_NAME: &str = "weather.db";
pub const DATABASE_VERSION: i32 = 1;

const CREATE_PREFERENCES: &str = r#"
    CREATE TABLE IF NOT EXISTS preferences (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
"#;

/// Database handle shared by the provider and preferences.
pub type SharedDatabase = Arc<Mutex<WeatherDatabase>>;

pub struct WeatherDatabase {
    conn: Connection,
}

impl WeatherDatabase {
    /// Open or create the database at `path`, upgrading the schema if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        tracing::debug!("Opened weather database at {}", path.display());
        Ok(db)
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self, DataError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn into_shared(self) -> SharedDatabase {
        Arc::new(Mutex::new(self))
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn schema_version(&self) -> Result<i32, DataError> {
        let version = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        Ok(version)
    }

    fn table_exists(&self, name: &str) -> Result<bool, DataError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Create tables on first open. A weather table written under an older
    /// version (including one never stamped with `user_version`) is dropped
    /// and recreated. Forecast rows are a cache of the server and are
    /// refilled by the next sync. Preferences survive upgrades.
    fn init_schema(&self) -> Result<(), DataError> {
        let version = self.schema_version()?;

        if version < DATABASE_VERSION && self.table_exists(weather_entry::TABLE_NAME)? {
            tracing::info!(
                "Upgrading weather database from version {} to {}",
                version,
                DATABASE_VERSION
            );
            self.conn.execute_batch(weather_entry::DROP_TABLE)?;
        }

        self.conn.execute_batch(weather_entry::CREATE_TABLE)?;
        self.conn.execute_batch(CREATE_PREFERENCES)?;

        if version != DATABASE_VERSION {
            self.conn
                .pragma_update(None, "user_version", DATABASE_VERSION)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_creates_schema() {
        let db = WeatherDatabase::in_memory().unwrap();
        assert!(db.table_exists("weather").unwrap());
        assert!(db.table_exists("preferences").unwrap());
        assert_eq!(db.schema_version().unwrap(), DATABASE_VERSION);
    }

    #[test]
    fn test_weather_columns() {
        let db = WeatherDatabase::in_memory().unwrap();
        let columns: Vec<String> = db
            .conn()
            .prepare("PRAGMA table_info(weather)")
            .unwrap()
            .query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(
            columns,
            vec![
                weather_entry::COLUMN_ID,
                weather_entry::COLUMN_DATE,
                weather_entry::COLUMN_WEATHER_ID,
                weather_entry::COLUMN_MIN_TEMP,
                weather_entry::COLUMN_MAX_TEMP,
                weather_entry::COLUMN_HUMIDITY,
                weather_entry::COLUMN_PRESSURE,
                weather_entry::COLUMN_WIND_SPEED,
                weather_entry::COLUMN_DEGREES,
            ]
        );
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DATABASE_NAME);

        {
            let db = WeatherDatabase::open(&path).unwrap();
            db.conn()
                .execute(
                    "INSERT INTO preferences (key, value) VALUES ('units', 'imperial')",
                    [],
                )
                .unwrap();
        }

        let db = WeatherDatabase::open(&path).unwrap();
        let units: String = db
            .conn()
            .query_row("SELECT value FROM preferences WHERE key = 'units'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(units, "imperial");
    }

    #[test]
    fn test_unversioned_weather_table_is_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DATABASE_NAME);

        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE weather (
                    _id INTEGER PRIMARY KEY AUTOINCREMENT,
                    date INTEGER NOT NULL,
                    weatherId INTEGER NOT NULL
                );
                INSERT INTO weather (date, weatherId) VALUES (86400000, 800);
                INSERT INTO weather (date, weatherId) VALUES (86400000, 500);
                CREATE TABLE preferences (key TEXT PRIMARY KEY, value TEXT NOT NULL);
                INSERT INTO preferences (key, value) VALUES ('location', 'Oslo, NO');
                "#,
            )
            .unwrap();
        }

        let db = WeatherDatabase::open(&path).unwrap();
        assert_eq!(db.schema_version().unwrap(), DATABASE_VERSION);

        let rows: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM weather", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);

        let sql: String = db
            .conn()
            .query_row(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = 'weather'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(sql.contains("UNIQUE (date)"), "{}", sql);

        let location: String = db
            .conn()
            .query_row(
                "SELECT value FROM preferences WHERE key = 'location'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(location, "Oslo, NO");
    }

    #[test]
    fn test_current_version_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DATABASE_NAME);

        {
            let db = WeatherDatabase::open(&path).unwrap();
            db.conn()
                .execute_batch(
                    "INSERT INTO weather (date, weatherId, min, max, humidity, pressure, wind, degrees) \
                     VALUES (0, 800, 1, 2, 3, 4, 5, 6);",
                )
                .unwrap();
        }

        let db = WeatherDatabase::open(&path).unwrap();
        let rows: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM weather", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }
}
