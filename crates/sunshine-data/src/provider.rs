//! URI-addressed access to forecast rows with change notification.
//!
//! Every write runs in a single transaction. Observers subscribed through
//! [`WeatherProvider::subscribe`] receive a [`ChangeEvent`] after a write
//! commits; nothing is sent for writes that rolled back or touched no rows.

use chrono::{DateTime, TimeZone};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::broadcast;

use sunshine_weather::dates::is_date_normalized;
use sunshine_weather::WeatherValues;

use crate::contract::{
    build_uri_matcher, select_today_onwards, weather_uri, ContentUri, Selection, SortOrder,
    UriCode, UriMatcher,
};
use crate::database::SharedDatabase;
use crate::error::DataError;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

const SELECT_COLUMNS: &str =
    "SELECT _id, date, weatherId, min, max, humidity, pressure, wind, degrees FROM weather";

const INSERT_ROW: &str = r#"
    INSERT INTO weather (date, weatherId, min, max, humidity, pressure, wind, degrees)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
"#;

/// A stored forecast row.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherEntry {
    pub id: i64,
    pub values: WeatherValues,
}

/// Sent to observers after data under `uri` changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub uri: ContentUri,
}

/// Resolved target of a request.
enum Target {
    Weather,
    WeatherWithDate(i64),
}

pub struct WeatherProvider {
    db: SharedDatabase,
    matcher: UriMatcher<UriCode>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl WeatherProvider {
    pub fn new(db: SharedDatabase) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            db,
            matcher: build_uri_matcher(),
            changes,
        }
    }

    /// Register for change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }

    /// Tell observers that data under `uri` should be reloaded.
    pub fn notify_change(&self, uri: &ContentUri) {
        tracing::debug!("Notifying observers of change to {}", uri);
        // No receivers is not an error
        let _ = self.changes.send(ChangeEvent { uri: uri.clone() });
    }

    fn resolve(&self, uri: &ContentUri) -> Result<Target, DataError> {
        match self.matcher.match_uri(uri) {
            Some(UriCode::Weather) => Ok(Target::Weather),
            Some(UriCode::WeatherWithDate) => uri
                .last_segment()
                .and_then(|s| s.parse().ok())
                .map(Target::WeatherWithDate)
                .ok_or_else(|| DataError::InvalidUri(uri.to_string())),
            None => Err(DataError::UnknownUri(uri.to_string())),
        }
    }

    /// Rows under `uri`. For a dated URI the selection is replaced by that date.
    pub fn query(
        &self,
        uri: &ContentUri,
        selection: Selection,
        sort: SortOrder,
    ) -> Result<Vec<WeatherEntry>, DataError> {
        let selection = match self.resolve(uri)? {
            Target::Weather => selection,
            Target::WeatherWithDate(date) => Selection::DateEquals(date),
        };

        let db = self.db.lock();
        query_rows(db.conn(), selection, sort)
    }

    /// The single row for a normalized date.
    pub fn query_date(&self, date: i64) -> Result<Option<WeatherEntry>, DataError> {
        let db = self.db.lock();
        let sql = format!("{} WHERE date = ?1", SELECT_COLUMNS);
        let entry = db
            .conn()
            .query_row(&sql, params![date], row_to_entry)
            .optional()?;
        Ok(entry)
    }

    pub fn count(&self, selection: Selection) -> Result<usize, DataError> {
        let db = self.db.lock();
        let (clause, arg) = selection.to_sql();
        let sql = format!("SELECT COUNT(*) FROM weather{}", clause);
        let count: i64 = match arg {
            Some(date) => db.conn().query_row(&sql, params![date], |row| row.get(0))?,
            None => db.conn().query_row(&sql, [], |row| row.get(0))?,
        };
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Rows dated today or later, where today is the local date of `now`.
    pub fn count_from_today<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<usize, DataError> {
        self.count(select_today_onwards(now))
    }

    /// Insert all rows in one transaction.
    ///
    /// Only the collection URI accepts inserts. A row whose date is not
    /// normalized aborts the batch and nothing is written.
    pub fn bulk_insert(
        &self,
        uri: &ContentUri,
        rows: &[WeatherValues],
    ) -> Result<usize, DataError> {
        self.require_collection(uri, "bulk insert")?;

        let inserted = {
            let mut db = self.db.lock();
            let tx = db.conn_mut().transaction()?;
            let inserted = insert_rows(&tx, rows)?;
            tx.commit()?;
            inserted
        };

        tracing::debug!("Inserted {} weather rows", inserted);
        if inserted > 0 {
            self.notify_change(uri);
        }
        Ok(inserted)
    }

    /// Delete rows under `uri` matching `selection`.
    pub fn delete(&self, uri: &ContentUri, selection: Selection) -> Result<usize, DataError> {
        let selection = match self.resolve(uri)? {
            Target::Weather => selection,
            Target::WeatherWithDate(date) => Selection::DateEquals(date),
        };

        let deleted = {
            let db = self.db.lock();
            delete_rows(db.conn(), selection)?
        };

        if deleted > 0 {
            self.notify_change(uri);
        }
        Ok(deleted)
    }

    /// Replace every stored row with `rows` atomically.
    ///
    /// Delete and insert share one transaction, so on any error the previous
    /// forecast is left untouched. Observers get a single notification.
    pub fn replace_all(
        &self,
        uri: &ContentUri,
        rows: &[WeatherValues],
    ) -> Result<usize, DataError> {
        self.require_collection(uri, "replace")?;

        let (deleted, inserted) = {
            let mut db = self.db.lock();
            let tx = db.conn_mut().transaction()?;
            let deleted = delete_rows(&tx, Selection::All)?;
            let inserted = insert_rows(&tx, rows)?;
            tx.commit()?;
            (deleted, inserted)
        };

        tracing::info!(
            "Replaced {} weather rows with {} new rows",
            deleted,
            inserted
        );
        if deleted > 0 || inserted > 0 {
            self.notify_change(uri);
        }
        Ok(inserted)
    }

    fn require_collection(&self, uri: &ContentUri, operation: &'static str) -> Result<(), DataError> {
        match self.resolve(uri)? {
            Target::Weather => Ok(()),
            Target::WeatherWithDate(_) => Err(DataError::Unsupported {
                operation,
                uri: uri.to_string(),
            }),
        }
    }

    /// Convenience for the collection URI.
    pub fn replace_forecast(&self, rows: &[WeatherValues]) -> Result<usize, DataError> {
        self.replace_all(&weather_uri(), rows)
    }
}

fn query_rows(
    conn: &Connection,
    selection: Selection,
    sort: SortOrder,
) -> Result<Vec<WeatherEntry>, DataError> {
    let (clause, arg) = selection.to_sql();
    let sql = format!("{}{}{}", SELECT_COLUMNS, clause, sort.to_sql());
    let mut stmt = conn.prepare(&sql)?;

    let rows = match arg {
        Some(date) => stmt.query_map(params![date], row_to_entry)?,
        None => stmt.query_map([], row_to_entry)?,
    };

    rows.collect::<Result<Vec<_>, _>>().map_err(DataError::from)
}

fn insert_rows(conn: &Connection, rows: &[WeatherValues]) -> Result<usize, DataError> {
    let mut stmt = conn.prepare_cached(INSERT_ROW)?;
    let mut inserted = 0;

    for row in rows {
        if !is_date_normalized(row.date) {
            return Err(DataError::DateNotNormalized(row.date));
        }

        inserted += stmt.execute(params![
            row.date,
            row.weather_id,
            row.min,
            row.max,
            row.humidity,
            row.pressure,
            row.wind_speed,
            row.degrees,
        ])?;
    }

    Ok(inserted)
}

fn delete_rows(conn: &Connection, selection: Selection) -> Result<usize, DataError> {
    let (clause, arg) = selection.to_sql();
    let sql = format!("DELETE FROM weather{}", clause);
    let deleted = match arg {
        Some(date) => conn.execute(&sql, params![date])?,
        None => conn.execute(&sql, [])?,
    };
    Ok(deleted)
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<WeatherEntry> {
    Ok(WeatherEntry {
        id: row.get(0)?,
        values: WeatherValues {
            date: row.get(1)?,
            weather_id: row.get(2)?,
            min: row.get(3)?,
            max: row.get(4)?,
            humidity: row.get(5)?,
            pressure: row.get(6)?,
            wind_speed: row.get(7)?,
            degrees: row.get(8)?,
        },
    })
}
