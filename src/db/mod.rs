//! SQLite storage.
//!
//! One connection behind an async mutex, shared by every worker. Each public
//! method takes the lock for the duration of one logical operation, and
//! operations that touch more than one row run inside a transaction, so the
//! review/rating and booking invariants hold without any extra coordination.

use std::{str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use log::{debug, info};
use rusqlite::{ffi, types::Type, Connection, Row};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::error::AppError;

mod bookings;
mod reviews;
mod seed;
mod shortlists;
mod tours;
mod users;

pub use seed::SeedReport;

#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(db_path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        info!("[DB] Connection established at: {db_path}");
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn create_schema(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().await;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tours (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                slug TEXT NOT NULL UNIQUE,
                duration INTEGER NOT NULL,
                max_group_size INTEGER NOT NULL,
                difficulty TEXT NOT NULL,
                ratings_average REAL NOT NULL DEFAULT 0,
                ratings_quantity INTEGER NOT NULL DEFAULT 0,
                price REAL NOT NULL,
                price_discount REAL,
                summary TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                image_cover TEXT,
                images TEXT NOT NULL DEFAULT '[]',
                start_dates TEXT NOT NULL DEFAULT '[]',
                secret_tour INTEGER NOT NULL DEFAULT 0,
                start_location TEXT,
                locations TEXT NOT NULL DEFAULT '[]',
                guides TEXT NOT NULL DEFAULT '[]',
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS tours_price_ratings
                ON tours (price, ratings_average);",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                photo TEXT,
                role TEXT NOT NULL DEFAULT 'user',
                active INTEGER NOT NULL DEFAULT 1,
                password_hash TEXT NOT NULL,
                password_changed_at INTEGER,
                password_reset_token TEXT,
                password_reset_expires INTEGER,
                stripe_customer_id TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                tour_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                review TEXT NOT NULL,
                rating REAL NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (tour_id, user_id),
                FOREIGN KEY (tour_id) REFERENCES tours(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS reviews_by_user ON reviews (user_id);",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                tour_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                price REAL NOT NULL,
                paid INTEGER NOT NULL DEFAULT 0,
                stripe_session_id TEXT UNIQUE,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                FOREIGN KEY (tour_id) REFERENCES tours(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS bookings_by_user ON bookings (user_id);",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS shortlists (
                user_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                tour_id TEXT NOT NULL,
                added_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, kind, tour_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (tour_id) REFERENCES tours(id) ON DELETE CASCADE
            );",
        )?;

        debug!("[DB] Schema ready");
        Ok(())
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time at the millisecond precision the tables store.
pub(crate) fn now() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(now_millis()).unwrap_or_default()
}

pub(crate) fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

pub(crate) fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn optional_json_column<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        serde_json::from_str(&raw)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

pub(crate) fn enum_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = AppError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// UNIQUE and PRIMARY KEY failures only. Foreign key and NOT NULL failures
/// are other constraint kinds and stay internal errors.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Column named by a unique violation, e.g. `slug` for
/// "UNIQUE constraint failed: tours.slug". Empty when SQLite gave no detail.
pub(crate) fn unique_violation_column(err: &rusqlite::Error) -> Option<&str> {
    if !is_unique_violation(err) {
        return None;
    }
    let column = match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message
            .rsplit(": ")
            .next()
            .and_then(|columns| columns.split(',').next())
            .and_then(|column| column.trim().rsplit('.').next())
            .unwrap_or(""),
        _ => "",
    };
    Some(column)
}


#[cfg(test)]
mod tests {
    use super::{is_unique_violation, test_support::*, unique_violation_column};

    #[tokio::test]
    async fn test_schema_creation() {
        let db = create_test_db().await;

        let conn = db.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        for table in ["tours", "users", "reviews", "bookings", "shortlists"] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let db = create_test_db().await;
        db.create_schema().await.unwrap();
    }

    #[tokio::test]
    async fn test_only_unique_failures_count_as_duplicates() {
        let db = create_test_db().await;
        let user = insert_user(&db, "dup@example.com").await;

        let conn = db.conn.lock().await;
        let duplicate = conn
            .execute(
                "INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
                 VALUES ('other', 'Other', ?, 'x', 0, 0)",
                [&user.email],
            )
            .unwrap_err();
        assert!(is_unique_violation(&duplicate));
        assert_eq!(unique_violation_column(&duplicate), Some("email"));

        let dangling = conn
            .execute(
                "INSERT INTO shortlists (user_id, tour_id, kind, added_at)
                 VALUES (?, 'no-such-tour', 'wishlist', 0)",
                [&user.id],
            )
            .unwrap_err();
        assert!(!is_unique_violation(&dangling));

        let missing = conn
            .execute(
                "INSERT INTO users (id, email, password_hash, created_at, updated_at)
                 VALUES ('nameless', 'nameless@example.com', 'x', 0, 0)",
                [],
            )
            .unwrap_err();
        assert!(!is_unique_violation(&missing));
        assert_eq!(unique_violation_column(&missing), None);
    }
}
