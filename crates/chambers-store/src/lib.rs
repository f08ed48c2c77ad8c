#![forbid(unsafe_code)]

use chambers_model::ValidationErrors;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex};

mod contact;
mod images;
mod news;
mod newsletter;
pub mod schema;
mod team;
pub mod uploads;

pub use news::NewsQuery;
pub use schema::SCHEMA_VERSION;
pub use uploads::{is_valid_upload_name, UploadDir, UPLOAD_NAME_PATTERN};

pub const CRATE_NAME: &str = "chambers-store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum StoreErrorCode {
    NotFound,
    Conflict,
    Validation,
    Sql,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self::new(StoreErrorCode::NotFound, format!("{what} not found"))
    }

    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StoreErrorCode::Validation, message)
    }

    #[must_use]
    pub fn io(err: &std::io::Error) -> Self {
        Self::new(StoreErrorCode::Io, err.to_string())
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) {
            Self::new(StoreErrorCode::Conflict, err.to_string())
        } else {
            Self::new(StoreErrorCode::Sql, err.to_string())
        }
    }
}

impl From<ValidationErrors> for StoreError {
    fn from(err: ValidationErrors) -> Self {
        Self::validation(err.to_string())
    }
}

/// Row counts shown on the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub news_total: u64,
    pub news_published: u64,
    pub team_active: u64,
    pub contact_total: u64,
    pub contact_new: u64,
    pub subscribers_active: u64,
    pub images: u64,
}

/// Handle to the site database. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(&e))?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA foreign_keys=ON;
            PRAGMA busy_timeout=5000;
            ",
        )?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, StoreError> {
        schema::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::new(StoreErrorCode::Sql, "database lock poisoned"))?;
        f(&mut guard)
    }

    pub fn ping(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }

    pub fn schema_version(&self) -> Result<i64, StoreError> {
        self.with_conn(|conn| schema::user_version(conn))
    }

    pub fn meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_conn(|conn| schema::read_meta(conn, key))
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        self.with_conn(|conn| {
            let count = |sql: &str| -> Result<u64, StoreError> {
                let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
                Ok(n.max(0) as u64)
            };
            Ok(StoreStats {
                news_total: count("SELECT COUNT(*) FROM news")?,
                news_published: count("SELECT COUNT(*) FROM news WHERE published = 1")?,
                team_active: count("SELECT COUNT(*) FROM team_members WHERE active = 1")?,
                contact_total: count("SELECT COUNT(*) FROM contact_messages")?,
                contact_new: count("SELECT COUNT(*) FROM contact_messages WHERE status = 'new'")?,
                subscribers_active: count(
                    "SELECT COUNT(*) FROM newsletter_subscriptions WHERE active = 1",
                )?,
                images: count("SELECT COUNT(*) FROM images")?,
            })
        })
    }
}

/// Current time at the precision timestamps are stored with.
pub(crate) fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn ts_to_sql(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw, idx)
}

pub(crate) fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|r| parse_ts(&r, idx)).transpose()
}

fn parse_ts(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn to_u64(value: i64) -> u64 {
    value.max(0) as u64
}

/// `base`, `base-2`, `base-3`, ... until `taken` says the candidate is free.
pub(crate) fn unique_slug(
    base: &str,
    mut taken: impl FnMut(&str) -> Result<bool, StoreError>,
) -> Result<String, StoreError> {
    if !taken(base)? {
        return Ok(base.to_string());
    }
    for n in 2_u32.. {
        let suffix = format!("-{n}");
        let room = chambers_core::text::SLUG_MAX_LEN.saturating_sub(suffix.len());
        let stem: String = base.chars().take(room).collect();
        let candidate = format!("{}{suffix}", stem.trim_end_matches('-'));
        if !taken(&candidate)? {
            return Ok(candidate);
        }
    }
    Err(StoreError::new(
        StoreErrorCode::Conflict,
        format!("no free slug for {base}"),
    ))
}
