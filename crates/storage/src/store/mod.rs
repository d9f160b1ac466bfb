#![forbid(unsafe_code)]

mod catalog;
mod error;
mod requests;
mod schema;
mod snapshot;
mod stock;

pub use catalog::*;
pub use error::StoreError;
pub use requests::*;

use rl_core::dates::{format_date, parse_date};
use rl_core::ids::IdError;
use rusqlite::{Connection, ErrorCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::Date;

const DB_FILE_NAME: &str = "reagent_ledger.db";
const SCHEMA_VERSION: i64 = 1;
const DEFAULT_LIST_LIMIT: usize = 200;
const MAX_LIST_LIMIT: usize = 1000;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        schema::preflight_gate(&conn)?;
        schema::install_schema(&conn)?;
        tracing::debug!(dir = %storage_dir.display(), "record store opened");

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

fn map_write_error(err: rusqlite::Error, what: &'static str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(code, message) = &err
        && code.code == ErrorCode::ConstraintViolation
    {
        let message = message.as_deref().unwrap_or("");
        if message.contains("FOREIGN KEY constraint failed") {
            return StoreError::UnknownId;
        }
        if message.contains("UNIQUE constraint failed")
            || message.contains("PRIMARY KEY constraint failed")
        {
            return StoreError::AlreadyExists(what);
        }
    }
    StoreError::Sql(err)
}

fn decode_id<T>(raw: i64, make: fn(i64) -> Result<T, IdError>) -> Result<T, StoreError> {
    make(raw).map_err(|err| StoreError::Integrity(format!("row id {raw}: {}", err.message())))
}

fn decode_date(raw: Option<String>) -> Result<Option<Date>, StoreError> {
    match raw {
        None => Ok(None),
        Some(raw) => parse_date(&raw)
            .map(Some)
            .map_err(|_| StoreError::Integrity(format!("stored date is malformed: {raw}"))),
    }
}

fn encode_date(date: Date) -> String {
    format_date(date)
}

fn list_window(limit: usize, offset: usize) -> Result<(i64, i64), StoreError> {
    let limit = if limit == 0 { DEFAULT_LIST_LIMIT } else { limit.min(MAX_LIST_LIMIT) };
    let limit = i64::try_from(limit).map_err(|_| StoreError::InvalidInput("numeric overflow"))?;
    let offset = i64::try_from(offset).map_err(|_| StoreError::InvalidInput("numeric overflow"))?;
    Ok((limit, offset))
}

fn normalize_name(value: &str, what: &'static str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput(what));
    }
    if trimmed.len() > 256 || trimmed.chars().any(|c| c.is_control()) {
        return Err(StoreError::InvalidInput(what));
    }
    Ok(trimmed.to_string())
}

fn now_ms() -> i64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    i64::try_from(nanos.max(0)).unwrap_or(i64::MAX)
}
