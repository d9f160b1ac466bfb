#![forbid(unsafe_code)]

use super::{SCHEMA_VERSION, StoreError, now_ms};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;

const TABLES: &[&str] = &[
    "meta",
    "users",
    "laboratories",
    "projects",
    "producers",
    "hazard_classes",
    "reagents",
    "reagent_hazards",
    "stock",
];

/// Refuses to open a database that was written by something else or by a newer schema.
pub(super) fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    if tables.iter().any(|table| !TABLES.contains(&table.as_str())) {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }
    if !tables.contains("meta") {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        ));
    }

    let version = conn
        .query_row(
            "SELECT value FROM meta WHERE key='schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    match version.as_deref().map(str::parse::<i64>) {
        Some(Ok(v)) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

pub(super) fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;

        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          username TEXT NOT NULL UNIQUE,
          role TEXT NOT NULL CHECK(role IN ('lab_worker', 'project_manager', 'lab_manager', 'admin')),
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS laboratories (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS projects (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL UNIQUE,
          manager_id INTEGER,
          FOREIGN KEY(manager_id) REFERENCES users(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS producers (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS hazard_classes (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          code TEXT NOT NULL UNIQUE,
          description TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS reagents (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL,
          catalog_no TEXT NOT NULL,
          producer_id INTEGER,
          UNIQUE(name, catalog_no),
          FOREIGN KEY(producer_id) REFERENCES producers(id) ON DELETE RESTRICT
        );

        CREATE TABLE IF NOT EXISTS reagent_hazards (
          reagent_id INTEGER NOT NULL,
          hazard_id INTEGER NOT NULL,
          PRIMARY KEY(reagent_id, hazard_id),
          FOREIGN KEY(reagent_id) REFERENCES reagents(id) ON DELETE CASCADE,
          FOREIGN KEY(hazard_id) REFERENCES hazard_classes(id) ON DELETE RESTRICT
        );

        CREATE TABLE IF NOT EXISTS stock (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          reagent_id INTEGER NOT NULL,
          owner_id INTEGER NOT NULL,
          project_id INTEGER,
          laboratory_id INTEGER NOT NULL,
          disposal_date TEXT,
          created_at_ms INTEGER NOT NULL,
          FOREIGN KEY(reagent_id) REFERENCES reagents(id) ON DELETE RESTRICT,
          FOREIGN KEY(owner_id) REFERENCES users(id) ON DELETE RESTRICT,
          FOREIGN KEY(project_id) REFERENCES projects(id) ON DELETE SET NULL,
          FOREIGN KEY(laboratory_id) REFERENCES laboratories(id) ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_stock_owner ON stock(owner_id, id);
        CREATE INDEX IF NOT EXISTS idx_stock_project ON stock(project_id, id);
        CREATE INDEX IF NOT EXISTS idx_stock_laboratory ON stock(laboratory_id, id);
        CREATE INDEX IF NOT EXISTS idx_projects_manager ON projects(manager_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO meta(key, value) VALUES ('schema_version', ?1)",
        params![SCHEMA_VERSION.to_string()],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO meta(key, value) VALUES ('created_at_ms', ?1)",
        params![now_ms().to_string()],
    )?;

    Ok(())
}
