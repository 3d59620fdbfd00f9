use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

use crate::error::StoreError;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS key_value_records (
            store      TEXT NOT NULL,
            key        TEXT NOT NULL,
            value      TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (store, key)
        );

        CREATE TABLE IF NOT EXISTS dataset_items (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            dataset    TEXT NOT NULL,
            data       TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_dataset_items_dataset ON dataset_items(dataset, id);

        CREATE TRIGGER IF NOT EXISTS dataset_items_no_update
        BEFORE UPDATE ON dataset_items
        BEGIN
            SELECT RAISE(ABORT, 'dataset items are append-only');
        END;

        CREATE TRIGGER IF NOT EXISTS dataset_items_no_delete
        BEFORE DELETE ON dataset_items
        BEGIN
            SELECT RAISE(ABORT, 'dataset items are append-only');
        END;
        ",
    )?;
    Ok(())
}

// ── Store seams ──

/// Singleton-namespace JSON key-value store.
pub trait KeyValue {
    fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set_value(&self, key: &str, value: &Value) -> Result<(), StoreError>;
}

/// Append-only sequence of JSON records.
pub trait AppendLog {
    fn push_data(&self, record: &Value) -> Result<(), StoreError>;
}

// ── Key-value ──

pub struct KeyValueStore<'c> {
    conn: &'c Connection,
    name: String,
}

impl<'c> KeyValueStore<'c> {
    pub fn open(conn: &'c Connection, name: &str) -> Self {
        KeyValueStore {
            conn,
            name: name.to_string(),
        }
    }
}

impl KeyValue for KeyValueStore<'_> {
    fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM key_value_records WHERE store = ?1 AND key = ?2",
                rusqlite::params![self.name, key],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn set_value(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT INTO key_value_records (store, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(store, key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            rusqlite::params![self.name, key, text],
        )?;
        Ok(())
    }
}

// ── Datasets ──

pub struct Dataset<'c> {
    conn: &'c Connection,
    name: String,
}

impl<'c> Dataset<'c> {
    pub fn open(conn: &'c Connection, name: &str) -> Self {
        Dataset {
            conn,
            name: name.to_string(),
        }
    }

    /// Items in insertion order, the most recent `limit` when given.
    pub fn items(&self, limit: Option<usize>) -> Result<Vec<Value>, StoreError> {
        // LIMIT -1 is unbounded in SQLite.
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let mut stmt = self.conn.prepare(
            "SELECT data FROM (
                 SELECT id, data FROM dataset_items WHERE dataset = ?1 ORDER BY id DESC LIMIT ?2
             ) ORDER BY id",
        )?;
        let rows = stmt
            .query_map(rusqlite::params![self.name, limit], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.iter()
            .map(|text| serde_json::from_str(text).map_err(StoreError::from))
            .collect()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM dataset_items WHERE dataset = ?1",
            rusqlite::params![self.name],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

impl AppendLog for Dataset<'_> {
    fn push_data(&self, record: &Value) -> Result<(), StoreError> {
        let text = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT INTO dataset_items (dataset, data) VALUES (?1, ?2)",
            rusqlite::params![self.name, text],
        )?;
        Ok(())
    }
}

#[cfg(test)]
pub fn memory() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();
    conn
}
