//! SQLite session backed by rusqlite
//!
//! rusqlite is blocking, so every statement runs on tokio's blocking pool
//! while holding the connection lock.

use async_trait::async_trait;
use rusqlite::{types::Value as SqlValue, Connection, OpenFlags};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{ColumnSchema, Row, Session};
use crate::config::SqliteConfig;
use crate::error::DatabaseError;

const TABLE_COLUMNS_SQL: &str = "SELECT name, type FROM pragma_table_info(?1)";

pub struct SqliteSession {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteSession {
    /// Open the database file described by `config`
    pub fn open(config: &SqliteConfig) -> Result<Self, DatabaseError> {
        let conn = if config.read_only {
            Connection::open_with_flags(
                &config.path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            Connection::open(&config.path)?
        };

        conn.busy_timeout(Duration::from_secs(config.timeout_secs))?;

        Self::new(conn, config.read_only)
    }

    /// Wrap an already open connection.
    ///
    /// With `read_only` set, `PRAGMA query_only` makes SQLite refuse any
    /// statement that would write, whatever the prefix check let through.
    pub fn new(conn: Connection, read_only: bool) -> Result<Self, DatabaseError> {
        if read_only {
            conn.pragma_update(None, "query_only", true)?;
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| DatabaseError::Worker("connection lock poisoned".into()))?;
            let conn = guard.as_ref().ok_or(DatabaseError::Closed)?;
            f(conn)
        })
        .await
        .map_err(|e| DatabaseError::Worker(e.to_string()))?
    }
}

fn to_json(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => json!(i),
        SqlValue::Real(f) => json!(f),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(b) => Value::String(format!("<blob {} bytes>", b.len())),
    }
}

#[async_trait]
impl Session for SqliteSession {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, DatabaseError> {
        let sql = sql.to_owned();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(&sql)?;

            let columns: Vec<String> = stmt
                .column_names()
                .iter()
                .map(|s| s.to_string())
                .collect();

            let rows = stmt
                .query_map([], |row| {
                    let mut record = Row::with_capacity(columns.len());
                    for (i, name) in columns.iter().enumerate() {
                        let value: SqlValue = row.get(i)?;
                        record.insert(name.clone(), to_json(value));
                    }
                    Ok(record)
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
        .await
    }

    async fn table_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, DatabaseError> {
        let table_name = table_name.to_owned();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(TABLE_COLUMNS_SQL)?;
            let columns = stmt
                .query_map([&table_name], |row| {
                    Ok(ColumnSchema {
                        column_name: row.get(0)?,
                        data_type: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(columns)
        })
        .await
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| DatabaseError::Worker("connection lock poisoned".into()))?;
            match guard.take() {
                Some(conn) => conn.close().map_err(|(_, e)| DatabaseError::from(e)),
                None => Ok(()),
            }
        })
        .await
        .map_err(|e| DatabaseError::Worker(e.to_string()))?
    }
}
