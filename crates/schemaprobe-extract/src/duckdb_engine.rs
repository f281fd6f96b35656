//! DuckDB engine sessions
//!
//! Each session owns one embedded DuckDB connection, either in memory or
//! backed by the file named in the session URL. The lakehouse catalog itself
//! is attached into that session; the session database is never the
//! lakehouse metadata store.
//!
//! DuckDB calls block, so every statement runs on the blocking thread pool
//! with the connection behind a mutex.
//!
//! ## Features
//!
//! Requires the `duckdb` Cargo feature. Without it, [`DuckDbEngine::open`]
//! fails with a message explaining how to rebuild.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use schemaprobe_extract::{DuckDbEngine, Engine};
//!
//! let session = DuckDbEngine::new().open("duckdb:").await?;
//! session.execute("LOAD ducklake").await?;
//! let rows = session.query("SELECT database_name FROM duckdb_databases()", &[]).await?;
//! session.close().await?;
//! ```

use crate::engine::{Engine, EngineSession};
use crate::error::EngineError;

#[cfg(feature = "duckdb")]
use crate::engine::Row;
#[cfg(feature = "duckdb")]
use crate::resolver::session_database_path;
#[cfg(feature = "duckdb")]
use std::sync::{Arc, Mutex};
#[cfg(feature = "duckdb")]
use tracing::debug;

/// Opens embedded DuckDB sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct DuckDbEngine;

impl DuckDbEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Engine for DuckDbEngine {
    fn name(&self) -> &'static str {
        "DuckDB"
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "duckdb")
    }

    #[cfg(feature = "duckdb")]
    async fn open(&self, url: &str) -> Result<Box<dyn EngineSession>, EngineError> {
        let path = session_database_path(url).map(str::to_string);
        debug!(url, "Opening DuckDB session");

        let conn = tokio::task::spawn_blocking(move || match path {
            Some(path) => duckdb::Connection::open(path),
            None => duckdb::Connection::open_in_memory(),
        })
        .await
        .map_err(join_error)?
        .map_err(engine_error)?;

        Ok(Box::new(DuckDbSession {
            conn: Arc::new(Mutex::new(conn)),
        }))
    }

    #[cfg(not(feature = "duckdb"))]
    async fn open(&self, _url: &str) -> Result<Box<dyn EngineSession>, EngineError> {
        Err(EngineError::new(
            "DuckDB support not compiled. Rebuild with: cargo build --features duckdb",
        ))
    }
}

/// A live DuckDB connection
#[cfg(feature = "duckdb")]
pub struct DuckDbSession {
    conn: Arc<Mutex<duckdb::Connection>>,
}

#[cfg(feature = "duckdb")]
impl DuckDbSession {
    async fn with_conn<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce(&duckdb::Connection) -> Result<T, duckdb::Error> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| EngineError::new("DuckDB connection lock poisoned"))?;
            f(&conn).map_err(engine_error)
        })
        .await
        .map_err(join_error)?
    }
}

#[cfg(feature = "duckdb")]
#[async_trait::async_trait]
impl EngineSession for DuckDbSession {
    async fn execute(&self, sql: &str) -> Result<(), EngineError> {
        let sql = sql.to_string();
        self.with_conn(move |conn| conn.execute_batch(&sql)).await
    }

    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>, EngineError> {
        let sql = sql.to_string();
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(duckdb::params_from_iter(params.iter()))?;

            let mut result = Vec::new();
            while let Some(row) = rows.next()? {
                result.push(read_row(row)?);
            }
            Ok(result)
        })
        .await
    }

    async fn close(self: Box<Self>) -> Result<(), EngineError> {
        let Ok(mutex) = Arc::try_unwrap(self.conn) else {
            // another handle still holds the connection; it closes on drop
            return Ok(());
        };

        tokio::task::spawn_blocking(move || {
            let conn = mutex
                .into_inner()
                .map_err(|_| EngineError::new("DuckDB connection lock poisoned"))?;
            conn.close().map_err(|(_, e)| engine_error(e))
        })
        .await
        .map_err(join_error)?
    }
}

#[cfg(feature = "duckdb")]
fn read_row(row: &duckdb::Row<'_>) -> Result<Row, duckdb::Error> {
    let stmt = row.as_ref();
    let mut out = Row::new();

    for index in 0..stmt.column_count() {
        let name = stmt.column_name(index).map(|n| n.to_string())?;
        let value: duckdb::types::Value = row.get(index)?;
        out = out.with(name, render_value(value));
    }
    Ok(out)
}

/// Render a DuckDB value as text; `None` for NULL
#[cfg(feature = "duckdb")]
fn render_value(value: duckdb::types::Value) -> Option<String> {
    use duckdb::types::Value;

    match value {
        Value::Null => None,
        Value::Text(s) => Some(s),
        Value::Boolean(b) => Some(b.to_string()),
        Value::TinyInt(v) => Some(v.to_string()),
        Value::SmallInt(v) => Some(v.to_string()),
        Value::Int(v) => Some(v.to_string()),
        Value::BigInt(v) => Some(v.to_string()),
        Value::HugeInt(v) => Some(v.to_string()),
        Value::UTinyInt(v) => Some(v.to_string()),
        Value::USmallInt(v) => Some(v.to_string()),
        Value::UInt(v) => Some(v.to_string()),
        Value::UBigInt(v) => Some(v.to_string()),
        Value::Float(v) => Some(v.to_string()),
        Value::Double(v) => Some(v.to_string()),
        other => Some(format!("{:?}", other)),
    }
}

#[cfg(feature = "duckdb")]
fn engine_error(e: duckdb::Error) -> EngineError {
    EngineError::new(e.to_string())
}

#[cfg(feature = "duckdb")]
fn join_error(e: tokio::task::JoinError) -> EngineError {
    EngineError::new(format!("DuckDB task failed: {}", e))
}
