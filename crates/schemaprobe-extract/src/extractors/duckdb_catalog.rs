//! DuckDB extractors over the `duckdb_tables()`, `duckdb_views()` and
//! `duckdb_columns()` table functions
//!
//! Unlike `information_schema`, these functions flag engine-internal objects,
//! which are excluded here.
//!
//! Reference: https://duckdb.org/docs/sql/meta/duckdb_table_functions

use super::{column_from_row, required, ColumnExtractor, TableExtractor, ViewExtractor};
use crate::engine::EngineSession;
use crate::error::ExtractionError;
use crate::resolver::WorkingConnection;
use schemaprobe_core::{Column, Table, View};

const DIALECTS: &[&str] = &["duckdb"];

const TABLES_SQL: &str = "\
    SELECT schema_name, table_name \
    FROM duckdb_tables() \
    WHERE database_name = ? AND schema_name = ? AND NOT internal \
    ORDER BY table_name";

const VIEWS_SQL: &str = "\
    SELECT schema_name, view_name \
    FROM duckdb_views() \
    WHERE database_name = ? AND schema_name = ? AND NOT internal \
    ORDER BY view_name";

const COLUMNS_SQL: &str = "\
    SELECT column_name, data_type, is_nullable, column_index \
    FROM duckdb_columns() \
    WHERE database_name = ? AND schema_name = ? AND table_name = ? \
    ORDER BY column_index";

#[derive(Debug, Default)]
pub struct DuckDbTableExtractor;

#[async_trait::async_trait]
impl TableExtractor for DuckDbTableExtractor {
    fn name(&self) -> &'static str {
        "duckdb_tables()"
    }

    fn dialects(&self) -> &'static [&'static str] {
        DIALECTS
    }

    async fn extract(
        &self,
        connection: &WorkingConnection,
        session: &dyn EngineSession,
    ) -> Result<Vec<Table>, ExtractionError> {
        let rows = session
            .query(TABLES_SQL, &[connection.catalog.as_str(), connection.schema.as_str()])
            .await
            .map_err(|e| ExtractionError::query(self.name(), e))?;

        rows.iter()
            .map(|row| {
                let name = required(row, self.name(), "table_name")?;
                let schema = row.get("schema_name").unwrap_or(connection.schema.as_str());
                Ok(Table::new(schema, name))
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct DuckDbViewExtractor;

#[async_trait::async_trait]
impl ViewExtractor for DuckDbViewExtractor {
    fn name(&self) -> &'static str {
        "duckdb_views()"
    }

    fn dialects(&self) -> &'static [&'static str] {
        DIALECTS
    }

    async fn extract(
        &self,
        connection: &WorkingConnection,
        session: &dyn EngineSession,
    ) -> Result<Vec<View>, ExtractionError> {
        let rows = session
            .query(VIEWS_SQL, &[connection.catalog.as_str(), connection.schema.as_str()])
            .await
            .map_err(|e| ExtractionError::query(self.name(), e))?;

        rows.iter()
            .map(|row| {
                let name = required(row, self.name(), "view_name")?;
                let schema = row.get("schema_name").unwrap_or(connection.schema.as_str());
                Ok(View::new(schema, name))
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct DuckDbColumnExtractor;

#[async_trait::async_trait]
impl ColumnExtractor for DuckDbColumnExtractor {
    fn name(&self) -> &'static str {
        "duckdb_columns()"
    }

    fn dialects(&self) -> &'static [&'static str] {
        DIALECTS
    }

    async fn columns(
        &self,
        connection: &WorkingConnection,
        session: &dyn EngineSession,
        schema: &str,
        relation: &str,
    ) -> Result<Vec<Column>, ExtractionError> {
        let rows = session
            .query(COLUMNS_SQL, &[connection.catalog.as_str(), schema, relation])
            .await
            .map_err(|e| ExtractionError::query(self.name(), e))?;

        let fields = ["column_name", "data_type", "is_nullable", "column_index"];
        rows.iter()
            .enumerate()
            .map(|(index, row)| column_from_row(row, self.name(), fields, index))
            .collect()
    }
}
