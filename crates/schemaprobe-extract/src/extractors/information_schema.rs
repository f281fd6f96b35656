//! Default extractors over the standard `information_schema` views
//!
//! These work against any engine that exposes `information_schema.tables`
//! and `information_schema.columns`, and are what the registry hands out for
//! dialects without a dedicated extractor.

use super::{column_from_row, required, ColumnExtractor, TableExtractor, ViewExtractor};
use crate::engine::EngineSession;
use crate::error::ExtractionError;
use crate::resolver::WorkingConnection;
use schemaprobe_core::{Column, Table, View};

const TABLES_SQL: &str = "\
    SELECT table_schema, table_name, table_type \
    FROM information_schema.tables \
    WHERE table_catalog = ? AND table_schema = ? AND table_type = 'BASE TABLE' \
    ORDER BY table_name";

const VIEWS_SQL: &str = "\
    SELECT table_schema, table_name, table_type \
    FROM information_schema.tables \
    WHERE table_catalog = ? AND table_schema = ? AND table_type = 'VIEW' \
    ORDER BY table_name";

const COLUMNS_SQL: &str = "\
    SELECT column_name, data_type, is_nullable, ordinal_position \
    FROM information_schema.columns \
    WHERE table_catalog = ? AND table_schema = ? AND table_name = ? \
    ORDER BY ordinal_position";

/// List base tables of the connection's catalog and schema
///
/// Shared by the default table extractor and the last step of the table
/// fallback chain.
pub async fn base_tables(
    connection: &WorkingConnection,
    session: &dyn EngineSession,
    extractor: &'static str,
) -> Result<Vec<Table>, ExtractionError> {
    let rows = session
        .query(TABLES_SQL, &[connection.catalog.as_str(), connection.schema.as_str()])
        .await
        .map_err(|e| ExtractionError::query(extractor, e))?;

    rows.iter()
        .map(|row| {
            let name = required(row, extractor, "table_name")?;
            let schema = row.get("table_schema").unwrap_or(connection.schema.as_str());
            let table_type = row.get("table_type").unwrap_or(Table::BASE_TABLE);
            Ok(Table::new(schema, name).with_type(table_type))
        })
        .collect()
}

/// Default table extractor
#[derive(Debug, Default)]
pub struct DefaultTableExtractor;

#[async_trait::async_trait]
impl TableExtractor for DefaultTableExtractor {
    fn name(&self) -> &'static str {
        "information_schema.tables"
    }

    fn dialects(&self) -> &'static [&'static str] {
        &[]
    }

    async fn extract(
        &self,
        connection: &WorkingConnection,
        session: &dyn EngineSession,
    ) -> Result<Vec<Table>, ExtractionError> {
        base_tables(connection, session, self.name()).await
    }
}

/// Default view extractor
///
/// Also registered for SAP IQ, whose catalog needs nothing beyond the
/// standard views.
#[derive(Debug, Default)]
pub struct DefaultViewExtractor;

#[async_trait::async_trait]
impl ViewExtractor for DefaultViewExtractor {
    fn name(&self) -> &'static str {
        "information_schema.views"
    }

    fn dialects(&self) -> &'static [&'static str] {
        &["sapiq"]
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
                let name = required(row, self.name(), "table_name")?;
                let schema = row.get("table_schema").unwrap_or(connection.schema.as_str());
                Ok(View::new(schema, name))
            })
            .collect()
    }
}

/// Default column extractor
#[derive(Debug, Default)]
pub struct DefaultColumnExtractor;

#[async_trait::async_trait]
impl ColumnExtractor for DefaultColumnExtractor {
    fn name(&self) -> &'static str {
        "information_schema.columns"
    }

    fn dialects(&self) -> &'static [&'static str] {
        &[]
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

        let fields = ["column_name", "data_type", "is_nullable", "ordinal_position"];
        rows.iter()
            .enumerate()
            .map(|(index, row)| column_from_row(row, self.name(), fields, index))
            .collect()
    }
}
