//! Table, view and column extractor capabilities
//!
//! Each extractor declares the dialect tags it serves through
//! [`dialects`](TableExtractor::dialects); the registry indexes them by those
//! tags at startup. Extractors that serve no dialect explicitly are only
//! reachable as registry defaults.

use crate::engine::{EngineSession, Row};
use crate::error::ExtractionError;
use crate::resolver::WorkingConnection;
use schemaprobe_core::{Column, Nullability, Table, View};

pub mod duckdb_catalog;
pub mod information_schema;

pub use duckdb_catalog::{DuckDbColumnExtractor, DuckDbTableExtractor, DuckDbViewExtractor};
pub use information_schema::{DefaultColumnExtractor, DefaultTableExtractor, DefaultViewExtractor};

/// Lists base tables
#[async_trait::async_trait]
pub trait TableExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Dialect tags this extractor is registered for
    fn dialects(&self) -> &'static [&'static str];

    async fn extract(
        &self,
        connection: &WorkingConnection,
        session: &dyn EngineSession,
    ) -> Result<Vec<Table>, ExtractionError>;
}

/// Lists views
#[async_trait::async_trait]
pub trait ViewExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Dialect tags this extractor is registered for
    fn dialects(&self) -> &'static [&'static str];

    async fn extract(
        &self,
        connection: &WorkingConnection,
        session: &dyn EngineSession,
    ) -> Result<Vec<View>, ExtractionError>;
}

/// Reads the ordered columns of one table or view
#[async_trait::async_trait]
pub trait ColumnExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Dialect tags this extractor is registered for
    fn dialects(&self) -> &'static [&'static str];

    async fn columns(
        &self,
        connection: &WorkingConnection,
        session: &dyn EngineSession,
        schema: &str,
        relation: &str,
    ) -> Result<Vec<Column>, ExtractionError>;
}

fn required<'r>(
    row: &'r Row,
    extractor: &'static str,
    column: &'static str,
) -> Result<&'r str, ExtractionError> {
    row.get(column)
        .filter(|v| !v.is_empty())
        .ok_or(ExtractionError::MissingColumn { extractor, column })
}

/// Build a column from a catalog row
///
/// A missing or unparseable position falls back to the row's place in the
/// result, which is already ordered by position.
fn column_from_row(
    row: &Row,
    extractor: &'static str,
    columns: [&'static str; 4],
    index: usize,
) -> Result<Column, ExtractionError> {
    let [name_col, type_col, nullable_col, position_col] = columns;

    let name = required(row, extractor, name_col)?;
    let type_name = row.get(type_col).unwrap_or("UNKNOWN");
    let nullable = row
        .get(nullable_col)
        .map(Nullability::from_flag)
        .unwrap_or_default();
    let position = row
        .get(position_col)
        .and_then(|p| p.trim().parse::<u32>().ok())
        .unwrap_or(index as u32 + 1);

    Ok(Column::new(name, type_name, position).with_nullability(nullable))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLS: [&str; 4] = ["column_name", "data_type", "is_nullable", "ordinal_position"];

    #[test]
    fn column_from_complete_row() {
        let row = Row::from_pairs([
            ("column_name", "amount"),
            ("data_type", "DECIMAL(18,3)"),
            ("is_nullable", "NO"),
            ("ordinal_position", "3"),
        ]);

        let column = column_from_row(&row, "test", COLS, 0).unwrap();
        assert_eq!(column.name, "amount");
        assert_eq!(column.type_name, "DECIMAL(18,3)");
        assert_eq!(column.nullable, Nullability::No);
        assert_eq!(column.ordinal_position, 3);
    }

    #[test]
    fn column_position_falls_back_to_index() {
        let row = Row::from_pairs([("column_name", "id")]);

        let column = column_from_row(&row, "test", COLS, 4).unwrap();
        assert_eq!(column.ordinal_position, 5);
        assert_eq!(column.type_name, "UNKNOWN");
        assert_eq!(column.nullable, Nullability::Unknown);
    }

    #[test]
    fn column_without_name_is_rejected() {
        let row = Row::from_pairs([("data_type", "INTEGER")]);
        let err = column_from_row(&row, "test", COLS, 0).unwrap_err();
        assert_eq!(
            err,
            ExtractionError::MissingColumn { extractor: "test", column: "column_name" }
        );
    }
}
