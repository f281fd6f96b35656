//! Test fixtures for lakehouse extraction integration tests
//!
//! This module provides connections and catalog rows shaped like what an
//! attached DuckLake catalog reports, so the mock engine can stand in for a
//! real session.

#![allow(dead_code)]

use schemaprobe_core::LogicalConnection;
use schemaprobe_extract::{MockEngine, MockEngineBuilder, Row, METADATA_TABLE_NAMES};

/// Pattern matching the metadata-catalog table query
pub const METADATA_QUERY: &str = "ducklake_table t";

/// Pattern matching the DuckDB table extractor
pub const DUCKDB_TABLES: &str = "duckdb_tables()";

/// Pattern matching the DuckDB view extractor
pub const DUCKDB_VIEWS: &str = "duckdb_views()";

/// Pattern matching the DuckDB column extractor
pub const DUCKDB_COLUMNS: &str = "duckdb_columns()";

/// Pattern matching the `information_schema` base-table fallback
pub const BASE_TABLES: &str = "BASE TABLE";

/// Local `sales` lakehouse
pub fn sales_lake() -> LogicalConnection {
    LogicalConnection::new("lake", "ducklake")
        .with_database_name("sales")
        .with_ducklake_data_path("/data/lake/")
        .with_ducklake_metadata_db("/data/metadata.ducklake")
}

/// `sales` lakehouse with its data on S3
pub fn remote_sales_lake() -> LogicalConnection {
    sales_lake()
        .with_ducklake_data_path("s3://acme-lake/sales/")
        .with_s3_region("eu-west-1")
        .with_s3_secret_access_key("wJalrXUtnFEMI")
}

/// Rows from the metadata-catalog query
pub fn metadata_rows(tables: &[&str]) -> Vec<Row> {
    tables
        .iter()
        .map(|t| Row::from_pairs([("schema_name", "main"), ("table_name", *t)]))
        .collect()
}

/// Rows from `duckdb_tables()`
pub fn duckdb_table_rows(tables: &[&str]) -> Vec<Row> {
    metadata_rows(tables)
}

/// Rows from `duckdb_views()`
pub fn duckdb_view_rows(views: &[&str]) -> Vec<Row> {
    views
        .iter()
        .map(|v| Row::from_pairs([("schema_name", "main"), ("view_name", *v)]))
        .collect()
}

/// Rows from `information_schema.tables`
pub fn information_schema_rows(tables: &[&str]) -> Vec<Row> {
    tables
        .iter()
        .map(|t| {
            Row::from_pairs([
                ("table_schema", "main"),
                ("table_name", *t),
                ("table_type", "BASE TABLE"),
            ])
        })
        .collect()
}

/// Rows from `duckdb_columns()` for `(name, type, nullable)` triples
pub fn column_rows(columns: &[(&str, &str, bool)]) -> Vec<Row> {
    columns
        .iter()
        .enumerate()
        .map(|(i, (name, data_type, nullable))| {
            Row::new()
                .with("column_name", Some(*name))
                .with("data_type", Some(*data_type))
                .with("is_nullable", Some(nullable.to_string()))
                .with("column_index", Some((i + 1).to_string()))
        })
        .collect()
}

pub fn orders_columns() -> Vec<Row> {
    column_rows(&[
        ("order_id", "BIGINT", false),
        ("customer_id", "BIGINT", false),
        ("amount", "DECIMAL(18,2)", true),
        ("ordered_at", "TIMESTAMP WITH TIME ZONE", false),
    ])
}

pub fn customers_columns() -> Vec<Row> {
    column_rows(&[
        ("customer_id", "BIGINT", false),
        ("email", "VARCHAR", true),
    ])
}

pub fn daily_revenue_columns() -> Vec<Row> {
    column_rows(&[("day", "DATE", true), ("revenue", "DECIMAL(38,2)", true)])
}

/// Every bookkeeping table name interleaved with user tables
pub fn bookkeeping_and_user_tables() -> Vec<&'static str> {
    let mut names: Vec<&str> = METADATA_TABLE_NAMES.to_vec();
    names.insert(0, "customers");
    names.insert(7, "orders");
    names.push("refunds");
    names
}

/// Column rules for the `sales` relations
pub fn with_sales_columns(builder: MockEngineBuilder) -> MockEngineBuilder {
    builder
        .with_rows_for(DUCKDB_COLUMNS, "orders", orders_columns())
        .with_rows_for(DUCKDB_COLUMNS, "customers", customers_columns())
        .with_rows_for(DUCKDB_COLUMNS, "daily_revenue", daily_revenue_columns())
}

/// Engine serving the `sales` lakehouse: two tables and one view
pub fn sales_engine() -> MockEngine {
    with_sales_columns(
        MockEngineBuilder::new()
            .with_rows(METADATA_QUERY, metadata_rows(&["customers", "orders"]))
            .with_rows(DUCKDB_VIEWS, duckdb_view_rows(&["daily_revenue"])),
    )
    .build()
}
