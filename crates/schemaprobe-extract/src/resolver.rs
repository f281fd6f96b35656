//! Derive working connections from logical ones

use crate::ident::SafeIdentifier;
use crate::lifecycle::AttachedCatalog;
use schemaprobe_core::{present, LogicalConnection};
use std::fmt;

/// Schema used when the connection does not name one
pub const DEFAULT_SCHEMA: &str = "main";

/// Dialect of the session that hosts attached lakehouse catalogs
pub const SESSION_DIALECT: &str = "duckdb";

const SESSION_URL_PREFIX: &str = "duckdb:";
const LEGACY_URL_PREFIX: &str = "jdbc:duckdb:";

/// A dialect-resolved view of a connection, used to address metadata queries
#[derive(Clone, PartialEq, Eq)]
pub struct WorkingConnection {
    pub name: String,

    /// Catalog actually attached in the session
    pub catalog: SafeIdentifier,

    pub schema: SafeIdentifier,

    /// Dialect the metadata queries are written for
    pub dialect: String,

    /// Dialect of the caller's connection
    pub origin_dialect: String,

    /// Session URL
    pub url: String,

    pub user_name: Option<String>,
    pub password: Option<String>,

    /// Table allow-list, carried unchanged
    pub tables: Vec<String>,

    /// Name of the catalog holding the lakehouse's own bookkeeping tables
    pub metadata_catalog: Option<String>,
}

impl fmt::Debug for WorkingConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkingConnection")
            .field("name", &self.name)
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("dialect", &self.dialect)
            .field("origin_dialect", &self.origin_dialect)
            .field("url", &self.url)
            .field("user_name", &self.user_name)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("tables", &self.tables)
            .field("metadata_catalog", &self.metadata_catalog)
            .finish()
    }
}

/// Schema name with the `main` default applied
pub fn effective_schema(logical: &LogicalConnection) -> &str {
    present(&logical.schema_name).unwrap_or(DEFAULT_SCHEMA)
}

/// Session URL for a logical connection
///
/// An explicit `url` wins, then the DuckDB database path, then an in-memory
/// session. `jdbc:duckdb:` prefixes are accepted and normalized. The
/// lakehouse metadata store is never used as the session database.
pub fn session_url(logical: &LogicalConnection) -> String {
    let candidate = present(&logical.url).or_else(|| present(&logical.duckdb_database_path));

    match candidate {
        Some(value) => normalize_session_url(value.trim()),
        None => SESSION_URL_PREFIX.to_string(),
    }
}

fn normalize_session_url(value: &str) -> String {
    if let Some(rest) = value.strip_prefix(LEGACY_URL_PREFIX) {
        format!("{SESSION_URL_PREFIX}{rest}")
    } else if value.starts_with(SESSION_URL_PREFIX) {
        value.to_string()
    } else {
        format!("{SESSION_URL_PREFIX}{value}")
    }
}

/// Database file addressed by a session URL, `None` for in-memory sessions
pub fn session_database_path(url: &str) -> Option<&str> {
    let path = url
        .strip_prefix(LEGACY_URL_PREFIX)
        .or_else(|| url.strip_prefix(SESSION_URL_PREFIX))
        .unwrap_or(url);

    match path {
        "" | ":memory:" => None,
        path => Some(path),
    }
}

/// Lakehouse bookkeeping catalog for an attached catalog
pub fn metadata_catalog_name(catalog: &SafeIdentifier) -> String {
    format!("__ducklake_metadata_{}", catalog)
}

/// Build the working connection for an attached catalog
pub fn resolve(
    logical: &LogicalConnection,
    working_url: &str,
    attached: &AttachedCatalog,
) -> WorkingConnection {
    WorkingConnection {
        name: logical.name.clone(),
        catalog: attached.catalog.clone(),
        schema: attached.schema.clone(),
        dialect: SESSION_DIALECT.to_string(),
        origin_dialect: logical.dialect.clone(),
        url: working_url.to_string(),
        user_name: logical.user_name.clone(),
        password: logical.password.clone(),
        tables: logical.tables.clone(),
        metadata_catalog: Some(metadata_catalog_name(&attached.catalog)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attached(catalog: &str, schema: &str) -> AttachedCatalog {
        AttachedCatalog {
            catalog: SafeIdentifier::validate("database_name", catalog).unwrap(),
            schema: SafeIdentifier::validate("schema_name", schema).unwrap(),
        }
    }

    #[test]
    fn schema_defaults_to_main() {
        let conn = LogicalConnection::new("lake", "ducklake");
        assert_eq!(effective_schema(&conn), "main");

        let conn = conn.with_schema_name("  ");
        assert_eq!(effective_schema(&conn), "main");

        let conn = LogicalConnection::new("lake", "ducklake").with_schema_name("analytics");
        assert_eq!(effective_schema(&conn), "analytics");
    }

    #[test]
    fn session_url_rules() {
        let conn = LogicalConnection::new("lake", "ducklake");
        assert_eq!(session_url(&conn), "duckdb:");

        let conn = LogicalConnection::new("lake", "ducklake").with_url("jdbc:duckdb:/tmp/s.db");
        assert_eq!(session_url(&conn), "duckdb:/tmp/s.db");

        let conn = LogicalConnection::new("lake", "ducklake").with_url("/tmp/s.db");
        assert_eq!(session_url(&conn), "duckdb:/tmp/s.db");

        let conn = LogicalConnection::new("lake", "ducklake")
            .with_duckdb_database_path("/tmp/session.db")
            .with_ducklake_metadata_db("/tmp/meta.ducklake");
        assert_eq!(session_url(&conn), "duckdb:/tmp/session.db");
    }

    #[test]
    fn session_database_paths() {
        assert_eq!(session_database_path("duckdb:"), None);
        assert_eq!(session_database_path("duckdb::memory:"), None);
        assert_eq!(session_database_path("duckdb:/tmp/s.db"), Some("/tmp/s.db"));
        assert_eq!(session_database_path("jdbc:duckdb:/tmp/s.db"), Some("/tmp/s.db"));
    }

    #[test]
    fn resolve_substitutes_attached_catalog() {
        let logical = LogicalConnection::new("lake", "ducklake")
            .with_database_name("requested")
            .with_credentials("analyst", "secret")
            .with_tables(["orders"]);

        let working = resolve(&logical, "duckdb:", &attached("sales", "main"));

        assert_eq!(working.catalog.as_str(), "sales");
        assert_eq!(working.schema.as_str(), "main");
        assert_eq!(working.dialect, "duckdb");
        assert_eq!(working.origin_dialect, "ducklake");
        assert_eq!(working.tables, vec!["orders"]);
        assert_eq!(working.user_name.as_deref(), Some("analyst"));
        assert_eq!(
            working.metadata_catalog.as_deref(),
            Some("__ducklake_metadata_sales")
        );
        // the caller's value is untouched
        assert_eq!(logical.database_name.as_deref(), Some("requested"));
    }
}
