//! Caller-supplied connection description

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A connection as configured by the user
///
/// This is an immutable value: the extraction engine derives working
/// connections from it and never writes back. Optional fields that are
/// present but blank are treated as absent (see [`present`]).
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogicalConnection {
    /// Display name, used to select the connection from config
    pub name: String,

    /// Dialect tag (e.g. `ducklake`, `duckdb`, `postgres`)
    #[serde(alias = "db_type")]
    pub dialect: String,

    /// Target database or lakehouse catalog name
    #[serde(default)]
    pub database_name: Option<String>,

    /// Schema name (`main` when unset)
    #[serde(default)]
    pub schema_name: Option<String>,

    /// Endpoint URL of the session engine
    #[serde(default)]
    pub url: Option<String>,

    /// User name for engines that authenticate
    #[serde(default)]
    pub user_name: Option<String>,

    /// Password for engines that authenticate
    #[serde(default)]
    pub password: Option<String>,

    /// Allow-list of table names; empty means every table
    #[serde(default)]
    pub tables: Vec<String>,

    /// Database file backing the DuckDB session (in-memory when unset)
    #[serde(default)]
    pub duckdb_database_path: Option<String>,

    /// Where the lakehouse data files live (local path or object-store URI)
    #[serde(default)]
    pub ducklake_data_path: Option<String>,

    /// Location of the lakehouse metadata store
    #[serde(default)]
    pub ducklake_metadata_db: Option<String>,

    /// Object-store region
    #[serde(default)]
    pub s3_region: Option<String>,

    /// Object-store access key id
    #[serde(default)]
    pub s3_access_key_id: Option<String>,

    /// Object-store secret access key
    #[serde(default)]
    pub s3_secret_access_key: Option<String>,
}

impl LogicalConnection {
    /// Create a connection with only a name and dialect set
    pub fn new(name: impl Into<String>, dialect: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dialect: dialect.into(),
            ..Self::default()
        }
    }

    pub fn with_database_name(mut self, database_name: impl Into<String>) -> Self {
        self.database_name = Some(database_name.into());
        self
    }

    pub fn with_schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_credentials(mut self, user_name: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = tables.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_duckdb_database_path(mut self, path: impl Into<String>) -> Self {
        self.duckdb_database_path = Some(path.into());
        self
    }

    pub fn with_ducklake_data_path(mut self, path: impl Into<String>) -> Self {
        self.ducklake_data_path = Some(path.into());
        self
    }

    pub fn with_ducklake_metadata_db(mut self, location: impl Into<String>) -> Self {
        self.ducklake_metadata_db = Some(location.into());
        self
    }

    pub fn with_s3_region(mut self, region: impl Into<String>) -> Self {
        self.s3_region = Some(region.into());
        self
    }

    pub fn with_s3_access_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.s3_access_key_id = Some(key_id.into());
        self
    }

    pub fn with_s3_secret_access_key(mut self, secret: impl Into<String>) -> Self {
        self.s3_secret_access_key = Some(secret.into());
        self
    }

    /// Named, non-blank fields of this connection
    ///
    /// Used as the substitution context for `${field}` placeholders that
    /// refer to sibling fields of the same connection.
    pub fn field_map(&self) -> HashMap<&'static str, String> {
        let mut fields = HashMap::new();
        fields.insert("name", self.name.clone());
        fields.insert("dialect", self.dialect.clone());

        let optional = [
            ("database_name", &self.database_name),
            ("schema_name", &self.schema_name),
            ("url", &self.url),
            ("user_name", &self.user_name),
            ("password", &self.password),
            ("duckdb_database_path", &self.duckdb_database_path),
            ("ducklake_data_path", &self.ducklake_data_path),
            ("ducklake_metadata_db", &self.ducklake_metadata_db),
            ("s3_region", &self.s3_region),
            ("s3_access_key_id", &self.s3_access_key_id),
            ("s3_secret_access_key", &self.s3_secret_access_key),
        ];
        for (key, value) in optional {
            if let Some(value) = present(value) {
                fields.insert(key, value.to_string());
            }
        }

        fields
    }
}

// Credentials stay out of logs.
impl fmt::Debug for LogicalConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "***");
        f.debug_struct("LogicalConnection")
            .field("name", &self.name)
            .field("dialect", &self.dialect)
            .field("database_name", &self.database_name)
            .field("schema_name", &self.schema_name)
            .field("url", &self.url)
            .field("user_name", &self.user_name)
            .field("password", &redacted(&self.password))
            .field("tables", &self.tables)
            .field("duckdb_database_path", &self.duckdb_database_path)
            .field("ducklake_data_path", &self.ducklake_data_path)
            .field("ducklake_metadata_db", &self.ducklake_metadata_db)
            .field("s3_region", &self.s3_region)
            .field("s3_access_key_id", &redacted(&self.s3_access_key_id))
            .field("s3_secret_access_key", &redacted(&self.s3_secret_access_key))
            .finish()
    }
}

/// Returns the value when it is set and not blank
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
