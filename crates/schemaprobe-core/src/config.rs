//! Configuration schema (schemaprobe.toml)

use serde::{Deserialize, Serialize};
use crate::connection::LogicalConnection;
use crate::template;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Configured connections, selected by name
    #[serde(default)]
    pub connections: Vec<LogicalConnection>,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: std::path::PathBuf,
}

impl Config {
    /// Load config from TOML file
    ///
    /// `${VAR}` placeholders in string values are resolved from the process
    /// environment, then per-connection `${field}` placeholders are resolved
    /// against the connection's own fields.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml_with(&contents, |name| std::env::var(name).ok())?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string (no environment substitution)
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::from_toml_with(toml, |_| None)
    }

    /// Load config from TOML string, resolving `${VAR}` through `env`
    pub fn from_toml_with<F>(toml: &str, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // substituted after parsing so values never have to be valid TOML
        config.connections = config
            .connections
            .into_iter()
            .map(|c| map_fields(c, |value| template::substitute(&value, &env)))
            .map(resolve_connection_templates)
            .collect();

        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Look up a connection by name
    pub fn connection(&self, name: &str) -> Result<&LogicalConnection, ConfigError> {
        self.connections
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ConfigError::UnknownConnection(name.to_string()))
    }
}

/// Apply `f` to every string value of a connection
fn map_fields<F>(connection: LogicalConnection, f: F) -> LogicalConnection
where
    F: Fn(String) -> String,
{
    let optional = |value: Option<String>| value.map(&f);

    LogicalConnection {
        name: f(connection.name),
        dialect: f(connection.dialect),
        database_name: optional(connection.database_name),
        schema_name: optional(connection.schema_name),
        url: optional(connection.url),
        user_name: optional(connection.user_name),
        password: optional(connection.password),
        tables: connection.tables.into_iter().map(&f).collect(),
        duckdb_database_path: optional(connection.duckdb_database_path),
        ducklake_data_path: optional(connection.ducklake_data_path),
        ducklake_metadata_db: optional(connection.ducklake_metadata_db),
        s3_region: optional(connection.s3_region),
        s3_access_key_id: optional(connection.s3_access_key_id),
        s3_secret_access_key: optional(connection.s3_secret_access_key),
    }
}

/// Resolve `${field}` references between fields of one connection
fn resolve_connection_templates(connection: LogicalConnection) -> LogicalConnection {
    let fields = connection.field_map();
    let lookup = |key: &str| fields.get(key).cloned();
    let resolve = |value: Option<String>| value.map(|v| template::substitute(&v, &lookup));

    LogicalConnection {
        url: resolve(connection.url.clone()),
        duckdb_database_path: resolve(connection.duckdb_database_path.clone()),
        ducklake_data_path: resolve(connection.ducklake_data_path.clone()),
        ducklake_metadata_db: resolve(connection.ducklake_metadata_db.clone()),
        s3_region: resolve(connection.s3_region.clone()),
        s3_access_key_id: resolve(connection.s3_access_key_id.clone()),
        s3_secret_access_key: resolve(connection.s3_secret_access_key.clone()),
        ..connection
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("No connection named '{0}' in config")]
    UnknownConnection(String),
}
