//! Lakehouse catalog lifecycle: extensions, attach, use
//!
//! A catalog moves through four states:
//!
//! ```text
//! Unattached ──prepare_extensions──▶ ExtensionReady ──attach──▶ Attached ──activate──▶ Active
//! ```
//!
//! Every precondition on the caller's connection is checked by
//! [`LakehouseSettings::from_connection`] before the first statement is sent.
//! Re-running [`CatalogLifecycle::setup`] is safe: installs are idempotent and
//! an attach that reports the catalog as already present counts as success.

use crate::engine::EngineSession;
use crate::error::{AttachFailure, ConfigurationError, ConnectivityError, DiscoveryError};
use crate::ident::{quote_literal, SafeIdentifier};
use crate::resolver::effective_schema;
use schemaprobe_core::{present, LogicalConnection};
use tracing::{debug, info, warn};

/// Extension providing the lakehouse catalog format
pub const LAKEHOUSE_EXTENSION: &str = "ducklake";

/// Extension providing object-store access
pub const REMOTE_STORAGE_EXTENSION: &str = "httpfs";

const REMOTE_SCHEMES: &[&str] = &["s3://", "s3a://", "s3n://", "gs://", "gcs://", "r2://"];

/// Whether a data path lives on an object store
pub fn is_remote_path(path: &str) -> bool {
    let lower = path.trim_start().to_ascii_lowercase();
    REMOTE_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

/// Optional object-store settings, each applied independently
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RemoteStorage {
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl std::fmt::Debug for RemoteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStorage")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "***"))
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl RemoteStorage {
    /// `(setting name, value)` pairs for the settings that are configured
    fn settings(&self) -> Vec<(&'static str, &str)> {
        [
            ("s3_region", &self.region),
            ("s3_access_key_id", &self.access_key_id),
            ("s3_secret_access_key", &self.secret_access_key),
        ]
        .into_iter()
        .filter_map(|(name, value)| present(value).map(|v| (name, v)))
        .collect()
    }
}

/// Validated lakehouse settings taken from a logical connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LakehouseSettings {
    pub catalog: SafeIdentifier,
    pub schema: SafeIdentifier,
    pub data_path: String,
    pub metadata_store: String,
    pub remote: RemoteStorage,
}

impl LakehouseSettings {
    /// Check every precondition; no engine call happens before this succeeds
    pub fn from_connection(logical: &LogicalConnection) -> Result<Self, ConfigurationError> {
        let required = |field: &'static str, value: &Option<String>| {
            present(value)
                .map(str::to_string)
                .ok_or_else(|| ConfigurationError::MissingField {
                    field,
                    dialect: logical.dialect.clone(),
                })
        };

        let database_name = required("database_name", &logical.database_name)?;
        let data_path = required("ducklake_data_path", &logical.ducklake_data_path)?;
        let metadata_store = required("ducklake_metadata_db", &logical.ducklake_metadata_db)?;

        let catalog = SafeIdentifier::validate("database_name", &database_name)?;
        let schema = SafeIdentifier::validate("schema_name", effective_schema(logical))?;

        Ok(Self {
            catalog,
            schema,
            data_path,
            metadata_store,
            remote: RemoteStorage {
                region: logical.s3_region.clone(),
                access_key_id: logical.s3_access_key_id.clone(),
                secret_access_key: logical.s3_secret_access_key.clone(),
            },
        })
    }

    pub fn is_remote(&self) -> bool {
        is_remote_path(&self.data_path)
    }
}

/// Catalog and schema selected in the session once the lifecycle completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedCatalog {
    pub catalog: SafeIdentifier,
    pub schema: SafeIdentifier,
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogState {
    Unattached,
    ExtensionReady,
    Attached,
    Active,
}

impl CatalogState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unattached => "UNATTACHED",
            Self::ExtensionReady => "EXTENSION_READY",
            Self::Attached => "ATTACHED",
            Self::Active => "ACTIVE",
        }
    }
}

/// Result of the attach step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The catalog was attached by this call
    Attached,

    /// The engine reported the catalog as already attached
    AlreadyAttached,
}

/// `ATTACH` statement binding the catalog to its metadata store and data path
pub fn attach_statement(settings: &LakehouseSettings) -> String {
    format!(
        "ATTACH {} AS {} (DATA_PATH {});",
        quote_literal(&format!("{}:{}", LAKEHOUSE_EXTENSION, settings.metadata_store)),
        settings.catalog.quote(),
        quote_literal(&settings.data_path),
    )
}

/// `USE` statement selecting catalog and schema
pub fn use_statement(catalog: &SafeIdentifier, schema: &SafeIdentifier) -> String {
    format!("USE {}.{};", catalog.quote(), schema.quote())
}

fn set_statement(name: &str, value: &str) -> String {
    format!("SET {}={}", name, quote_literal(value))
}

/// Drives one catalog through its lifecycle on a session
#[derive(Debug)]
pub struct CatalogLifecycle {
    settings: LakehouseSettings,
    state: CatalogState,
}

impl CatalogLifecycle {
    pub fn new(settings: LakehouseSettings) -> Self {
        Self {
            settings,
            state: CatalogState::Unattached,
        }
    }

    pub fn state(&self) -> CatalogState {
        self.state
    }

    pub fn settings(&self) -> &LakehouseSettings {
        &self.settings
    }

    fn require(&self, step: &'static str, expected: CatalogState) -> Result<(), ConnectivityError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ConnectivityError::OutOfOrder {
                step,
                expected: expected.as_str(),
                actual: self.state.as_str(),
            })
        }
    }

    /// `UNATTACHED → EXTENSION_READY`
    pub async fn prepare_extensions(&mut self, session: &dyn EngineSession) -> Result<(), ConnectivityError> {
        self.require("prepare_extensions", CatalogState::Unattached)?;

        install_and_load(session, LAKEHOUSE_EXTENSION).await?;

        if self.settings.is_remote() {
            install_and_load(session, REMOTE_STORAGE_EXTENSION).await?;

            for (name, value) in self.settings.remote.settings() {
                info!(setting = name, "Applying remote storage setting");
                session
                    .execute(&set_statement(name, value))
                    .await
                    .map_err(|e| ConnectivityError::statement(name, e))?;
            }
        }

        self.state = CatalogState::ExtensionReady;
        Ok(())
    }

    /// `EXTENSION_READY → ATTACHED`
    pub async fn attach(&mut self, session: &dyn EngineSession) -> Result<AttachOutcome, ConnectivityError> {
        self.require("attach", CatalogState::ExtensionReady)?;

        let sql = attach_statement(&self.settings);
        info!(catalog = %self.settings.catalog, "Attaching lakehouse catalog: {}", sql);

        let outcome = match session.execute(&sql).await {
            Ok(()) => AttachOutcome::Attached,
            Err(e) => match AttachFailure::classify(e) {
                AttachFailure::Conflict => {
                    info!(catalog = %self.settings.catalog, "Catalog already attached, continuing");
                    AttachOutcome::AlreadyAttached
                }
                AttachFailure::Fatal(e) => return Err(ConnectivityError::statement("ATTACH", e)),
            },
        };

        self.state = CatalogState::Attached;
        Ok(outcome)
    }

    /// `ATTACHED → ACTIVE`
    pub async fn activate(&mut self, session: &dyn EngineSession) -> Result<AttachedCatalog, ConnectivityError> {
        self.require("activate", CatalogState::Attached)?;

        session
            .execute(&use_statement(&self.settings.catalog, &self.settings.schema))
            .await
            .map_err(|e| ConnectivityError::statement("USE", e))?;

        self.state = CatalogState::Active;
        Ok(AttachedCatalog {
            catalog: self.settings.catalog.clone(),
            schema: self.settings.schema.clone(),
        })
    }

    /// Run the full protocol, restarting from `UNATTACHED` if needed
    pub async fn setup(&mut self, session: &dyn EngineSession) -> Result<AttachedCatalog, ConnectivityError> {
        if self.state != CatalogState::Unattached {
            debug!(state = self.state.as_str(), "Re-running catalog setup");
            self.state = CatalogState::Unattached;
        }

        self.prepare_extensions(session).await?;
        self.attach(session).await?;
        let attached = self.activate(session).await?;

        log_database_list(session).await;
        log_catalog_tables(session, &attached).await;

        Ok(attached)
    }
}

/// Validate `logical` and bring its catalog to `ACTIVE` on `session`
pub async fn setup(
    session: &dyn EngineSession,
    logical: &LogicalConnection,
) -> Result<AttachedCatalog, DiscoveryError> {
    let settings = LakehouseSettings::from_connection(logical)?;
    let attached = CatalogLifecycle::new(settings).setup(session).await?;
    Ok(attached)
}

async fn install_and_load(session: &dyn EngineSession, extension: &'static str) -> Result<(), ConnectivityError> {
    // already-installed (or offline with a cached copy) is fine; LOAD decides
    if let Err(e) = session.execute(&format!("INSTALL {}", extension)).await {
        debug!(extension, error = %e, "INSTALL failed, continuing with LOAD");
    }

    session
        .execute(&format!("LOAD {}", extension))
        .await
        .map_err(|e| ConnectivityError::statement(load_step(extension), e))
}

fn load_step(extension: &str) -> &'static str {
    match extension {
        LAKEHOUSE_EXTENSION => "LOAD ducklake",
        REMOTE_STORAGE_EXTENSION => "LOAD httpfs",
        _ => "LOAD",
    }
}

async fn log_database_list(session: &dyn EngineSession) {
    match session.query("PRAGMA database_list;", &[]).await {
        Ok(rows) => {
            for row in rows {
                debug!(
                    name = row.get("name").unwrap_or_default(),
                    file = row.get("file").unwrap_or_default(),
                    "database_list"
                );
            }
        }
        Err(e) => debug!(error = %e, "Could not read database_list"),
    }
}

async fn log_catalog_tables(session: &dyn EngineSession, attached: &AttachedCatalog) {
    let sql = "SELECT table_name FROM information_schema.tables \
               WHERE table_catalog = ? AND table_schema = ? ORDER BY table_name";

    match session
        .query(sql, &[attached.catalog.as_str(), attached.schema.as_str()])
        .await
    {
        Ok(rows) => {
            for row in &rows {
                debug!(
                    "lakehouse table: {}.{}.{}",
                    attached.catalog,
                    attached.schema,
                    row.get_index(0).unwrap_or_default()
                );
            }
            info!(
                "Lakehouse tables visible in {}.{}: {}",
                attached.catalog,
                attached.schema,
                rows.len()
            );
        }
        Err(e) => warn!("Could not enumerate tables via information_schema: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::mock::MockEngine;

    fn lake() -> LogicalConnection {
        LogicalConnection::new("lake", "ducklake")
            .with_database_name("sales")
            .with_ducklake_data_path("/data/lake/")
            .with_ducklake_metadata_db("/data/meta.ducklake")
    }

    #[test]
    fn settings_from_valid_connection() {
        let settings = LakehouseSettings::from_connection(&lake()).unwrap();
        assert_eq!(settings.catalog.as_str(), "sales");
        assert_eq!(settings.schema.as_str(), "main");
        assert!(!settings.is_remote());
    }

    #[test]
    fn settings_require_fields_in_order() {
        let missing = |conn: LogicalConnection| match LakehouseSettings::from_connection(&conn) {
            Err(ConfigurationError::MissingField { field, .. }) => field,
            other => panic!("expected MissingField, got {:?}", other),
        };

        assert_eq!(missing(LogicalConnection::new("lake", "ducklake")), "database_name");
        assert_eq!(
            missing(LogicalConnection::new("lake", "ducklake").with_database_name("sales")),
            "ducklake_data_path"
        );
        assert_eq!(
            missing(
                LogicalConnection::new("lake", "ducklake")
                    .with_database_name("sales")
                    .with_ducklake_data_path("/data/")
                    .with_ducklake_metadata_db(" ")
            ),
            "ducklake_metadata_db"
        );
    }

    #[test]
    fn settings_reject_unsafe_names() {
        let err = LakehouseSettings::from_connection(&lake().with_database_name("bad name!")).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidIdentifier { field: "database_name", .. }));

        let err = LakehouseSettings::from_connection(&lake().with_schema_name("main; DROP")).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidIdentifier { field: "schema_name", .. }));
    }

    #[tokio::test]
    async fn setup_twice_on_one_session_yields_same_catalog() {
        let engine = MockEngine::new();
        let session = engine.open("duckdb:").await.unwrap();

        let first = setup(session.as_ref(), &lake()).await.unwrap();
        let second = setup(session.as_ref(), &lake()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.catalog.as_str(), "sales");
        assert_eq!(first.schema.as_str(), "main");
        assert_eq!(engine.count_matching("ATTACH").await, 2);
        assert_eq!(engine.count_matching("USE").await, 2);
    }

    #[tokio::test]
    async fn setup_rejects_unsafe_catalog_before_any_statement() {
        let engine = MockEngine::new();
        let session = engine.open("duckdb:").await.unwrap();

        let err = setup(session.as_ref(), &lake().with_database_name("bad name!"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DiscoveryError::Configuration(ConfigurationError::InvalidIdentifier { field: "database_name", .. })
        ));
        assert!(engine.statements().await.is_empty());
    }

    #[test]
    fn remote_detection() {
        assert!(is_remote_path("s3://bucket/lake/"));
        assert!(is_remote_path("S3://bucket/lake/"));
        assert!(is_remote_path("gs://bucket/lake/"));
        assert!(!is_remote_path("/data/s3://not-really"));
        assert!(!is_remote_path("data/lake"));
    }

    #[test]
    fn statement_text() {
        let settings = LakehouseSettings::from_connection(
            &lake().with_ducklake_data_path("/data/o'brien/"),
        )
        .unwrap();

        assert_eq!(
            attach_statement(&settings),
            "ATTACH 'ducklake:/data/meta.ducklake' AS \"sales\" (DATA_PATH '/data/o''brien/');"
        );
        assert_eq!(
            use_statement(&settings.catalog, &settings.schema),
            "USE \"sales\".\"main\";"
        );
        assert_eq!(set_statement("s3_region", "eu-west-1"), "SET s3_region='eu-west-1'");
    }

    #[test]
    fn remote_settings_only_when_present() {
        let remote = RemoteStorage {
            region: Some("eu-west-1".into()),
            access_key_id: None,
            secret_access_key: Some("".into()),
        };
        assert_eq!(remote.settings(), vec![("s3_region", "eu-west-1")]);
    }

    #[test]
    fn remote_debug_hides_keys() {
        let remote = RemoteStorage {
            region: Some("eu-west-1".into()),
            access_key_id: Some("AKIAEXAMPLE".into()),
            secret_access_key: Some("topsecret".into()),
        };
        let rendered = format!("{:?}", remote);
        assert!(!rendered.contains("AKIAEXAMPLE"));
        assert!(!rendered.contains("topsecret"));
    }
}
