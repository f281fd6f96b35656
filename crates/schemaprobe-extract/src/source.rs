//! Lakehouse extraction entry point
//!
//! [`LakehouseSource`] owns the session scope: it validates the connection,
//! opens one session, brings the catalog to `ACTIVE`, runs the requested work
//! and closes the session on every exit path. When a timeout cancels the
//! work, dropping the session releases it.

use crate::engine::{Engine, EngineSession, Row};
use crate::error::{ConnectivityError, DiscoveryError};
use crate::lifecycle::{AttachedCatalog, CatalogLifecycle, LakehouseSettings, LAKEHOUSE_EXTENSION};
use crate::orchestrator::Orchestrator;
use crate::registry::ExtractorRegistry;
use crate::resolver::{resolve, session_url};
use schemaprobe_core::{Database, LogicalConnection};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Extracts lakehouse catalogs through an [`Engine`]
pub struct LakehouseSource {
    engine: Arc<dyn Engine>,

    /// `None` uses the process-wide registry
    registry: Option<Arc<ExtractorRegistry>>,

    timeout: Option<Duration>,
}

/// An open session with its catalog brought to `ACTIVE`
struct ActiveSession {
    session: Box<dyn EngineSession>,
    url: String,
    attached: Result<AttachedCatalog, DiscoveryError>,
}

impl ActiveSession {
    async fn close(self) {
        if let Err(e) = self.session.close().await {
            warn!("Failed to close engine session: {}", e);
        }
    }
}

impl LakehouseSource {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            registry: None,
            timeout: None,
        }
    }

    /// Use a custom registry instead of the process-wide one
    pub fn with_registry(mut self, registry: Arc<ExtractorRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Bound every call; the session is released when the limit is hit
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    fn registry(&self) -> &ExtractorRegistry {
        self.registry.as_deref().unwrap_or_else(|| ExtractorRegistry::global())
    }

    /// Extract the full schema of the connection's catalog
    pub async fn extract(&self, logical: &LogicalConnection) -> Result<Database, DiscoveryError> {
        self.bounded(async {
            let active = self.activate(logical).await?;

            let result = match &active.attached {
                Ok(attached) => {
                    let working = resolve(logical, &active.url, attached);
                    debug!(?working, "Resolved working connection");

                    let database = Orchestrator::new(self.registry())
                        .extract(&working, active.session.as_ref())
                        .await;
                    info!(
                        "Extracted {} tables and {} views from {}",
                        database.tables.len(),
                        database.views.len(),
                        database.name
                    );
                    Ok(database)
                }
                Err(e) => Err(e.clone()),
            };

            active.close().await;
            result
        })
        .await
    }

    /// Run setup only and report the catalog identity
    pub async fn validate(&self, logical: &LogicalConnection) -> Result<Database, DiscoveryError> {
        self.bounded(async {
            let active = self.activate(logical).await?;

            let result = active.attached.clone().map(|attached| {
                info!(catalog = %attached.catalog, schema = %attached.schema, "Lakehouse catalog is reachable");
                Database::new(format!("{}:{}", LAKEHOUSE_EXTENSION, attached.catalog))
                    .with_database_type(logical.dialect.clone())
            });

            active.close().await;
            result
        })
        .await
    }

    /// Run setup, then `sql`, returning its rows
    pub async fn execute_sql(&self, logical: &LogicalConnection, sql: &str) -> Result<Vec<Row>, DiscoveryError> {
        self.bounded(async {
            let active = self.activate(logical).await?;

            let result = match &active.attached {
                Ok(_) => {
                    info!("Executing SQL: {}", sql);
                    active
                        .session
                        .query(sql, &[])
                        .await
                        .map_err(|e| DiscoveryError::from(ConnectivityError::statement("SQL", e)))
                }
                Err(e) => Err(e.clone()),
            };

            active.close().await;
            result
        })
        .await
    }

    /// Validate, open a session and run the catalog lifecycle
    ///
    /// Nothing is sent to the engine before validation succeeds. Once the
    /// session is open it is returned even when setup fails, so the caller
    /// can close it.
    async fn activate(&self, logical: &LogicalConnection) -> Result<ActiveSession, DiscoveryError> {
        let settings = LakehouseSettings::from_connection(logical)?;
        if !self.engine.is_available() {
            return Err(ConnectivityError::Unavailable(self.engine.name().to_string()).into());
        }
        let url = session_url(logical);

        let session = self
            .engine
            .open(&url)
            .await
            .map_err(|source| ConnectivityError::Open { url: url.clone(), source })?;
        debug!(engine = self.engine.name(), url = %url, "Session opened");

        let attached = CatalogLifecycle::new(settings)
            .setup(session.as_ref())
            .await
            .map_err(DiscoveryError::from);

        Ok(ActiveSession { session, url, attached })
    }

    async fn bounded<T>(&self, work: impl Future<Output = Result<T, DiscoveryError>>) -> Result<T, DiscoveryError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| DiscoveryError::Timeout(limit))?,
            None => work.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockEngine, MockEngineBuilder};

    fn lake() -> LogicalConnection {
        LogicalConnection::new("lake", "ducklake")
            .with_database_name("sales")
            .with_ducklake_data_path("/data/lake/")
            .with_ducklake_metadata_db("/data/meta.ducklake")
    }

    #[tokio::test]
    async fn validate_reports_catalog_identity() {
        let engine = MockEngine::new();
        let source = LakehouseSource::new(Arc::new(engine.clone()));

        let database = source.validate(&lake()).await.unwrap();

        assert_eq!(database.name, "ducklake:sales");
        assert!(database.tables.is_empty());
        assert_eq!(engine.live_sessions(), 0);
    }

    #[tokio::test]
    async fn invalid_connection_never_opens_a_session() {
        let engine = MockEngine::new();
        let source = LakehouseSource::new(Arc::new(engine.clone()));

        let err = source.extract(&lake().with_database_name("bad name!")).await.unwrap_err();

        assert!(matches!(err, DiscoveryError::Configuration(_)));
        assert_eq!(engine.opened_sessions(), 0);
        assert!(engine.statements().await.is_empty());
    }

    #[tokio::test]
    async fn open_failure_is_connectivity_error() {
        let engine = MockEngine::new().with_open_failure("IO Error: permission denied");
        let source = LakehouseSource::new(Arc::new(engine));

        let err = source.extract(&lake().with_duckdb_database_path("/ro/session.db")).await.unwrap_err();
        match err {
            DiscoveryError::Connectivity(ConnectivityError::Open { url, .. }) => {
                assert_eq!(url, "duckdb:/ro/session.db")
            }
            other => panic!("expected open failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn execute_sql_returns_rows() {
        let engine = MockEngineBuilder::new()
            .with_rows("SELECT count(*)", vec![Row::from_pairs([("count_star()", "3")])])
            .build();
        let source = LakehouseSource::new(Arc::new(engine.clone()));

        let rows = source.execute_sql(&lake(), "SELECT count(*) FROM orders").await.unwrap();

        assert_eq!(rows[0].get("count_star()"), Some("3"));
        assert!(engine.position("USE").await < engine.position("SELECT count(*)").await);
        assert_eq!(engine.live_sessions(), 0);
    }

    struct UncompiledEngine;

    #[async_trait::async_trait]
    impl Engine for UncompiledEngine {
        fn name(&self) -> &'static str {
            "DuckDB"
        }

        fn is_available(&self) -> bool {
            false
        }

        async fn open(&self, _url: &str) -> Result<Box<dyn EngineSession>, crate::error::EngineError> {
            panic!("open must not be called on an unavailable engine")
        }
    }

    #[tokio::test]
    async fn unavailable_engine_is_reported_before_open() {
        let source = LakehouseSource::new(Arc::new(UncompiledEngine));

        let err = source.validate(&lake()).await.unwrap_err();

        assert_eq!(
            err,
            DiscoveryError::Connectivity(ConnectivityError::Unavailable("DuckDB".to_string()))
        );
        assert!(err.to_string().contains("--features duckdb"));
    }

    #[tokio::test]
    async fn extract_uses_process_wide_registry_by_default() {
        let engine = MockEngineBuilder::new()
            .with_rows(
                "duckdb_tables()",
                vec![Row::from_pairs([("schema_name", "main"), ("table_name", "orders")])],
            )
            .build();
        let source = LakehouseSource::new(Arc::new(engine.clone()));

        let database = source.extract(&lake()).await.unwrap();

        assert_eq!(database.tables.len(), 1);
        assert!(engine.executed("duckdb_tables()").await);
    }

    #[tokio::test]
    async fn close_failure_does_not_fail_extraction() {
        let engine = MockEngine::new().with_close_failure("IO Error: flush failed");
        let source = LakehouseSource::new(Arc::new(engine.clone()));

        assert!(source.extract(&lake()).await.is_ok());
        assert_eq!(engine.live_sessions(), 0);
    }
}
