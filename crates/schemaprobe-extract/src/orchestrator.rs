//! Extraction orchestration
//!
//! Runs table, view and column extraction against an active session and
//! assembles the [`Database`] result. Extraction never fails once the catalog
//! is active: every recoverable error is logged and narrows the result
//! instead.
//!
//! Tables are discovered through a fallback chain that stops at the first
//! non-empty step:
//!
//! 1. the lakehouse metadata catalog (`ducklake_table` joined with
//!    `ducklake_schema`, live rows only)
//! 2. the table extractor registered for the working dialect
//! 3. `information_schema.tables`, base tables only

use crate::engine::EngineSession;
use crate::error::ExtractionError;
use crate::extractors::{information_schema, ColumnExtractor};
use crate::ident::quote_identifier;
use crate::registry::ExtractorRegistry;
use crate::resolver::WorkingConnection;
use schemaprobe_core::{Database, Relation, Table, View};
use std::fmt;
use tracing::{debug, info, warn};

/// Bookkeeping tables the lakehouse format keeps next to user data
pub const METADATA_TABLE_NAMES: &[&str] = &[
    "ducklake_column",
    "ducklake_column_tag",
    "ducklake_data_file",
    "ducklake_delete_file",
    "ducklake_file_column_statistics",
    "ducklake_file_partition_value",
    "ducklake_files_scheduled_for_deletion",
    "ducklake_inlined_data_tables",
    "ducklake_metadata",
    "ducklake_partition_column",
    "ducklake_partition_info",
    "ducklake_schema",
    "ducklake_snapshot",
    "ducklake_snapshot_changes",
    "ducklake_table",
    "ducklake_table_column_stats",
    "ducklake_table_stats",
    "ducklake_tag",
    "ducklake_view",
    "ducklake_schema_settings",
    "ducklake_table_settings",
];

const METADATA_CATALOG_STEP: &str = "ducklake_table";

/// Whether `name` is one of the lakehouse bookkeeping tables
pub fn is_metadata_table(name: &str) -> bool {
    METADATA_TABLE_NAMES.contains(&name)
}

/// Drop bookkeeping tables and unnamed entries, keeping order
pub fn filter_metadata_tables<R: Relation>(relations: Vec<R>) -> Vec<R> {
    relations
        .into_iter()
        .filter(|r| !r.name().is_empty() && !is_metadata_table(r.name()))
        .collect()
}

/// Keep only the allow-listed relations; an empty list keeps everything
pub fn apply_allow_list<R: Relation>(relations: Vec<R>, allow_list: &[String]) -> Vec<R> {
    if allow_list.is_empty() {
        return relations;
    }

    relations
        .into_iter()
        .filter(|r| allow_list.iter().any(|name| name.trim().eq_ignore_ascii_case(r.name())))
        .collect()
}

/// Step of the table fallback chain that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStep {
    /// Live rows of the lakehouse metadata catalog
    MetadataCatalog,

    /// The registry's table extractor, by name
    Extractor(&'static str),

    /// `information_schema.tables`
    InformationSchema,
}

impl fmt::Display for DiscoveryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MetadataCatalog => write!(f, "metadata catalog"),
            Self::Extractor(name) => write!(f, "extractor {}", name),
            Self::InformationSchema => write!(f, "information_schema"),
        }
    }
}

/// Tables found by the fallback chain
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableDiscovery {
    pub tables: Vec<Table>,

    /// `None` when every step came back empty
    pub source: Option<DiscoveryStep>,
}

/// Query listing live tables of one schema from the metadata catalog
pub fn metadata_tables_query(metadata_catalog: &str) -> String {
    let prefix = format!("{}.main", quote_identifier(metadata_catalog));
    format!(
        "SELECT s.schema_name, t.table_name \
         FROM {prefix}.ducklake_table t \
         JOIN {prefix}.ducklake_schema s ON t.schema_id = s.schema_id \
         WHERE s.schema_name = ? AND t.end_snapshot IS NULL AND s.end_snapshot IS NULL \
         ORDER BY t.table_name"
    )
}

/// Runs extraction for one working connection
pub struct Orchestrator<'r> {
    registry: &'r ExtractorRegistry,
}

impl<'r> Orchestrator<'r> {
    pub fn new(registry: &'r ExtractorRegistry) -> Self {
        Self { registry }
    }

    /// Extract tables, views and their columns
    pub async fn extract(&self, working: &WorkingConnection, session: &dyn EngineSession) -> Database {
        let column_extractor = self.registry.column_extractor(&working.dialect);

        let discovery = self.discover_tables(working, session).await;
        let mut tables = apply_allow_list(filter_metadata_tables(discovery.tables), &working.tables);

        if tables.is_empty() {
            warn!(
                catalog = %working.catalog,
                schema = %working.schema,
                "No tables found in {}.{}",
                working.catalog,
                working.schema
            );
        } else if let Some(step) = discovery.source {
            info!("Discovered {} tables via {}", tables.len(), step);
        }

        attach_columns(column_extractor.as_ref(), working, session, &mut tables).await;

        let mut views = self.discover_views(working, session).await;
        attach_columns(column_extractor.as_ref(), working, session, &mut views).await;

        let mut database = Database::new(format!("{}:{}", working.origin_dialect, working.catalog))
            .with_database_type(working.origin_dialect.clone());
        database.tables = tables;
        database.views = views;
        database
    }

    /// Run the table fallback chain
    pub async fn discover_tables(&self, working: &WorkingConnection, session: &dyn EngineSession) -> TableDiscovery {
        if let Some(metadata_catalog) = working.metadata_catalog.as_deref() {
            match metadata_catalog_tables(working, session, metadata_catalog).await {
                Ok(tables) if !tables.is_empty() => {
                    return TableDiscovery {
                        tables,
                        source: Some(DiscoveryStep::MetadataCatalog),
                    };
                }
                Ok(_) => warn!(metadata_catalog, "Metadata catalog lists no tables, trying extractor"),
                Err(e) => warn!(metadata_catalog, "Metadata catalog query failed, trying extractor: {}", e),
            }
        }

        let extractor = self.registry.table_extractor(&working.dialect);
        match extractor.extract(working, session).await {
            Ok(tables) if !tables.is_empty() => {
                return TableDiscovery {
                    tables,
                    source: Some(DiscoveryStep::Extractor(extractor.name())),
                };
            }
            Ok(_) => warn!(extractor = extractor.name(), "Extractor returned no tables, trying information_schema"),
            Err(e) => warn!(extractor = extractor.name(), "Extractor failed, trying information_schema: {}", e),
        }

        match information_schema::base_tables(working, session, "information_schema.tables").await {
            Ok(tables) if !tables.is_empty() => TableDiscovery {
                tables,
                source: Some(DiscoveryStep::InformationSchema),
            },
            Ok(_) => TableDiscovery::default(),
            Err(e) => {
                warn!("information_schema fallback failed: {}", e);
                TableDiscovery::default()
            }
        }
    }

    /// Discover views with the registry's view extractor, once
    pub async fn discover_views(&self, working: &WorkingConnection, session: &dyn EngineSession) -> Vec<View> {
        let extractor = self.registry.view_extractor(&working.dialect);
        match extractor.extract(working, session).await {
            Ok(views) => {
                let views = filter_metadata_tables(views);
                debug!(extractor = extractor.name(), "Discovered {} views", views.len());
                views
            }
            Err(e) => {
                warn!(extractor = extractor.name(), "View discovery failed, continuing without views: {}", e);
                Vec::new()
            }
        }
    }
}

async fn metadata_catalog_tables(
    working: &WorkingConnection,
    session: &dyn EngineSession,
    metadata_catalog: &str,
) -> Result<Vec<Table>, ExtractionError> {
    let rows = session
        .query(&metadata_tables_query(metadata_catalog), &[working.schema.as_str()])
        .await
        .map_err(|e| ExtractionError::query(METADATA_CATALOG_STEP, e))?;

    Ok(rows
        .iter()
        .filter_map(|row| {
            let name = row.get("table_name").filter(|n| !n.is_empty())?;
            let schema = row.get("schema_name").unwrap_or(working.schema.as_str());
            Some(Table::new(schema, name))
        })
        .collect())
}

async fn attach_columns<R: Relation>(
    extractor: &dyn ColumnExtractor,
    working: &WorkingConnection,
    session: &dyn EngineSession,
    relations: &mut [R],
) {
    for relation in relations.iter_mut() {
        let result = extractor
            .columns(working, session, relation.schema(), relation.name())
            .await;

        match result {
            Ok(columns) => relation.set_columns(columns),
            Err(e) => {
                warn!(
                    relation = relation.name(),
                    "Column extraction failed, leaving columns empty: {}", e
                );
                relation.set_columns(Vec::new());
            }
        }
    }
}
