//! Dialect → extractor registry
//!
//! The registry is an explicit table built once at startup. Lookups never
//! fail: a dialect without a dedicated extractor gets the built-in default
//! for that capability, and a warning is logged so a dedicated extractor can
//! be added later.
//!
//! # Adding an extractor
//!
//! 1. Implement [`TableExtractor`], [`ViewExtractor`] or [`ColumnExtractor`]
//!    and return the dialect tags it serves from `dialects()`.
//! 2. Register it in [`ExtractorRegistry::builtin`].

use crate::extractors::{
    ColumnExtractor, DefaultColumnExtractor, DefaultTableExtractor, DefaultViewExtractor,
    DuckDbColumnExtractor, DuckDbTableExtractor, DuckDbViewExtractor, TableExtractor,
    ViewExtractor,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::warn;

/// One of the three extraction capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Table,
    View,
    Column,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::View => write!(f, "view"),
            Self::Column => write!(f, "column"),
        }
    }
}

/// A resolved extractor for one capability
#[derive(Clone)]
pub enum ExtractorHandle {
    Table(Arc<dyn TableExtractor>),
    View(Arc<dyn ViewExtractor>),
    Column(Arc<dyn ColumnExtractor>),
}

impl ExtractorHandle {
    pub fn capability(&self) -> Capability {
        match self {
            Self::Table(_) => Capability::Table,
            Self::View(_) => Capability::View,
            Self::Column(_) => Capability::Column,
        }
    }

    /// Name of the underlying extractor
    pub fn name(&self) -> &'static str {
        match self {
            Self::Table(e) => e.name(),
            Self::View(e) => e.name(),
            Self::Column(e) => e.name(),
        }
    }
}

impl fmt::Debug for ExtractorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtractorHandle::{}({})", self.capability(), self.name())
    }
}

/// The full capability set for one dialect
#[derive(Clone)]
pub struct ExtractorBinding {
    pub table: Arc<dyn TableExtractor>,
    pub view: Arc<dyn ViewExtractor>,
    pub column: Arc<dyn ColumnExtractor>,
}

impl fmt::Debug for ExtractorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorBinding")
            .field("table", &self.table.name())
            .field("view", &self.view.name())
            .field("column", &self.column.name())
            .finish()
    }
}

/// Registry of extractors keyed by lower-cased dialect tag
pub struct ExtractorRegistry {
    tables: HashMap<String, Arc<dyn TableExtractor>>,
    views: HashMap<String, Arc<dyn ViewExtractor>>,
    columns: HashMap<String, Arc<dyn ColumnExtractor>>,
    defaults: ExtractorBinding,
}

impl ExtractorRegistry {
    /// Create a registry with only the given defaults
    pub fn new(defaults: ExtractorBinding) -> Self {
        Self {
            tables: HashMap::new(),
            views: HashMap::new(),
            columns: HashMap::new(),
            defaults,
        }
    }

    /// Registry with the `information_schema` defaults and no dialect entries
    pub fn with_default_extractors() -> Self {
        Self::new(ExtractorBinding {
            table: Arc::new(DefaultTableExtractor),
            view: Arc::new(DefaultViewExtractor),
            column: Arc::new(DefaultColumnExtractor),
        })
    }

    /// The startup table of every built-in extractor
    pub fn builtin() -> Self {
        let mut registry = Self::with_default_extractors();
        registry.register_table(Arc::new(DuckDbTableExtractor));
        registry.register_view(Arc::new(DuckDbViewExtractor));
        registry.register_column(Arc::new(DuckDbColumnExtractor));
        registry.register_view(Arc::new(DefaultViewExtractor));
        registry
    }

    /// Process-wide registry, built on first use and read-only afterwards
    pub fn global() -> &'static ExtractorRegistry {
        static GLOBAL: OnceLock<ExtractorRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::builtin)
    }

    pub fn register_table(&mut self, extractor: Arc<dyn TableExtractor>) {
        for dialect in extractor.dialects() {
            self.tables.insert(normalize(dialect), Arc::clone(&extractor));
        }
    }

    pub fn register_view(&mut self, extractor: Arc<dyn ViewExtractor>) {
        for dialect in extractor.dialects() {
            self.views.insert(normalize(dialect), Arc::clone(&extractor));
        }
    }

    pub fn register_column(&mut self, extractor: Arc<dyn ColumnExtractor>) {
        for dialect in extractor.dialects() {
            self.columns.insert(normalize(dialect), Arc::clone(&extractor));
        }
    }

    /// Whether `dialect` has a dedicated extractor for `capability`
    pub fn has_dialect(&self, dialect: &str, capability: Capability) -> bool {
        let key = normalize(dialect);
        match capability {
            Capability::Table => self.tables.contains_key(&key),
            Capability::View => self.views.contains_key(&key),
            Capability::Column => self.columns.contains_key(&key),
        }
    }

    /// Resolve the extractor for `(dialect, capability)`
    pub fn resolve(&self, dialect: &str, capability: Capability) -> ExtractorHandle {
        match capability {
            Capability::Table => ExtractorHandle::Table(self.table_extractor(dialect)),
            Capability::View => ExtractorHandle::View(self.view_extractor(dialect)),
            Capability::Column => ExtractorHandle::Column(self.column_extractor(dialect)),
        }
    }

    pub fn table_extractor(&self, dialect: &str) -> Arc<dyn TableExtractor> {
        lookup(&self.tables, dialect, Capability::Table)
            .unwrap_or_else(|| Arc::clone(&self.defaults.table))
    }

    pub fn view_extractor(&self, dialect: &str) -> Arc<dyn ViewExtractor> {
        lookup(&self.views, dialect, Capability::View)
            .unwrap_or_else(|| Arc::clone(&self.defaults.view))
    }

    pub fn column_extractor(&self, dialect: &str) -> Arc<dyn ColumnExtractor> {
        lookup(&self.columns, dialect, Capability::Column)
            .unwrap_or_else(|| Arc::clone(&self.defaults.column))
    }

    /// Resolve all three capabilities for `dialect`
    pub fn binding(&self, dialect: &str) -> ExtractorBinding {
        ExtractorBinding {
            table: self.table_extractor(dialect),
            view: self.view_extractor(dialect),
            column: self.column_extractor(dialect),
        }
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(dialect: &str) -> String {
    dialect.trim().to_ascii_lowercase()
}

fn lookup<T: ?Sized>(
    entries: &HashMap<String, Arc<T>>,
    dialect: &str,
    capability: Capability,
) -> Option<Arc<T>> {
    let found = entries.get(&normalize(dialect)).cloned();
    if found.is_none() {
        warn!(
            dialect,
            capability = %capability,
            "No {} extractor registered for dialect, falling back to default",
            capability
        );
    }
    found
}
