//! Lakehouse schema extraction
//!
//! This crate attaches a DuckLake catalog into an embedded engine session and
//! extracts its tables, views and columns into the normalized model from
//! `schemaprobe-core`.
//!
//! ## Features
//!
//! Enable engine support via Cargo features:
//! - `duckdb` - embedded DuckDB sessions ([`DuckDbEngine`])
//!
//! Without it, [`MockEngine`] is the only engine that can open sessions.
//!
//! ## Example
//!
//! ```rust,ignore
//! use schemaprobe_core::LogicalConnection;
//! use schemaprobe_extract::{DuckDbEngine, LakehouseSource};
//! use std::sync::Arc;
//!
//! let lake = LogicalConnection::new("lake", "ducklake")
//!     .with_database_name("sales")
//!     .with_ducklake_data_path("/data/lake/")
//!     .with_ducklake_metadata_db("/data/metadata.ducklake");
//!
//! let source = LakehouseSource::new(Arc::new(DuckDbEngine::new()));
//! let database = source.extract(&lake).await?;
//! ```

pub mod duckdb_engine;
pub mod engine;
pub mod error;
pub mod extractors;
pub mod ident;
pub mod lifecycle;
pub mod mock;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod source;

pub use duckdb_engine::DuckDbEngine;
pub use engine::{Engine, EngineSession, Row};
pub use error::{AttachFailure, ConfigurationError, ConnectivityError, DiscoveryError, EngineError, ExtractionError};
pub use extractors::{ColumnExtractor, TableExtractor, ViewExtractor};
pub use ident::{quote_identifier, quote_literal, QuotedIdentifier, SafeIdentifier};
pub use lifecycle::{AttachOutcome, AttachedCatalog, CatalogLifecycle, CatalogState, LakehouseSettings};
pub use mock::{MockEngine, MockEngineBuilder};
pub use orchestrator::{filter_metadata_tables, DiscoveryStep, Orchestrator, TableDiscovery, METADATA_TABLE_NAMES};
pub use registry::{Capability, ExtractorBinding, ExtractorHandle, ExtractorRegistry};
pub use resolver::{resolve, WorkingConnection};
pub use source::LakehouseSource;
