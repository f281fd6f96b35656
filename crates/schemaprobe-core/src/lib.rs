//! SchemaProbe Core
//!
//! Dialect-independent metadata model, connection descriptions and
//! configuration loading shared by the extraction engine and the CLI.

pub mod model;
pub mod connection;
pub mod config;
pub mod template;

pub use model::{Column, Database, Nullability, Relation, Table, View};
pub use connection::{LogicalConnection, present};
pub use config::{Config, ConfigError};
