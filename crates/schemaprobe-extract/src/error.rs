//! Error taxonomy for the extraction engine
//!
//! Fatal kinds ([`ConfigurationError`], [`ConnectivityError`]) abort an
//! extraction and reach the caller through [`DiscoveryError`]. Recoverable
//! kinds ([`ExtractionError`], [`AttachFailure::Conflict`]) never leave the
//! engine: they move the fallback chain forward or count as success.

use std::time::Duration;

/// A statement or query failed inside the engine session
///
/// The message is the engine's own text, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Required connection settings are missing or unsafe to use
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{field} is required for {dialect} connections")]
    MissingField {
        field: &'static str,
        dialect: String,
    },

    #[error("{field} '{value}' is not a safe identifier (allowed: letters, digits, underscore)")]
    InvalidIdentifier {
        field: &'static str,
        value: String,
    },
}

/// The session could not be opened or a required statement failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectivityError {
    #[error("Failed to open engine session at {url}: {source}")]
    Open {
        url: String,
        #[source]
        source: EngineError,
    },

    #[error("{step} failed: {source}")]
    Statement {
        step: &'static str,
        #[source]
        source: EngineError,
    },

    #[error("Catalog lifecycle step '{step}' requires state {expected}, but catalog is {actual}")]
    OutOfOrder {
        step: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("{0} support not compiled. Rebuild with: cargo build --features duckdb")]
    Unavailable(String),
}

impl ConnectivityError {
    pub(crate) fn statement(step: &'static str, source: EngineError) -> Self {
        Self::Statement { step, source }
    }
}

/// An extractor could not produce a result; the caller falls back
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("{extractor} query failed: {source}")]
    Query {
        extractor: &'static str,
        #[source]
        source: EngineError,
    },

    #[error("{extractor} returned a row without '{column}'")]
    MissingColumn {
        extractor: &'static str,
        column: &'static str,
    },
}

impl ExtractionError {
    pub(crate) fn query(extractor: &'static str, source: EngineError) -> Self {
        Self::Query { extractor, source }
    }
}

/// How an `ATTACH` failure is treated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachFailure {
    /// The catalog is already attached in this session; counts as success
    Conflict,

    /// Anything else; propagated unmodified
    Fatal(EngineError),
}

impl AttachFailure {
    /// Classify an attach error by its message
    ///
    /// The engine does not expose a structured code for this case, so this
    /// relies on message text that is not part of any stable contract.
    pub fn classify(error: EngineError) -> Self {
        if error.message.contains("already exists") || error.message.contains("Catalog with name") {
            Self::Conflict
        } else {
            Self::Fatal(error)
        }
    }
}

/// Top-level failure of an extraction or validation call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Connectivity error: {0}")]
    Connectivity(#[from] ConnectivityError),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}
