//! Engine session abstraction
//!
//! Every statement the extraction engine issues goes through an
//! [`EngineSession`]. Sessions are opened by an [`Engine`] and are scoped:
//! whoever opens one closes it on every exit path.

use crate::error::EngineError;
use serde::Serialize;

/// One result row, with every cell rendered as text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Row {
    values: Vec<(String, Option<String>)>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cell
    pub fn with(mut self, column: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        self.values.push((column.into(), value.map(Into::into)));
        self
    }

    /// Build a row of non-null cells
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        }
    }

    /// Get a cell by column name (case-insensitive); `None` when missing or NULL
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .and_then(|(_, value)| value.as_deref())
    }

    /// Get a cell by position; `None` when out of range or NULL
    pub fn get_index(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|(_, value)| value.as_deref())
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A live session against an engine
#[async_trait::async_trait]
pub trait EngineSession: Send + Sync {
    /// Run a statement that returns no rows
    async fn execute(&self, sql: &str) -> Result<(), EngineError>;

    /// Run a query with positional `?` bind parameters
    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>, EngineError>;

    /// Release the session
    ///
    /// Dropping a session also releases it; `close` exists so callers can
    /// observe a failing close.
    async fn close(self: Box<Self>) -> Result<(), EngineError>;
}

/// Opens engine sessions
#[async_trait::async_trait]
pub trait Engine: Send + Sync {
    /// Get the engine name (e.g., "DuckDB")
    fn name(&self) -> &'static str;

    /// Whether this build can open sessions at all
    fn is_available(&self) -> bool {
        true
    }

    /// Open a session addressed by `url`
    async fn open(&self, url: &str) -> Result<Box<dyn EngineSession>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_lookup() {
        let row = Row::new()
            .with("table_name", Some("orders"))
            .with("comment", None::<String>);

        assert_eq!(row.get("table_name"), Some("orders"));
        assert_eq!(row.get("TABLE_NAME"), Some("orders"));
        assert_eq!(row.get("comment"), None);
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.get_index(0), Some("orders"));
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["table_name", "comment"]);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn row_from_pairs() {
        let row = Row::from_pairs([("name", "id"), ("type", "BIGINT")]);
        assert_eq!(row.get("type"), Some("BIGINT"));
        assert!(!row.is_empty());
    }
}
