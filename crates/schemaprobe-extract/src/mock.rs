//! Scripted engine for testing
//!
//! [`MockEngine`] answers statements from a list of rules instead of running
//! them. It's useful for:
//! - Unit testing the lifecycle, fallback chain and filtering
//! - Demos without a lakehouse on disk
//! - Simulating engine failures, slow sessions and attach conflicts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use schemaprobe_extract::{MockEngineBuilder, Row};
//!
//! let engine = MockEngineBuilder::new()
//!     .with_rows("ducklake_table", vec![
//!         Row::from_pairs([("schema_name", "main"), ("table_name", "orders")]),
//!     ])
//!     .with_failure("duckdb_views()", "Binder Error: views unavailable")
//!     .build();
//!
//! // ... run an extraction, then inspect what was sent
//! assert!(engine.executed("ATTACH").await);
//! ```
//!
//! ## Rules
//!
//! A rule matches when the statement text contains its pattern and, if the
//! rule names a parameter, the bind parameters contain that value. The first
//! matching rule wins. Unmatched queries return no rows; unmatched statements
//! succeed.
//!
//! `ATTACH ... AS "<name>"` is tracked per session: attaching the same name
//! twice on one session fails with the engine's "already exists" message.

use crate::engine::{Engine, EngineSession, Row};
use crate::error::EngineError;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
enum Response {
    Rows(Vec<Row>),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    param: Option<String>,
    response: Response,
}

impl Rule {
    fn matches(&self, sql: &str, params: &[&str]) -> bool {
        sql.contains(&self.pattern)
            && self
                .param
                .as_deref()
                .map_or(true, |wanted| params.contains(&wanted))
    }
}

/// Session bookkeeping shared by an engine and its clones
#[derive(Debug, Default)]
struct Counters {
    opened: AtomicUsize,
    released: AtomicUsize,
}

/// Scripted engine
///
/// Clones share rules, the statement log and session counters.
#[derive(Clone)]
pub struct MockEngine {
    rules: Arc<RwLock<Vec<Rule>>>,

    /// Every statement sent by any session, in order
    statements: Arc<RwLock<Vec<String>>>,

    counters: Arc<Counters>,

    /// Fail `open` with this message
    open_failure: Option<String>,

    /// Fail `close` with this message
    close_failure: Option<String>,

    /// Simulated per-statement latency (milliseconds)
    latency_ms: u64,

    engine_name: &'static str,
}

impl MockEngine {
    /// Create an engine with no rules
    pub fn new() -> Self {
        MockEngineBuilder::new().build()
    }

    /// Answer statements containing `pattern` with `rows`
    pub async fn add_rows(&self, pattern: &str, rows: Vec<Row>) {
        self.push_rule(pattern, None, Response::Rows(rows)).await;
    }

    /// Fail statements containing `pattern` with `message`
    pub async fn add_failure(&self, pattern: &str, message: &str) {
        self.push_rule(pattern, None, Response::Fail(message.to_string())).await;
    }

    async fn push_rule(&self, pattern: &str, param: Option<&str>, response: Response) {
        self.rules.write().await.push(Rule {
            pattern: pattern.to_string(),
            param: param.map(str::to_string),
            response,
        });
    }

    /// Fail every `open` call
    pub fn with_open_failure(mut self, message: impl Into<String>) -> Self {
        self.open_failure = Some(message.into());
        self
    }

    /// Fail every `close` call
    pub fn with_close_failure(mut self, message: impl Into<String>) -> Self {
        self.close_failure = Some(message.into());
        self
    }

    /// Delay every statement, useful for testing timeouts
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set a custom engine name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.engine_name = name;
        self
    }

    /// All statements sent so far
    pub async fn statements(&self) -> Vec<String> {
        self.statements.read().await.clone()
    }

    /// Whether any statement containing `pattern` was sent
    pub async fn executed(&self, pattern: &str) -> bool {
        self.count_matching(pattern).await > 0
    }

    /// Number of statements containing `pattern`
    pub async fn count_matching(&self, pattern: &str) -> usize {
        self.statements
            .read()
            .await
            .iter()
            .filter(|sql| sql.contains(pattern))
            .count()
    }

    /// Position of the first statement containing `pattern`
    pub async fn position(&self, pattern: &str) -> Option<usize> {
        self.statements
            .read()
            .await
            .iter()
            .position(|sql| sql.contains(pattern))
    }

    pub async fn clear_statements(&self) {
        self.statements.write().await.clear();
    }

    /// Sessions opened so far
    pub fn opened_sessions(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Sessions opened and not yet released
    pub fn live_sessions(&self) -> usize {
        self.opened_sessions() - self.counters.released.load(Ordering::SeqCst)
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Engine for MockEngine {
    fn name(&self) -> &'static str {
        self.engine_name
    }

    async fn open(&self, url: &str) -> Result<Box<dyn EngineSession>, EngineError> {
        if let Some(message) = &self.open_failure {
            return Err(EngineError::new(format!("{} ({})", message, url)));
        }

        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            engine: self.clone(),
            attached: RwLock::new(HashSet::new()),
        }))
    }
}

/// Session handed out by [`MockEngine`]
pub struct MockSession {
    engine: MockEngine,
    attached: RwLock<HashSet<String>>,
}

impl MockSession {
    async fn run(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>, EngineError> {
        if self.engine.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.engine.latency_ms)).await;
        }

        self.engine.statements.write().await.push(sql.to_string());

        let rule = self
            .engine
            .rules
            .read()
            .await
            .iter()
            .find(|rule| rule.matches(sql, params))
            .cloned();

        match rule.map(|r| r.response) {
            Some(Response::Rows(rows)) => Ok(rows),
            Some(Response::Fail(message)) => Err(EngineError::new(message)),
            None => {
                self.track_attach(sql).await?;
                Ok(Vec::new())
            }
        }
    }

    async fn track_attach(&self, sql: &str) -> Result<(), EngineError> {
        let Some(name) = attached_name(sql) else {
            return Ok(());
        };

        if !self.attached.write().await.insert(name.to_string()) {
            return Err(EngineError::new(format!(
                "Binder Error: Failed to attach database: database with name \"{}\" already exists",
                name
            )));
        }
        Ok(())
    }
}

/// Catalog name of an `ATTACH ... AS "<name>"` statement
fn attached_name(sql: &str) -> Option<&str> {
    if !sql.trim_start().starts_with("ATTACH") {
        return None;
    }
    let (_, rest) = sql.split_once(" AS \"")?;
    let (name, _) = rest.split_once('"')?;
    Some(name)
}

#[async_trait::async_trait]
impl EngineSession for MockSession {
    async fn execute(&self, sql: &str) -> Result<(), EngineError> {
        self.run(sql, &[]).await.map(|_| ())
    }

    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>, EngineError> {
        self.run(sql, params).await
    }

    async fn close(self: Box<Self>) -> Result<(), EngineError> {
        match &self.engine.close_failure {
            Some(message) => Err(EngineError::new(message.clone())),
            None => Ok(()),
        }
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.engine.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Builder for creating a MockEngine with rules
///
/// # Example
///
/// ```rust,ignore
/// let engine = MockEngineBuilder::new()
///     .with_rows_for("duckdb_columns()", "orders", order_columns)
///     .with_failure_for("duckdb_columns()", "refunds", "IO Error: file vanished")
///     .with_latency(50)
///     .build();
/// ```
pub struct MockEngineBuilder {
    rules: Vec<Rule>,
    open_failure: Option<String>,
    close_failure: Option<String>,
    latency_ms: u64,
    engine_name: &'static str,
}

impl MockEngineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            open_failure: None,
            close_failure: None,
            latency_ms: 0,
            engine_name: "Mock",
        }
    }

    fn rule(mut self, pattern: &str, param: Option<&str>, response: Response) -> Self {
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            param: param.map(str::to_string),
            response,
        });
        self
    }

    /// Answer statements containing `pattern` with `rows`
    pub fn with_rows(self, pattern: &str, rows: Vec<Row>) -> Self {
        self.rule(pattern, None, Response::Rows(rows))
    }

    /// Answer statements containing `pattern` and bound to `param` with `rows`
    pub fn with_rows_for(self, pattern: &str, param: &str, rows: Vec<Row>) -> Self {
        self.rule(pattern, Some(param), Response::Rows(rows))
    }

    /// Fail statements containing `pattern`
    pub fn with_failure(self, pattern: &str, message: &str) -> Self {
        self.rule(pattern, None, Response::Fail(message.to_string()))
    }

    /// Fail statements containing `pattern` and bound to `param`
    pub fn with_failure_for(self, pattern: &str, param: &str, message: &str) -> Self {
        self.rule(pattern, Some(param), Response::Fail(message.to_string()))
    }

    /// Configure open failure
    pub fn with_open_failure(mut self, message: impl Into<String>) -> Self {
        self.open_failure = Some(message.into());
        self
    }

    /// Configure close failure
    pub fn with_close_failure(mut self, message: impl Into<String>) -> Self {
        self.close_failure = Some(message.into());
        self
    }

    /// Configure latency
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set engine name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.engine_name = name;
        self
    }

    /// Build the MockEngine
    pub fn build(self) -> MockEngine {
        MockEngine {
            rules: Arc::new(RwLock::new(self.rules)),
            statements: Arc::new(RwLock::new(Vec::new())),
            counters: Arc::new(Counters::default()),
            open_failure: self.open_failure,
            close_failure: self.close_failure,
            latency_ms: self.latency_ms,
            engine_name: self.engine_name,
        }
    }
}

impl Default for MockEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unmatched_statements() {
        let engine = MockEngine::new();
        let session = engine.open("duckdb:").await.unwrap();

        assert!(session.execute("LOAD ducklake").await.is_ok());
        assert!(session.query("SELECT 1", &[]).await.unwrap().is_empty());
        assert_eq!(engine.statements().await, vec!["LOAD ducklake", "SELECT 1"]);
    }

    #[tokio::test]
    async fn test_first_matching_rule_wins() {
        let engine = MockEngineBuilder::new()
            .with_rows_for("duckdb_columns()", "orders", vec![Row::from_pairs([("column_name", "id")])])
            .with_failure("duckdb_columns()", "Catalog Error: missing")
            .build();
        let session = engine.open("duckdb:").await.unwrap();

        let rows = session
            .query("SELECT * FROM duckdb_columns()", &["sales", "main", "orders"])
            .await
            .unwrap();
        assert_eq!(rows[0].get("column_name"), Some("id"));

        let err = session
            .query("SELECT * FROM duckdb_columns()", &["sales", "main", "refunds"])
            .await
            .unwrap_err();
        assert_eq!(err.message, "Catalog Error: missing");
    }

    #[tokio::test]
    async fn test_rules_added_after_build() {
        let engine = MockEngine::new();
        engine.add_failure("LOAD httpfs", "IO Error: offline").await;
        let session = engine.open("duckdb:").await.unwrap();

        assert!(session.execute("LOAD httpfs").await.is_err());
    }

    #[tokio::test]
    async fn test_add_rows_and_clear_statements() {
        let engine = MockEngine::new();
        let session = engine.open("duckdb:").await.unwrap();
        session.execute("LOAD ducklake").await.unwrap();

        engine.clear_statements().await;
        engine
            .add_rows("duckdb_views()", vec![Row::from_pairs([("view_name", "daily_revenue")])])
            .await;

        let rows = session.query("SELECT * FROM duckdb_views()", &[]).await.unwrap();
        assert_eq!(rows[0].get("view_name"), Some("daily_revenue"));
        assert_eq!(engine.statements().await, vec!["SELECT * FROM duckdb_views()"]);
    }

    #[tokio::test]
    async fn test_attach_twice_conflicts() {
        let engine = MockEngine::new();
        let sql = "ATTACH 'ducklake:meta.ducklake' AS \"sales\" (DATA_PATH 'data/');";

        let session = engine.open("duckdb:").await.unwrap();
        assert!(session.execute(sql).await.is_ok());
        let err = session.execute(sql).await.unwrap_err();
        assert!(err.message.contains("already exists"));

        // a fresh session starts with nothing attached
        let other = engine.open("duckdb:").await.unwrap();
        assert!(other.execute(sql).await.is_ok());
    }

    #[tokio::test]
    async fn test_session_counting() {
        let engine = MockEngine::new();

        let first = engine.open("duckdb:").await.unwrap();
        let second = engine.open("duckdb:").await.unwrap();
        assert_eq!(engine.live_sessions(), 2);

        first.close().await.unwrap();
        drop(second);
        assert_eq!(engine.opened_sessions(), 2);
        assert_eq!(engine.live_sessions(), 0);
    }

    #[tokio::test]
    async fn test_open_and_close_failures() {
        let engine = MockEngine::new().with_open_failure("IO Error: cannot open");
        assert!(engine.open("duckdb:/tmp/x.db").await.is_err());
        assert_eq!(engine.opened_sessions(), 0);

        let engine = MockEngine::new().with_close_failure("IO Error: flush failed");
        let session = engine.open("duckdb:").await.unwrap();
        assert!(session.close().await.is_err());
        assert_eq!(engine.live_sessions(), 0);
    }

    #[tokio::test]
    async fn test_engine_name() {
        assert_eq!(MockEngine::new().name(), "Mock");
        assert_eq!(MockEngine::new().with_name("TestDuckDB").name(), "TestDuckDB");
    }

    #[test]
    fn test_attached_name() {
        assert_eq!(attached_name("ATTACH 'ducklake:m' AS \"sales\" (DATA_PATH 'd');"), Some("sales"));
        assert_eq!(attached_name("USE \"sales\".\"main\";"), None);
    }
}
