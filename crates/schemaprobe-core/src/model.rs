//! Normalized, dialect-independent metadata model
//!
//! These types are what every extraction produces, regardless of the engine
//! the metadata was read from.

use serde::{Deserialize, Serialize};

/// Nullability state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nullability {
    /// Definitely nullable
    Yes,

    /// Definitely not nullable
    No,

    /// Cannot determine nullability
    Unknown,
}

impl Nullability {
    /// Interpret the `is_nullable` flag engines report in their catalogs
    ///
    /// Accepts `YES`/`NO` (information_schema) as well as `true`/`false`
    /// (DuckDB table functions).
    pub fn from_flag(flag: &str) -> Self {
        match flag.trim().to_ascii_uppercase().as_str() {
            "YES" | "TRUE" | "T" | "1" => Self::Yes,
            "NO" | "FALSE" | "F" | "0" => Self::No,
            _ => Self::Unknown,
        }
    }
}

impl Default for Nullability {
    fn default() -> Self {
        Self::Unknown
    }
}

/// A column of a table or view
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,

    /// Type as declared by the source engine (e.g. `VARCHAR`, `DECIMAL(18,3)`)
    pub type_name: String,

    /// Nullability
    pub nullable: Nullability,

    /// 1-based position within the parent relation
    pub ordinal_position: u32,
}

impl Column {
    /// Create a new column with unknown nullability
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, ordinal_position: u32) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: Nullability::Unknown,
            ordinal_position,
        }
    }

    /// Set nullability
    pub fn with_nullability(mut self, nullable: Nullability) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Common surface of tables and views, used by column extraction
pub trait Relation {
    /// Relation name
    fn name(&self) -> &str;

    /// Schema the relation lives in
    fn schema(&self) -> &str;

    /// Replace the relation's columns
    fn set_columns(&mut self, columns: Vec<Column>);

    /// Ordered columns
    fn columns(&self) -> &[Column];
}

/// A base table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name
    pub name: String,

    /// Schema name
    pub schema: String,

    /// Type tag reported by the engine (usually `BASE TABLE`)
    #[serde(rename = "type")]
    pub table_type: String,

    /// Ordered columns (empty until column extraction ran)
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Table {
    /// Default type tag for tables
    pub const BASE_TABLE: &'static str = "BASE TABLE";

    /// Create a table with no columns
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            table_type: Self::BASE_TABLE.to_string(),
            columns: Vec::new(),
        }
    }

    /// Override the type tag
    pub fn with_type(mut self, table_type: impl Into<String>) -> Self {
        self.table_type = table_type.into();
        self
    }

    /// Set columns
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl Relation for Table {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &str {
        &self.schema
    }

    fn set_columns(&mut self, columns: Vec<Column>) {
        self.columns = columns;
    }

    fn columns(&self) -> &[Column] {
        &self.columns
    }
}

/// A view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// View name
    pub name: String,

    /// Schema name
    pub schema: String,

    /// Type tag reported by the engine (usually `VIEW`)
    #[serde(rename = "type")]
    pub view_type: String,

    /// Ordered columns (empty until column extraction ran)
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl View {
    /// Default type tag for views
    pub const VIEW: &'static str = "VIEW";

    /// Create a view with no columns
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            view_type: Self::VIEW.to_string(),
            columns: Vec::new(),
        }
    }

    /// Set columns
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }
}

impl Relation for View {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &str {
        &self.schema
    }

    fn set_columns(&mut self, columns: Vec<Column>) {
        self.columns = columns;
    }

    fn columns(&self) -> &[Column] {
        &self.columns
    }
}

/// Root of an extraction result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    /// Logical name, e.g. `ducklake:sales`
    pub name: String,

    /// Dialect tag of the source the metadata came from
    pub database_type: Option<String>,

    /// Tables in discovery order
    #[serde(default)]
    pub tables: Vec<Table>,

    /// Views in discovery order
    #[serde(default)]
    pub views: Vec<View>,
}

impl Database {
    /// Create an empty database result
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database_type: None,
            tables: Vec::new(),
            views: Vec::new(),
        }
    }

    /// Set the database type tag
    pub fn with_database_type(mut self, database_type: impl Into<String>) -> Self {
        self.database_type = Some(database_type.into());
        self
    }

    /// Find a table by name
    pub fn find_table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Find a view by name
    pub fn find_view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| v.name == name)
    }

    /// Get table names in order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Get view names in order
    pub fn view_names(&self) -> Vec<&str> {
        self.views.iter().map(|v| v.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullability_from_flag() {
        assert_eq!(Nullability::from_flag("YES"), Nullability::Yes);
        assert_eq!(Nullability::from_flag("no"), Nullability::No);
        assert_eq!(Nullability::from_flag("true"), Nullability::Yes);
        assert_eq!(Nullability::from_flag("false"), Nullability::No);
        assert_eq!(Nullability::from_flag("maybe"), Nullability::Unknown);
    }

    #[test]
    fn table_operations() {
        let table = Table::new("main", "orders").with_columns(vec![
            Column::new("id", "BIGINT", 1).with_nullability(Nullability::No),
            Column::new("amount", "DECIMAL(18,3)", 2),
        ]);

        assert_eq!(table.table_type, "BASE TABLE");
        assert!(table.find_column("id").is_some());
        assert!(table.find_column("nonexistent").is_none());
        assert_eq!(table.columns()[1].ordinal_position, 2);
    }

    #[test]
    fn relation_set_columns() {
        let mut view = View::new("main", "recent_orders");
        assert!(view.columns().is_empty());

        view.set_columns(vec![Column::new("id", "BIGINT", 1)]);
        assert_eq!(Relation::name(&view), "recent_orders");
        assert_eq!(view.columns().len(), 1);
    }

    #[test]
    fn database_json_shape() {
        let mut db = Database::new("ducklake:sales").with_database_type("ducklake");
        db.tables.push(Table::new("main", "orders"));
        db.views.push(View::new("main", "v_orders"));

        let json = serde_json::to_value(&db).unwrap();
        assert_eq!(json["name"], "ducklake:sales");
        assert_eq!(json["tables"][0]["type"], "BASE TABLE");
        assert_eq!(json["views"][0]["type"], "VIEW");
        assert_eq!(db.table_names(), vec!["orders"]);
        assert_eq!(db.view_names(), vec!["v_orders"]);
    }
}
