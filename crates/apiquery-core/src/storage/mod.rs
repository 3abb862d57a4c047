//! Storage collaborators.
//!
//! A [`Storage`] executes a [`QueryPlan`] and returns flat rows. Two
//! backends are provided:
//! - [`SqliteStore`] renders plans to parameterized SQL and runs them on a
//!   SQLite connection,
//! - [`MemoryStore`] evaluates plans over in-memory tables.
//!
//! Both also implement [`Loader`] so fixtures can be loaded into either.

mod memory;
mod sql;
mod sqlite;

pub use memory::MemoryStore;
pub use sql::{render, SqlStatement};
pub use sqlite::SqliteStore;

use apiquery_proto::Value;
use thiserror::Error;

use crate::catalog::{EntityDescriptor, FieldDef};
use crate::query::QueryPlan;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The plan references a table that does not exist.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// The plan references a column that does not exist.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// A stored value cannot be represented.
    #[error("decode error: {0}")]
    Decode(String),
}

/// One result row: output column names with values, in select order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from column/value pairs.
    pub fn from_pairs<I, S, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
        V: Into<Value>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    /// Append a column.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push((name.into(), value));
    }

    /// Get a column value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// Iterate over columns.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Consume into column/value pairs.
    pub fn into_pairs(self) -> Vec<(String, Value)> {
        self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Executes query plans.
pub trait Storage: Send + Sync {
    /// Run a plan and return its rows in plan order.
    fn select(&self, plan: &QueryPlan) -> Result<Vec<Row>, StorageError>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn select(&self, plan: &QueryPlan) -> Result<Vec<Row>, StorageError> {
        (**self).select(plan)
    }
}

/// Table layout used when loading data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns.
    pub columns: Vec<FieldDef>,
    /// Primary key column.
    pub primary_key: String,
}

impl TableSchema {
    /// Table layout of an entity.
    pub fn for_entity(entity: &EntityDescriptor) -> Self {
        Self {
            name: entity.table.clone(),
            columns: entity.fields.clone(),
            primary_key: entity.primary_key.clone(),
        }
    }
}

/// Creates tables and inserts rows.
pub trait Loader {
    /// Create a table if it does not exist.
    fn create_table(&self, schema: &TableSchema) -> Result<(), StorageError>;

    /// Insert one row. Columns missing from the row are stored as NULL.
    fn insert(&self, table: &str, row: &Row) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_access() {
        let mut row =
            Row::from_pairs([("dhostid", Value::Int(1)), ("ip", Value::from("10.0.0.1"))]);
        row.push("port", Value::Int(22));

        assert_eq!(row.len(), 3);
        assert_eq!(row.get("ip"), Some(&Value::from("10.0.0.1")));
        assert_eq!(row.get("dns"), None);
        let names: Vec<_> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["dhostid", "ip", "port"]);
    }
}
