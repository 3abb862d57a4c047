//! Column references and join hops shared by id filters, relation paths
//! and query plans.

use std::fmt;

/// A column qualified by a table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Table alias.
    pub alias: String,
    /// Column name.
    pub column: String,
}

impl ColumnRef {
    /// Create a column reference.
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.column)
    }
}

/// A join condition between two columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinCondition {
    /// Plain equality; NULL never matches.
    Eq(ColumnRef, ColumnRef),
    /// Equality where NULL matches NULL.
    NullSafeEq(ColumnRef, ColumnRef),
}

/// One inner-join hop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Joined table.
    pub table: String,
    /// Alias of the joined table.
    pub alias: String,
    /// Conditions, AND-ed.
    pub on: Vec<JoinCondition>,
    /// At most one joined row matches each left row.
    pub unique: bool,
}

impl Join {
    /// A hop that matches at most one row per left row (joining on the
    /// joined table's primary key).
    pub fn to_one(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            on: Vec::new(),
            unique: true,
        }
    }

    /// A hop that can match many rows per left row.
    pub fn to_many(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            unique: false,
            ..Self::to_one(table, alias)
        }
    }

    /// Add an equality condition.
    pub fn on_eq(mut self, left: ColumnRef, right: ColumnRef) -> Self {
        self.on.push(JoinCondition::Eq(left, right));
        self
    }

    /// Add a NULL-safe equality condition.
    pub fn on_null_safe_eq(mut self, left: ColumnRef, right: ColumnRef) -> Self {
        self.on.push(JoinCondition::NullSafeEq(left, right));
        self
    }
}
