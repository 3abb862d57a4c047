//! Column definitions.

use apiquery_proto::Value;

/// Storage type of a column. Option values are coerced to it before they
/// reach a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit integer (ids, statuses, timestamps).
    Int,
    /// Floating point.
    Float,
    /// Text.
    String,
}

impl ColumnType {
    /// Coerce a caller-supplied value to this column type.
    pub fn coerce(self, value: &Value) -> Result<Value, apiquery_proto::Error> {
        match self {
            ColumnType::Int => value.coerce_int(),
            ColumnType::Float => value.coerce_float(),
            ColumnType::String => value.coerce_string(),
        }
    }

    /// SQL type name used in DDL.
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Int => "INTEGER",
            ColumnType::Float => "REAL",
            ColumnType::String => "TEXT",
        }
    }
}

/// A column of an entity table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Column name, also the output field name.
    pub name: String,
    /// Column type.
    pub column_type: ColumnType,
}

impl FieldDef {
    /// Create a field definition.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    /// Integer column.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Int)
    }

    /// Floating point column.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Float)
    }

    /// Text column.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::String)
    }
}
