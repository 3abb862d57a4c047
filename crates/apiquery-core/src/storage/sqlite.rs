//! SQLite backend.

use std::path::Path;

use apiquery_proto::Value;
use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use tracing::debug;

use super::sql::render;
use super::{Loader, Row, Storage, StorageError, TableSchema};
use crate::query::QueryPlan;

/// Storage backed by a SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database file, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::configure(Connection::open(path)?)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> Result<Self, StorageError> {
        // Case-insensitive search compares UPPER() of both sides, so plain
        // LIKE has to be case-sensitive.
        conn.execute_batch("PRAGMA case_sensitive_like = ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Whether a table exists and holds at least one row.
    pub fn has_rows(&self, table: &str) -> Result<bool, StorageError> {
        let conn = self.conn.lock();
        let exists: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(false);
        }
        let sql = format!("SELECT EXISTS (SELECT 1 FROM \"{}\")", table.replace('"', "\"\""));
        Ok(conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Run raw SQL statements, e.g. to load a schema dump.
    pub fn execute_batch(&self, sql: &str) -> Result<(), StorageError> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }
}

impl Storage for SqliteStore {
    fn select(&self, plan: &QueryPlan) -> Result<Vec<Row>, StorageError> {
        let statement = render(plan);
        debug!(sql = %statement.sql, params = statement.params.len(), "executing plan");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&statement.sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params_from_iter(statement.params.iter().map(to_sql)))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut out = Row::new();
            for (i, name) in names.iter().enumerate() {
                out.push(name.clone(), from_sql(row.get_ref(i)?)?);
            }
            result.push(out);
        }
        Ok(result)
    }
}

impl Loader for SqliteStore {
    fn create_table(&self, schema: &TableSchema) -> Result<(), StorageError> {
        let columns: Vec<String> = schema
            .columns
            .iter()
            .map(|field| {
                let mut column = format!("\"{}\" {}", field.name, field.column_type.sql_type());
                if field.name == schema.primary_key {
                    column.push_str(" PRIMARY KEY");
                }
                column
            })
            .collect();
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            schema.name,
            columns.join(", ")
        );
        self.conn.lock().execute(&ddl, [])?;
        Ok(())
    }

    fn insert(&self, table: &str, row: &Row) -> Result<(), StorageError> {
        let names: Vec<String> = row.iter().map(|(name, _)| format!("\"{name}\"")).collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "INSERT INTO \"{table}\" ({}) VALUES ({placeholders})",
            names.join(", ")
        );
        self.conn
            .lock()
            .execute(&sql, params_from_iter(row.iter().map(|(_, value)| to_sql(value))))?;
        Ok(())
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Result<Value, StorageError> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::Int(i)),
        ValueRef::Real(f) => Ok(Value::Float(f)),
        ValueRef::Text(bytes) => Ok(Value::String(String::from_utf8_lossy(bytes).into_owned())),
        ValueRef::Blob(_) => Err(StorageError::Decode("blob columns are not supported".into())),
    }
}
