//! Output formatters for `get` results.

use apiquery_proto::{Entity, FieldValue, GetResult, Value, ROWS_COUNT};
use clap::ValueEnum;
use comfy_table::{Cell, Table};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON, shaped like the API response
    Json,
    /// ASCII table format
    Table,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format a `get` result.
    fn format_result(&self, result: &GetResult) -> String;

    /// Format an error message.
    fn format_error(&self, error: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Table => Box::new(TableFormatter),
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_result(&self, result: &GetResult) -> String {
        result
            .to_json()
            .and_then(|json| serde_json::to_string_pretty(&json))
            .unwrap_or_else(|e| self.format_error(&e.to_string()))
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({ "error": error }).to_string()
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_result(&self, result: &GetResult) -> String {
        match result {
            GetResult::Count(count) => {
                let mut table = Table::new();
                table.set_header(vec![ROWS_COUNT]);
                table.add_row(vec![count.to_string()]);
                table.to_string()
            }
            GetResult::GroupCounts(groups) => {
                let Some(first) = groups.first() else {
                    return "No results".to_string();
                };
                let mut headers: Vec<&str> = first.group.keys().map(String::as_str).collect();
                headers.push(ROWS_COUNT);

                let mut table = Table::new();
                table.set_header(headers);
                for group in groups {
                    let mut cells: Vec<Cell> =
                        group.group.values().map(|v| Cell::new(format_value(v))).collect();
                    cells.push(Cell::new(group.count));
                    table.add_row(cells);
                }
                format!("{}\n{} group(s)", table, groups.len())
            }
            GetResult::Map(map) => {
                format_entities(&map.iter().map(|(_, entity)| entity).collect::<Vec<_>>())
            }
            GetResult::List(list) => format_entities(&list.iter().collect::<Vec<_>>()),
        }
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}", error)
    }
}

/// Format entities as a table; columns are the union of field names in
/// first-seen order.
fn format_entities(entities: &[&Entity]) -> String {
    let mut columns: Vec<&str> = Vec::new();
    for entity in entities {
        for name in entity.field_names() {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
    }
    if columns.is_empty() {
        return "No results".to_string();
    }

    let mut table = Table::new();
    table.set_header(columns.clone());
    for entity in entities {
        let cells: Vec<Cell> = columns
            .iter()
            .map(|name| Cell::new(entity.get(name).map(format_field).unwrap_or_default()))
            .collect();
        table.add_row(cells);
    }
    format!("{}\n{} row(s)", table, entities.len())
}

fn format_field(field: &FieldValue) -> String {
    match field {
        FieldValue::Value(value) => format_value(value),
        FieldValue::Count(count) => count.to_string(),
        FieldValue::List(items) => format!("[{} object(s)]", items.len()),
    }
}

/// Format a Value as a display string.
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}
