//! In-memory backend.
//!
//! Evaluates plans with nested-loop joins over row vectors. Semantics follow
//! the SQLite backend: three-valued predicate logic, NULLs first in
//! ascending order, COUNT(DISTINCT) ignoring NULLs and a single count row
//! for an ungrouped aggregate over no rows.

use std::cmp::Ordering;
use std::collections::HashMap;

use apiquery_proto::{SortOrder, Value};
use parking_lot::RwLock;

use super::{Loader, Row, Storage, StorageError, TableSchema};
use crate::catalog::{ColumnRef, Join, JoinCondition};
use crate::query::{like_match, Predicate, QueryPlan, SelectExpr};

#[derive(Debug, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

/// Storage over in-memory tables.
///
/// Tables have no key constraints, so duplicate primary keys can be stored.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in a table.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, |t| t.rows.len())
    }
}

impl Storage for MemoryStore {
    fn select(&self, plan: &QueryPlan) -> Result<Vec<Row>, StorageError> {
        let tables = self.tables.read();
        Evaluator { tables: &tables }.run(plan)
    }
}

impl Loader for MemoryStore {
    fn create_table(&self, schema: &TableSchema) -> Result<(), StorageError> {
        self.tables
            .write()
            .entry(schema.name.clone())
            .or_insert_with(|| Table {
                columns: schema.columns.iter().map(|f| f.name.clone()).collect(),
                rows: Vec::new(),
            });
        Ok(())
    }

    fn insert(&self, table: &str, row: &Row) -> Result<(), StorageError> {
        let mut tables = self.tables.write();
        let target = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::UnknownTable(table.to_string()))?;

        let mut values = vec![Value::Null; target.columns.len()];
        for (name, value) in row.iter() {
            let index = target
                .column_index(name)
                .ok_or_else(|| StorageError::UnknownColumn(format!("{table}.{name}")))?;
            values[index] = value.clone();
        }
        target.rows.push(values);
        Ok(())
    }
}

/// One bound table row: alias, table and row values.
type Binding<'a> = (&'a str, &'a Table, &'a [Value]);

/// Bindings of every table in scope for one candidate row.
type Frame<'a> = Vec<Binding<'a>>;

struct Evaluator<'a> {
    tables: &'a HashMap<String, Table>,
}

impl<'a> Evaluator<'a> {
    fn table(&self, name: &str) -> Result<&'a Table, StorageError> {
        self.tables
            .get(name)
            .ok_or_else(|| StorageError::UnknownTable(name.to_string()))
    }

    fn run(&self, plan: &'a QueryPlan) -> Result<Vec<Row>, StorageError> {
        let base = self.table(&plan.table)?;
        let frames: Vec<Frame<'a>> = base
            .rows
            .iter()
            .map(|row| vec![(plan.alias.as_str(), base, row.as_slice())])
            .collect();
        let frames = self.expand(frames, &plan.joins)?;

        let mut matched = Vec::new();
        for frame in frames {
            if self.all_true(&frame, &plan.predicates)? {
                matched.push(frame);
            }
        }

        // Without aggregation every matched frame is its own group.
        let groups = if plan.is_aggregate() {
            self.group(matched, &plan.group_by)?
        } else {
            matched.into_iter().map(|frame| vec![frame]).collect()
        };

        // (sort key, output row)
        let mut output: Vec<(Vec<Value>, Row)> = Vec::with_capacity(groups.len());
        for group in &groups {
            let first = group.first();
            let mut sort_key = Vec::with_capacity(plan.order_by.len());
            for term in &plan.order_by {
                sort_key.push(match first {
                    Some(frame) => lookup(frame, &term.column)?.clone(),
                    None => Value::Null,
                });
            }
            let mut row = Row::new();
            for item in &plan.select {
                let value = match &item.expr {
                    SelectExpr::Column(column) => match first {
                        Some(frame) => lookup(frame, column)?.clone(),
                        None => Value::Null,
                    },
                    SelectExpr::CountDistinct(column) => {
                        Value::Int(count_distinct(group, column)? as i64)
                    }
                };
                row.push(item.name.clone(), value);
            }
            output.push((sort_key, row));
        }

        output.sort_by(|(a, _), (b, _)| {
            for ((x, y), term) in a.iter().zip(b.iter()).zip(&plan.order_by) {
                let ordering = match term.order {
                    SortOrder::Asc => x.compare(y),
                    SortOrder::Desc => y.compare(x),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        let mut rows: Vec<Row> = Vec::with_capacity(output.len());
        for (_, row) in output {
            if plan.distinct && rows.iter().any(|seen| same_row(seen, &row)) {
                continue;
            }
            rows.push(row);
        }

        if let Some(limit) = plan.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(rows)
    }

    fn expand(
        &self,
        mut frames: Vec<Frame<'a>>,
        joins: &'a [Join],
    ) -> Result<Vec<Frame<'a>>, StorageError> {
        for join in joins {
            let table = self.table(&join.table)?;
            let mut next = Vec::new();
            for frame in &frames {
                for row in &table.rows {
                    let mut candidate = frame.clone();
                    candidate.push((join.alias.as_str(), table, row.as_slice()));
                    if join_matches(&candidate, join)? {
                        next.push(candidate);
                    }
                }
            }
            frames = next;
        }
        Ok(frames)
    }

    fn group(
        &self,
        frames: Vec<Frame<'a>>,
        group_by: &[ColumnRef],
    ) -> Result<Vec<Vec<Frame<'a>>>, StorageError> {
        let mut groups: Vec<(Vec<Value>, Vec<Frame<'a>>)> = Vec::new();
        for frame in frames {
            let mut key = Vec::with_capacity(group_by.len());
            for column in group_by {
                key.push(lookup(&frame, column)?.clone());
            }
            match groups.iter_mut().find(|(existing, _)| same_values(existing, &key)) {
                Some((_, members)) => members.push(frame),
                None => groups.push((key, vec![frame])),
            }
        }
        if group_by.is_empty() && groups.is_empty() {
            groups.push((Vec::new(), Vec::new()));
        }
        Ok(groups.into_iter().map(|(_, members)| members).collect())
    }

    fn all_true(
        &self,
        frame: &Frame<'a>,
        predicates: &'a [Predicate],
    ) -> Result<bool, StorageError> {
        for predicate in predicates {
            if self.eval(frame, predicate)? != Some(true) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // None is SQL's UNKNOWN.
    fn eval(
        &self,
        frame: &Frame<'a>,
        predicate: &'a Predicate,
    ) -> Result<Option<bool>, StorageError> {
        Ok(match predicate {
            Predicate::In { column, values } => {
                let value = lookup(frame, column)?;
                if value.is_null() {
                    None
                } else if values.iter().any(|v| value.loose_eq(v)) {
                    Some(true)
                } else if values.iter().any(Value::is_null) {
                    None
                } else {
                    Some(false)
                }
            }
            Predicate::Like {
                column,
                pattern,
                case_insensitive,
            } => {
                let value = lookup(frame, column)?;
                if value.is_null() {
                    None
                } else {
                    let text = value.to_string();
                    let text = if *case_insensitive {
                        text.to_ascii_uppercase()
                    } else {
                        text
                    };
                    Some(like_match(&text, pattern))
                }
            }
            Predicate::Not(inner) => self.eval(frame, inner)?.map(|b| !b),
            Predicate::And(items) => {
                let mut result = Some(true);
                for item in items {
                    match self.eval(frame, item)? {
                        Some(false) => return Ok(Some(false)),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                result
            }
            Predicate::Or(items) => {
                let mut result = Some(false);
                for item in items {
                    match self.eval(frame, item)? {
                        Some(true) => return Ok(Some(true)),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                result
            }
            Predicate::Exists { joins, predicates } => {
                let candidates = self.expand(vec![frame.clone()], joins)?;
                let mut found = false;
                for candidate in &candidates {
                    if self.all_true(candidate, predicates)? {
                        found = true;
                        break;
                    }
                }
                Some(found)
            }
            Predicate::False => Some(false),
        })
    }
}

// Inner aliases shadow outer ones, so search from the end.
fn lookup<'f>(frame: &'f [Binding<'_>], column: &ColumnRef) -> Result<&'f Value, StorageError> {
    let unknown = || StorageError::UnknownColumn(column.to_string());
    let (_, table, row) = frame
        .iter()
        .rev()
        .find(|(alias, _, _)| *alias == column.alias)
        .ok_or_else(unknown)?;
    let index = table.column_index(&column.column).ok_or_else(unknown)?;
    row.get(index).ok_or_else(unknown)
}

fn join_matches(frame: &[Binding<'_>], join: &Join) -> Result<bool, StorageError> {
    for condition in &join.on {
        let matched = match condition {
            JoinCondition::Eq(left, right) => lookup(frame, left)?.loose_eq(lookup(frame, right)?),
            JoinCondition::NullSafeEq(left, right) => {
                let (left, right) = (lookup(frame, left)?, lookup(frame, right)?);
                (left.is_null() && right.is_null()) || left.loose_eq(right)
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn count_distinct(frames: &[Frame<'_>], column: &ColumnRef) -> Result<usize, StorageError> {
    let mut seen: Vec<&Value> = Vec::new();
    for frame in frames {
        let value = lookup(frame, column)?;
        if !value.is_null() && !seen.iter().any(|v| v.compare(value) == Ordering::Equal) {
            seen.push(value);
        }
    }
    Ok(seen.len())
}

fn same_values(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.compare(y) == Ordering::Equal)
}

fn same_row(a: &Row, b: &Row) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b.iter())
            .all(|((_, x), (_, y))| x.compare(y) == Ordering::Equal)
}
