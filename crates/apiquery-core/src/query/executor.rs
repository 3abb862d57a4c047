//! Result materialization.
//!
//! Turns storage rows into one of the three output shapes: a count, grouped
//! counts, or entities keyed by primary key.

use apiquery_proto::{Entity, EntityMap, GroupCount, Value, ROWS_COUNT};

use super::normalizer::{NormalizedQuery, ResultMode};
use crate::error::Result;
use crate::storage::{Row, StorageError};

/// Materialized rows of one query.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// Row count.
    Count(u64),
    /// Row counts per group.
    Groups(Vec<GroupCount>),
    /// Entities keyed by primary key, in query order.
    Rows(EntityMap),
}

impl Fetched {
    /// The empty result of a mode.
    pub fn empty(mode: &ResultMode<'_>) -> Self {
        match mode {
            ResultMode::Count => Fetched::Count(0),
            ResultMode::GroupCount(_) => Fetched::Groups(Vec::new()),
            ResultMode::Rows => Fetched::Rows(EntityMap::new()),
        }
    }

    /// Take the entity map; counts yield an empty map.
    pub fn into_rows(self) -> EntityMap {
        match self {
            Fetched::Rows(map) => map,
            _ => EntityMap::new(),
        }
    }
}

/// Materialize storage rows according to the query's mode.
///
/// In row mode a repeated primary key replaces the earlier entity (last
/// write wins), which keeps keys unique even if a plan multiplied rows.
pub fn materialize(query: &NormalizedQuery<'_>, rows: Vec<Row>) -> Result<Fetched> {
    match &query.mode {
        ResultMode::Count => Ok(Fetched::Count(
            rows.first().map_or(Ok(0), row_count)?,
        )),
        ResultMode::GroupCount(columns) => rows
            .iter()
            .map(|row| {
                Ok(GroupCount {
                    group: columns
                        .iter()
                        .map(|c| (c.name.clone(), row.get(&c.name).cloned().unwrap_or(Value::Null)))
                        .collect(),
                    count: row_count(row)?,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Fetched::Groups),
        ResultMode::Rows => {
            let pk = &query.entity.primary_key;
            let mut map = EntityMap::new();
            for row in rows {
                let key = row.get(pk).and_then(Value::as_key).ok_or_else(|| {
                    StorageError::Decode(format!(
                        "row of entity '{}' has no usable primary key",
                        query.entity.name
                    ))
                })?;
                map.insert(key, Entity::from_values(row.into_pairs()));
            }
            Ok(Fetched::Rows(map))
        }
    }
}

fn row_count(row: &Row) -> Result<u64> {
    match row.get(ROWS_COUNT) {
        Some(Value::Int(count)) if *count >= 0 => Ok(*count as u64),
        other => Err(StorageError::Decode(format!("bad {ROWS_COUNT} value: {other:?}")).into()),
    }
}
