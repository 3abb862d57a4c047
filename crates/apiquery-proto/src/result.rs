//! Result types returned by `get`.

use std::collections::{BTreeMap, HashMap};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::value::{Key, Value};

/// A value stored under one field of a result entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A column value.
    Value(Value),
    /// The number of related entities (count-mode relation output).
    Count(u64),
    /// Related entities.
    List(Vec<Entity>),
}

impl FieldValue {
    /// Try to get as a column value.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as a relation count.
    pub fn as_count(&self) -> Option<u64> {
        match self {
            FieldValue::Count(c) => Some(*c),
            _ => None,
        }
    }

    /// Try to get as a related entity list.
    pub fn as_list(&self) -> Option<&[Entity]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        FieldValue::Value(v)
    }
}

/// One result entity: field name to value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Entity {
    fields: BTreeMap<String, FieldValue>,
}

impl Entity {
    /// Create an empty entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an entity from column values.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Self {
            fields: values
                .into_iter()
                .map(|(name, value)| (name.into(), FieldValue::Value(value)))
                .collect(),
        }
    }

    /// Get a field.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Get a column value.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).and_then(FieldValue::as_value)
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Remove a field.
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.fields.remove(field)
    }

    /// Check if a field is present.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Keep only the fields for which the predicate holds.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.fields.retain(|name, _| keep(name));
    }

    /// Iterate over field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterate over fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the entity has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Entities keyed by primary key, iterated in insertion order.
///
/// Insertion order is the storage order of the primary query, so converting
/// the map to a list keeps the ORDER BY that was applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityMap {
    order: Vec<Key>,
    entries: HashMap<Key, Entity>,
}

impl EntityMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity. A duplicate key replaces the earlier entity in place
    /// (last write wins) without changing its position.
    pub fn insert(&mut self, key: Key, entity: Entity) {
        if self.entries.insert(key.clone(), entity).is_none() {
            self.order.push(key);
        }
    }

    /// Get an entity by key.
    pub fn get(&self, key: &Key) -> Option<&Entity> {
        self.entries.get(key)
    }

    /// Get a mutable entity by key.
    pub fn get_mut(&mut self, key: &Key) -> Option<&mut Entity> {
        self.entries.get_mut(key)
    }

    /// Check if a key is present.
    pub fn contains_key(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.order.iter()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Entity)> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key).map(|entity| (key, entity)))
    }

    /// Apply a function to every entity.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&Key, &mut Entity)) {
        for key in &self.order {
            if let Some(entity) = self.entries.get_mut(key) {
                f(key, entity);
            }
        }
    }

    /// Consume the map, yielding entities in insertion order.
    pub fn into_values(mut self) -> Vec<Entity> {
        self.order
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .collect()
    }
}

impl FromIterator<(Key, Entity)> for EntityMap {
    fn from_iter<T: IntoIterator<Item = (Key, Entity)>>(iter: T) -> Self {
        let mut map = EntityMap::new();
        for (key, entity) in iter {
            map.insert(key, entity);
        }
        map
    }
}

impl Serialize for EntityMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, entity) in self.iter() {
            map.serialize_entry(&key.to_string(), entity)?;
        }
        map.end()
    }
}

/// One row of a grouped count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCount {
    /// Group column values.
    #[serde(flatten)]
    pub group: BTreeMap<String, Value>,
    /// Number of rows in the group.
    #[serde(rename = "rowscount")]
    pub count: u64,
}

/// The result of a `get` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GetResult {
    /// Number of matching rows.
    Count(u64),
    /// Per-group row counts.
    GroupCounts(Vec<GroupCount>),
    /// Entities keyed by primary key.
    Map(EntityMap),
    /// Entities as a dense ordered list.
    List(Vec<Entity>),
}

impl GetResult {
    /// Try to get as a count.
    pub fn as_count(&self) -> Option<u64> {
        match self {
            GetResult::Count(c) => Some(*c),
            _ => None,
        }
    }

    /// Try to get as grouped counts.
    pub fn as_group_counts(&self) -> Option<&[GroupCount]> {
        match self {
            GetResult::GroupCounts(groups) => Some(groups),
            _ => None,
        }
    }

    /// Try to get as a keyed map.
    pub fn as_map(&self) -> Option<&EntityMap> {
        match self {
            GetResult::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Try to get as a list.
    pub fn as_list(&self) -> Option<&[Entity]> {
        match self {
            GetResult::List(list) => Some(list),
            _ => None,
        }
    }

    /// Check whether the result carries no entities, groups or rows.
    pub fn is_empty(&self) -> bool {
        match self {
            GetResult::Count(c) => *c == 0,
            GetResult::GroupCounts(groups) => groups.is_empty(),
            GetResult::Map(map) => map.is_empty(),
            GetResult::List(list) => list.is_empty(),
        }
    }

    /// Serialize to a JSON value.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
