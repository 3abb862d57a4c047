//! Parent-to-child key maps.

use std::collections::{HashMap, HashSet};

use apiquery_proto::{Entity, EntityMap, FieldValue, Key, Value};

/// Maps parent keys to related keys for one relation of one call.
///
/// Pairs are deduplicated, so many-to-many paths that reach the same child
/// twice still attach it once.
#[derive(Debug, Default)]
pub struct RelationMap {
    children: HashMap<Key, Vec<Key>>,
    pairs: HashSet<(Key, Key)>,
    related: Vec<Key>,
    seen: HashSet<Key>,
}

impl RelationMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `parent` is related to `child`.
    pub fn add(&mut self, parent: Key, child: Key) {
        if !self.pairs.insert((parent.clone(), child.clone())) {
            return;
        }
        if self.seen.insert(child.clone()) {
            self.related.push(child.clone());
        }
        self.children.entry(parent).or_default().push(child);
    }

    /// Distinct related keys in first-seen order.
    pub fn related_keys(&self) -> &[Key] {
        &self.related
    }

    /// Distinct related keys as values, for an id constraint.
    pub fn related_values(&self) -> Vec<Value> {
        self.related.iter().map(Key::to_value).collect()
    }

    /// Check if no pair was recorded.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Attach related entities to every parent under `name`.
    ///
    /// Each parent's collection follows the order of `related`, which is the
    /// sorted order of the secondary query, and is cut to the first `limit`
    /// entries. Related keys missing from `related` (filtered out by
    /// permissions or options) are skipped. Parents without relations get an
    /// empty list.
    pub fn attach_many(
        &self,
        parents: &mut EntityMap,
        related: &EntityMap,
        name: &str,
        limit: Option<usize>,
    ) {
        let position: HashMap<&Key, usize> =
            related.keys().enumerate().map(|(i, key)| (key, i)).collect();

        parents.for_each_mut(|parent_key, parent| {
            let mut keys: Vec<(usize, &Key)> = self
                .children
                .get(parent_key)
                .into_iter()
                .flatten()
                .filter_map(|key| position.get(key).map(|pos| (*pos, key)))
                .collect();
            keys.sort_by_key(|(pos, _)| *pos);
            if let Some(limit) = limit {
                keys.truncate(limit);
            }

            let list: Vec<Entity> = keys
                .into_iter()
                .filter_map(|(_, key)| related.get(key).cloned())
                .collect();
            parent.insert(name, FieldValue::List(list));
        });
    }

    /// Attach the number of related entities to every parent under `name`.
    pub fn attach_counts(&self, parents: &mut EntityMap, related: &EntityMap, name: &str) {
        parents.for_each_mut(|parent_key, parent| {
            let count = self
                .children
                .get(parent_key)
                .into_iter()
                .flatten()
                .filter(|key| related.contains_key(key))
                .count();
            parent.insert(name, FieldValue::Count(count as u64));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entities(ids: &[i64]) -> EntityMap {
        ids.iter()
            .map(|id| (Key::Int(*id), Entity::from_values([("id", Value::Int(*id))])))
            .collect()
    }

    fn list_ids(parents: &EntityMap, parent: i64, name: &str) -> Vec<i64> {
        parents
            .get(&Key::Int(parent))
            .and_then(|p| p.get(name))
            .and_then(FieldValue::as_list)
            .unwrap()
            .iter()
            .map(|e| e.value("id").and_then(Value::as_i64).unwrap())
            .collect()
    }

    #[test]
    fn test_dedup_and_related_order() {
        let mut map = RelationMap::new();
        map.add(Key::Int(1), Key::Int(20));
        map.add(Key::Int(1), Key::Int(20));
        map.add(Key::Int(2), Key::Int(10));
        map.add(Key::Int(2), Key::Int(20));

        assert_eq!(map.related_keys(), &[Key::Int(20), Key::Int(10)]);
        assert_eq!(map.related_values(), vec![Value::Int(20), Value::Int(10)]);
    }

    #[test]
    fn test_attach_many_follows_related_order_and_limit() {
        let mut map = RelationMap::new();
        for child in [30, 10, 20] {
            map.add(Key::Int(1), Key::Int(child));
        }
        let mut parents = entities(&[1, 2]);
        let related = entities(&[10, 20, 30]);

        map.attach_many(&mut parents, &related, "hosts", Some(2));
        assert_eq!(list_ids(&parents, 1, "hosts"), vec![10, 20]);
        assert_eq!(list_ids(&parents, 2, "hosts"), Vec::<i64>::new());
    }

    #[test]
    fn test_attach_counts_skips_filtered_children() {
        let mut map = RelationMap::new();
        map.add(Key::Int(1), Key::Int(10));
        map.add(Key::Int(1), Key::Int(11));
        map.add(Key::Int(3), Key::Int(12));
        let mut parents = entities(&[1, 2, 3]);
        let related = entities(&[10, 12]);

        map.attach_counts(&mut parents, &related, "hosts");
        let count = |id| {
            parents
                .get(&Key::Int(id))
                .and_then(|p| p.get("hosts"))
                .and_then(FieldValue::as_count)
        };
        assert_eq!(count(1), Some(1));
        assert_eq!(count(2), Some(0));
        assert_eq!(count(3), Some(1));
    }
}
