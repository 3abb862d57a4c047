//! Relation resolution.
//!
//! For each requested relation the resolver:
//! 1. maps parent keys to related keys (from a parent column, a link query,
//!    or the related rows themselves),
//! 2. fetches all related entities in one secondary query through the full
//!    pipeline, which may resolve further nested relations,
//! 3. attaches the related entities, or their count, to every parent.

use apiquery_proto::{EntityMap, Key, Value};
use tracing::debug;

use super::normalizer::{NormalizedQuery, RelationRequest};
use super::planner::{QueryPlanner, LINK_CHILD, LINK_PARENT};
use super::relation_map::RelationMap;
use crate::catalog::{EntityDescriptor, RelationPath};
use crate::engine::Engine;
use crate::error::Result;
use crate::storage::Storage;

/// Resolves the relations of one query.
pub struct RelationResolver<'e, S> {
    engine: &'e Engine<S>,
}

impl<'e, S: Storage> RelationResolver<'e, S> {
    /// Create a resolver that fetches through `engine`.
    pub fn new(engine: &'e Engine<S>) -> Self {
        Self { engine }
    }

    /// Attach every requested relation to `parents`, in declaration order.
    pub fn resolve(&self, parents: &mut EntityMap, query: &NormalizedQuery<'_>) -> Result<()> {
        for request in &query.relations {
            self.resolve_one(parents, query.entity, request, query.limit_per_relation)?;
        }
        Ok(())
    }

    fn resolve_one(
        &self,
        parents: &mut EntityMap,
        parent_entity: &EntityDescriptor,
        request: &RelationRequest<'_>,
        limit: Option<usize>,
    ) -> Result<()> {
        let relation = request.relation;
        let mut child_query = request.query.clone();
        let target = child_query.entity;
        let mut map = RelationMap::new();

        let children = match &relation.path {
            RelationPath::ParentColumn(column) => {
                for (key, parent) in parents.iter() {
                    if let Some(child) = parent.value(column).and_then(Value::as_key) {
                        map.add(key.clone(), child);
                    }
                }
                self.fetch_related(&mut child_query, &map, target)?
            }
            RelationPath::Joined { joins, target: column } => {
                let plan =
                    QueryPlanner::link_plan(parent_entity, joins, column, key_values(parents));
                for row in self.engine.storage().select(&plan)? {
                    let parent = row.get(LINK_PARENT).and_then(Value::as_key);
                    let child = row.get(LINK_CHILD).and_then(Value::as_key);
                    if let (Some(parent), Some(child)) = (parent, child) {
                        map.add(parent, child);
                    }
                }
                self.fetch_related(&mut child_query, &map, target)?
            }
            RelationPath::ChildColumn(column) => {
                child_query
                    .constraints
                    .push((column.clone(), key_values(parents)));
                child_query.retain.insert(column.clone());
                let mut children = self.engine.fetch(&child_query)?.into_rows();

                let mut pairs: Vec<(Key, Key)> = Vec::with_capacity(children.len());
                for (child_key, child) in children.iter() {
                    if let Some(parent) = child.value(column).and_then(Value::as_key) {
                        pairs.push((parent, child_key.clone()));
                    }
                }
                for (parent, child) in pairs {
                    map.add(parent, child);
                }
                if !request.query.keeps_field(column) {
                    children.for_each_mut(|_, child| {
                        child.remove(column);
                    });
                }
                children
            }
        };

        debug!(
            relation = %relation.name,
            target = %target.name,
            parents = parents.len(),
            related = children.len(),
            "resolved relation"
        );

        if request.count {
            map.attach_counts(parents, &children, &relation.name);
        } else {
            map.attach_many(parents, &children, &relation.name, limit);
        }
        Ok(())
    }

    /// Fetch the related entities whose keys are in `map`.
    fn fetch_related(
        &self,
        child_query: &mut NormalizedQuery<'_>,
        map: &RelationMap,
        target: &EntityDescriptor,
    ) -> Result<EntityMap> {
        if map.is_empty() {
            return Ok(EntityMap::new());
        }
        child_query
            .constraints
            .push((target.primary_key.clone(), map.related_values()));
        Ok(self.engine.fetch(child_query)?.into_rows())
    }
}

fn key_values(map: &EntityMap) -> Vec<Value> {
    map.keys().map(Key::to_value).collect()
}
