//! Descriptor registry.

use std::collections::HashMap;

use super::entity::EntityDescriptor;
use super::relation::RelationPath;
use crate::error::{Error, Result};

/// Registry of entity descriptors.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entities: HashMap<String, EntityDescriptor>,
    names: Vec<String>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, replacing any descriptor with the same name.
    ///
    /// Column references that can be checked against the descriptor alone
    /// are validated here; cross-entity references are checked by
    /// [`Catalog::validate`].
    pub fn register(&mut self, entity: EntityDescriptor) -> Result<()> {
        let invalid = |what: &str, name: &str| {
            Error::invalid_option(
                name,
                format!("{what} is not a field of entity '{}'", entity.name),
            )
        };

        if !entity.has_field(&entity.primary_key) {
            return Err(invalid("primary key", &entity.primary_key));
        }
        for field in &entity.sortable {
            if !entity.has_field(field) {
                return Err(invalid("sort field", field));
            }
        }
        if let Some(field) = &entity.natural_sort {
            if !entity.has_field(field) {
                return Err(invalid("natural sort field", field));
            }
        }
        for filter in &entity.id_filters {
            if filter.via.is_empty() && !entity.has_field(&filter.column.column) {
                return Err(invalid("id filter column", &filter.column.column));
            }
            if filter.groupable && !filter.is_to_one() {
                return Err(Error::invalid_option(
                    &filter.option,
                    "grouping requires a chain of to-one joins",
                ));
            }
        }
        for relation in &entity.relations {
            if let Some(column) = relation.parent_key_column() {
                if !entity.has_field(column) {
                    return Err(invalid("relation column", column));
                }
            }
        }

        if !self.entities.contains_key(&entity.name) {
            self.names.push(entity.name.clone());
        }
        self.entities.insert(entity.name.clone(), entity);
        Ok(())
    }

    /// Check that every relation targets a registered entity and that
    /// child-column relations name a column of the target.
    pub fn validate(&self) -> Result<()> {
        for entity in self.entities.values() {
            for relation in &entity.relations {
                let target = self.get(&relation.target)?;
                if let RelationPath::ChildColumn(column) = &relation.path {
                    if !target.has_field(column) {
                        return Err(Error::invalid_option(
                            &relation.option,
                            format!("'{column}' is not a field of entity '{}'", target.name),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Get a descriptor by name.
    pub fn get(&self, name: &str) -> Result<&EntityDescriptor> {
        self.entities
            .get(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    /// Entity names in registration order.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
