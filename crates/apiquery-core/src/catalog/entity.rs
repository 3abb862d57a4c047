//! Entity descriptors.

use super::field::{ColumnType, FieldDef};
use super::path::{ColumnRef, Join};
use super::relation::RelationSpec;
use crate::security::UserRole;

/// An id filter option (`dhostids`, `druleids`, ...).
///
/// The filtered column lives either on the entity's own table or on the
/// last table of a join chain starting at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdFilterDef {
    /// Option key accepted from callers.
    pub option: String,
    /// Join chain from the entity's table; empty for a local column.
    pub via: Vec<Join>,
    /// Filtered column, qualified by the entity alias or the last hop alias.
    pub column: ColumnRef,
    /// Type the filter values are coerced to.
    pub column_type: ColumnType,
    /// Whether `groupCount` may group by this column.
    pub groupable: bool,
}

impl IdFilterDef {
    /// A filter on a column of the entity's own table.
    pub fn local(option: impl Into<String>, column: ColumnRef) -> Self {
        Self {
            option: option.into(),
            via: Vec::new(),
            column,
            column_type: ColumnType::Int,
            groupable: false,
        }
    }

    /// A filter on a column reached through joins.
    pub fn via(
        option: impl Into<String>,
        joins: impl IntoIterator<Item = Join>,
        column: ColumnRef,
    ) -> Self {
        Self {
            option: option.into(),
            via: joins.into_iter().collect(),
            column,
            column_type: ColumnType::Int,
            groupable: false,
        }
    }

    /// Set the value type (integer by default).
    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = column_type;
        self
    }

    /// Allow grouped counts by this column.
    pub fn groupable(mut self) -> Self {
        self.groupable = true;
        self
    }

    /// True when every hop matches at most one row, so the joins can be added
    /// to the primary query without multiplying rows.
    pub fn is_to_one(&self) -> bool {
        self.via.iter().all(|join| join.unique)
    }
}

/// Minimum roles for reading and modifying an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRules {
    /// Minimum role for `get`.
    pub read: UserRole,
    /// Minimum role for mutations and `editable` reads.
    pub write: UserRole,
}

impl AccessRules {
    /// Create access rules.
    pub fn new(read: UserRole, write: UserRole) -> Self {
        Self { read, write }
    }
}

impl Default for AccessRules {
    fn default() -> Self {
        Self::new(UserRole::User, UserRole::Admin)
    }
}

/// Describes one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Entity name used by callers.
    pub name: String,
    /// Backing table.
    pub table: String,
    /// Table alias used in plans.
    pub alias: String,
    /// Primary key column.
    pub primary_key: String,
    /// Columns.
    pub fields: Vec<FieldDef>,
    /// Fields accepted by `sortfield`.
    pub sortable: Vec<String>,
    /// Ordering of related collections of this entity when no sort is given.
    /// Defaults to the primary key.
    pub natural_sort: Option<String>,
    /// Id filter options.
    pub id_filters: Vec<IdFilterDef>,
    /// Relations, resolved in declaration order.
    pub relations: Vec<RelationSpec>,
    /// Access rules.
    pub access: AccessRules,
}

impl EntityDescriptor {
    /// Create a descriptor with no columns.
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        alias: impl Into<String>,
        primary_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            alias: alias.into(),
            primary_key: primary_key.into(),
            fields: Vec::new(),
            sortable: Vec::new(),
            natural_sort: None,
            id_filters: Vec::new(),
            relations: Vec::new(),
            access: AccessRules::default(),
        }
    }

    /// Add columns.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Set the sortable fields.
    pub fn with_sortable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sortable = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the natural sort field.
    pub fn with_natural_sort(mut self, field: impl Into<String>) -> Self {
        self.natural_sort = Some(field.into());
        self
    }

    /// Add an id filter.
    pub fn with_id_filter(mut self, filter: IdFilterDef) -> Self {
        self.id_filters.push(filter);
        self
    }

    /// Add a relation.
    pub fn with_relation(mut self, relation: RelationSpec) -> Self {
        self.relations.push(relation);
        self
    }

    /// Set access rules.
    pub fn with_access(mut self, access: AccessRules) -> Self {
        self.access = access;
        self
    }

    /// Get a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check if a field exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Check if a field may be used in `sortfield`.
    pub fn is_sortable(&self, name: &str) -> bool {
        self.sortable.iter().any(|s| s == name)
    }

    /// Natural sort field (primary key when unset).
    pub fn natural_sort_field(&self) -> &str {
        self.natural_sort.as_deref().unwrap_or(&self.primary_key)
    }

    /// Get an id filter by option key.
    pub fn id_filter(&self, option: &str) -> Option<&IdFilterDef> {
        self.id_filters.iter().find(|f| f.option == option)
    }

    /// Get a relation by output name.
    pub fn relation(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Get a relation by its select option key (e.g. `selectDRules`).
    pub fn relation_by_option(&self, option: &str) -> Option<&RelationSpec> {
        self.relations.iter().find(|r| r.option == option)
    }

    /// Column reference for a field of this entity's table.
    pub fn column(&self, field: &str) -> ColumnRef {
        ColumnRef::new(&self.alias, field)
    }

    /// Column reference for the primary key.
    pub fn primary_key_column(&self) -> ColumnRef {
        self.column(&self.primary_key)
    }
}
