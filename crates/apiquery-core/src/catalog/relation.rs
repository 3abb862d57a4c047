//! Relation specifications.

use super::path::{ColumnRef, Join};

/// How parent rows reach related rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationPath {
    /// The parent table carries the related primary key in this column.
    ParentColumn(String),
    /// The related table carries the parent primary key in this column.
    ChildColumn(String),
    /// A join chain from the parent table; `target` holds the related
    /// primary key on the last hop.
    Joined {
        /// Join hops starting at the parent table.
        joins: Vec<Join>,
        /// Related primary key column.
        target: ColumnRef,
    },
}

/// A related-object output of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    /// Field name under which related objects are attached.
    pub name: String,
    /// Option key selecting this relation (e.g. `selectHosts`).
    pub option: String,
    /// Target entity name.
    pub target: String,
    /// Join path.
    pub path: RelationPath,
}

impl RelationSpec {
    fn new(
        name: impl Into<String>,
        option: impl Into<String>,
        target: impl Into<String>,
        path: RelationPath,
    ) -> Self {
        Self {
            name: name.into(),
            option: option.into(),
            target: target.into(),
            path,
        }
    }

    /// Parent holds the foreign key.
    pub fn parent_column(
        name: impl Into<String>,
        option: impl Into<String>,
        target: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self::new(name, option, target, RelationPath::ParentColumn(column.into()))
    }

    /// Related rows hold the foreign key.
    pub fn child_column(
        name: impl Into<String>,
        option: impl Into<String>,
        target: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self::new(name, option, target, RelationPath::ChildColumn(column.into()))
    }

    /// Related rows are reached through a join chain.
    pub fn joined(
        name: impl Into<String>,
        option: impl Into<String>,
        target: impl Into<String>,
        joins: impl IntoIterator<Item = Join>,
        target_column: ColumnRef,
    ) -> Self {
        Self::new(
            name,
            option,
            target,
            RelationPath::Joined {
                joins: joins.into_iter().collect(),
                target: target_column,
            },
        )
    }

    /// Parent column that must be fetched to resolve this relation, if any.
    pub fn parent_key_column(&self) -> Option<&str> {
        match &self.path {
            RelationPath::ParentColumn(column) => Some(column),
            _ => None,
        }
    }
}
