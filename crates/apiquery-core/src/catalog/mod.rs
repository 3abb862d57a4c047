//! Entity catalog.
//!
//! The catalog holds one descriptor per entity kind: its table, columns,
//! sortable fields, id filters, relations and access rules. Descriptors are
//! data; the query pipeline is generic over them.

mod catalog;
mod entity;
mod field;
mod path;
mod relation;

pub use catalog::Catalog;
pub use entity::{AccessRules, EntityDescriptor, IdFilterDef};
pub use field::{ColumnType, FieldDef};
pub use path::{ColumnRef, Join, JoinCondition};
pub use relation::{RelationPath, RelationSpec};
