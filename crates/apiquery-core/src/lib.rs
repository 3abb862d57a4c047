//! apiquery core - option normalization, query planning, relation resolution.
//!
//! A `get` call flows through the pipeline in [`query`]: raw options are
//! normalized against an [`EntityDescriptor`], planned into a [`QueryPlan`],
//! executed by a [`Storage`] backend and materialized into an entity map.
//! Related objects are then resolved and attached, the output projection is
//! applied and the result is finalized as a keyed map or a dense list.

pub mod catalog;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod query;
pub mod security;
pub mod storage;

pub use catalog::{
    AccessRules, Catalog, ColumnRef, ColumnType, EntityDescriptor, FieldDef, IdFilterDef, Join,
    JoinCondition, RelationPath, RelationSpec,
};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{Error, Result};
pub use query::{decode_options, Predicate, QueryPlan, QueryPlanner};
pub use storage::{Loader, MemoryStore, Row, SqliteStore, Storage, StorageError, TableSchema};

// Security exports
pub use security::{CallerContext, EditableScope, PermissionProvider, RolePermissions, UserRole};

/// Re-export protocol types.
pub use apiquery_proto as proto;
