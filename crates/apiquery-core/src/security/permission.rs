//! Permission decisions.

use std::collections::{BTreeSet, HashMap};

use apiquery_proto::{Key, Value};

use super::context::CallerContext;
use super::role::UserRole;
use crate::catalog::EntityDescriptor;

/// Rows an `editable` read may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditableScope {
    /// No restriction.
    Unrestricted,
    /// Only rows with these primary keys.
    Ids(Vec<Key>),
    /// No rows.
    Deny,
}

impl EditableScope {
    /// Primary keys as values, or `None` when unrestricted. `Deny` yields an
    /// empty list, which matches nothing.
    pub fn key_values(&self) -> Option<Vec<Value>> {
        match self {
            EditableScope::Unrestricted => None,
            EditableScope::Ids(keys) => Some(keys.iter().map(Key::to_value).collect()),
            EditableScope::Deny => Some(Vec::new()),
        }
    }
}

/// Answers the permission questions the engine asks.
pub trait PermissionProvider: Send + Sync {
    /// Check if the caller has at least `required` for this entity.
    fn has_min_role(
        &self,
        entity: &EntityDescriptor,
        caller: &CallerContext,
        required: UserRole,
    ) -> bool {
        let _ = entity;
        caller.has_role(required)
    }

    /// Rows of this entity the caller may modify.
    fn editable_scope(&self, entity: &EntityDescriptor, caller: &CallerContext) -> EditableScope;
}

/// Role-based permissions with optional per-user id grants.
///
/// Super administrators may edit everything. Other callers may edit an
/// entity when they hold its write role; if ids were granted to them for
/// that entity, editing is narrowed to those ids.
#[derive(Debug, Clone, Default)]
pub struct RolePermissions {
    grants: HashMap<(String, i64), BTreeSet<Key>>,
}

impl RolePermissions {
    /// Create role-based permissions with no grants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict a user's editable rows of an entity to the given ids.
    pub fn grant_editable<I, K>(mut self, entity: impl Into<String>, user_id: i64, ids: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.grants
            .entry((entity.into(), user_id))
            .or_default()
            .extend(ids.into_iter().map(Into::into));
        self
    }
}

impl PermissionProvider for RolePermissions {
    fn editable_scope(&self, entity: &EntityDescriptor, caller: &CallerContext) -> EditableScope {
        if caller.role == UserRole::SuperAdmin {
            return EditableScope::Unrestricted;
        }
        if !caller.has_role(entity.access.write) {
            return EditableScope::Deny;
        }
        match self.grants.get(&(entity.name.clone(), caller.user_id)) {
            Some(ids) => EditableScope::Ids(ids.iter().cloned().collect()),
            None => EditableScope::Unrestricted,
        }
    }
}
