//! Access control.
//!
//! Reads are gated twice:
//! - a role gate: callers below an entity's read role get an empty result
//!   instead of an error,
//! - an `editable` scope: when requested, rows are narrowed to the ones the
//!   caller may modify.
//!
//! Both decisions are delegated to a [`PermissionProvider`] so that hosts can
//! plug in their own permission model.

mod context;
mod permission;
mod role;

pub use context::CallerContext;
pub use permission::{EditableScope, PermissionProvider, RolePermissions};
pub use role::{ParseRoleError, UserRole};
