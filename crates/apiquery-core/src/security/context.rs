//! Caller identity.

use super::role::UserRole;

/// The identity a request runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    /// User id.
    pub user_id: i64,
    /// User role.
    pub role: UserRole,
}

impl CallerContext {
    /// Create a caller context.
    pub fn new(user_id: i64, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// A regular user.
    pub fn user(user_id: i64) -> Self {
        Self::new(user_id, UserRole::User)
    }

    /// An administrator.
    pub fn admin(user_id: i64) -> Self {
        Self::new(user_id, UserRole::Admin)
    }

    /// A super administrator.
    pub fn super_admin(user_id: i64) -> Self {
        Self::new(user_id, UserRole::SuperAdmin)
    }

    /// Check if the caller has at least the given role.
    pub fn has_role(&self, required: UserRole) -> bool {
        self.role >= required
    }
}
