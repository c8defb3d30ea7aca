//! Acting session context
//!
//! Operations that change grants take the caller's identity explicitly
//! instead of reading it from an ambient session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the user performing an operation.
///
/// # Examples
///
/// ```
/// use platform_user_permission::SessionContext;
///
/// let ctx = SessionContext::new("admin@example.com").with_role("System Manager");
/// assert!(ctx.has_role("System Manager"));
/// assert!(!ctx.has_role("Guest"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// Acting user
    pub user: String,

    /// Roles held by the acting user
    #[serde(default)]
    pub roles: Vec<String>,

    /// Administrator sessions bypass role checks
    #[serde(default)]
    pub is_administrator: bool,

    /// When the session context was built
    pub started_at: DateTime<Utc>,
}

impl SessionContext {
    /// Creates a context for `user` with no roles.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            roles: Vec::new(),
            is_administrator: false,
            started_at: Utc::now(),
        }
    }

    /// Creates the built-in administrator context.
    pub fn administrator() -> Self {
        let mut ctx = Self::new("Administrator");
        ctx.is_administrator = true;
        ctx
    }

    /// Add a role to this context.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        let role = role.into();
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    /// Add several roles to this context.
    pub fn with_roles<I, S>(self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        roles.into_iter().fold(self, |ctx, role| ctx.with_role(role))
    }

    /// Check if the acting user holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_are_deduplicated() {
        let ctx = SessionContext::new("a@example.com").with_roles(["Sales User", "Sales User"]);
        assert_eq!(ctx.roles.len(), 1);
        assert!(ctx.has_role("Sales User"));
    }

    #[test]
    fn test_administrator() {
        let ctx = SessionContext::administrator();
        assert!(ctx.is_administrator);
        assert_eq!(ctx.user, "Administrator");
        assert!(ctx.roles.is_empty());
    }
}
