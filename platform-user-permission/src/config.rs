//! Reconciler configuration.
//!
//! Loaded from environment variables with defaults matching the stock
//! deployment: only System Managers may change grants, and every successful
//! reconciliation is committed.

use serde::{Deserialize, Serialize};

use crate::context::SessionContext;
use crate::error::UserPermissionError;

/// Default role allowed to manage user permissions.
pub const DEFAULT_MANAGER_ROLE: &str = "System Manager";

/// Configuration for [`Reconciler`](crate::reconciler::Reconciler).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Role the acting user must hold.
    pub manager_role: String,

    /// Whether the role check is enforced at all.
    pub require_manager_role: bool,

    /// Commit the store after each successful call.
    pub auto_commit: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            manager_role: DEFAULT_MANAGER_ROLE.to_string(),
            require_manager_role: true,
            auto_commit: true,
        }
    }
}

impl ReconcilerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `USER_PERMISSION_MANAGER_ROLE`: role allowed to manage grants (default: System Manager)
    /// - `USER_PERMISSION_REQUIRE_ROLE`: enforce the role check (default: true)
    /// - `USER_PERMISSION_AUTO_COMMIT`: commit after each call (default: true)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            manager_role: std::env::var("USER_PERMISSION_MANAGER_ROLE")
                .unwrap_or(default.manager_role),
            require_manager_role: std::env::var("USER_PERMISSION_REQUIRE_ROLE")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(default.require_manager_role),
            auto_commit: std::env::var("USER_PERMISSION_AUTO_COMMIT")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(default.auto_commit),
        }
    }

    /// Configuration that skips the role check, for trusted internal callers.
    pub fn unrestricted() -> Self {
        Self {
            require_manager_role: false,
            ..Self::default()
        }
    }

    /// Check that `ctx` may change user permissions.
    ///
    /// Administrator sessions always pass.
    pub fn authorize(&self, ctx: &SessionContext) -> Result<(), UserPermissionError> {
        if !self.require_manager_role || ctx.is_administrator || ctx.has_role(&self.manager_role) {
            return Ok(());
        }

        tracing::warn!(
            user = %ctx.user,
            required_role = %self.manager_role,
            "User permission change rejected"
        );
        Err(UserPermissionError::Forbidden(format!(
            "only users with role {} may manage user permissions",
            self.manager_role
        )))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), UserPermissionError> {
        if self.require_manager_role && self.manager_role.trim().is_empty() {
            return Err(UserPermissionError::Config(
                "manager_role must be set when the role check is enabled".to_string(),
            ));
        }
        Ok(())
    }
}
