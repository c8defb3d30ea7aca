//! Error types for user permission operations
//!
//! Storage failures surface as [`StoreError`] and pass through the reconciler
//! unchanged; everything the reconciler itself rejects is a
//! [`UserPermissionError`].

use thiserror::Error;

/// Errors raised by a [`PermissionStore`](crate::store::PermissionStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An identical grant already exists for this user and target
    #[error("User permission already exists")]
    Duplicate,

    /// Another grant is already the user's default for this doctype
    #[error("{user} has already assigned a default value for {allow}")]
    DefaultConflict {
        /// User holding the existing default.
        user: String,
        /// Doctype the default applies to.
        allow: String,
    },

    /// Record violates a field-level constraint
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Backend failure (connection, transaction, etc.)
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// User permission error types.
#[derive(Debug, Error)]
pub enum UserPermissionError {
    /// Request is missing a required field or is otherwise malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Request payload could not be decoded
    #[error("Failed to parse request: {0}")]
    Parse(String),

    /// Acting user lacks the role required to manage permissions
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage collaborator failure, propagated as-is
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for user permission operations.
pub type UserPermissionResult<T> = Result<T, UserPermissionError>;

impl From<serde_json::Error> for UserPermissionError {
    fn from(err: serde_json::Error) -> Self {
        UserPermissionError::Parse(err.to_string())
    }
}

impl UserPermissionError {
    /// Check if this error should be logged at error level.
    ///
    /// Rejected requests are expected; backend and config failures are not.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            UserPermissionError::Config(_) | UserPermissionError::Store(StoreError::Backend(_))
        )
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            UserPermissionError::InvalidRequest(_) | UserPermissionError::Parse(_) => 400,
            UserPermissionError::Forbidden(_) => 403,
            UserPermissionError::Store(StoreError::Duplicate)
            | UserPermissionError::Store(StoreError::DefaultConflict { .. }) => 409,
            UserPermissionError::Store(StoreError::Constraint(_)) => 422,
            UserPermissionError::Store(StoreError::Backend(_)) | UserPermissionError::Config(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            UserPermissionError::InvalidRequest(_) => "INVALID_REQUEST",
            UserPermissionError::Parse(_) => "PARSE_ERROR",
            UserPermissionError::Forbidden(_) => "FORBIDDEN",
            UserPermissionError::Config(_) => "CONFIG_ERROR",
            UserPermissionError::Store(StoreError::Duplicate) => "DUPLICATE_ENTRY",
            UserPermissionError::Store(StoreError::DefaultConflict { .. }) => "DEFAULT_CONFLICT",
            UserPermissionError::Store(StoreError::Constraint(_)) => "CONSTRAINT_VIOLATION",
            UserPermissionError::Store(StoreError::Backend(_)) => "STORAGE_ERROR",
        }
    }
}
