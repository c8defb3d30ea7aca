//! # Platform User Permissions
//!
//! This crate restricts which document instances a user may see. A user
//! permission grants a user one instance of a doctype (for example the
//! `Company` named `Acme`), either for every doctype that links to it or for
//! an explicit list of doctypes.
//!
//! ## Overview
//!
//! The platform-user-permission crate handles:
//! - **Records**: Stored grants and the filters used to find them
//! - **Requests**: Typed reconciliation requests and the untyped JSON form
//! - **Reconciler**: Makes the stored grants of a target match a request
//! - **Storage**: The [`PermissionStore`] seam and an in-memory store
//! - **Queries**: Per-user lookups consumed by document queries
//!
//! ## Architecture
//!
//! ```text
//! Target = user + allow (doctype) + for_value (instance)
//!
//! Per target, exactly one of:
//!   [apply_to_all]                      - one record, no applicable_for
//!   [applicable: A] [applicable: B] ... - one record per listed doctype
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use platform_user_permission::{
//!     MemoryPermissionStore, PermissionScope, ReconcileRequest, Reconciler,
//!     ReconcilerConfig, SessionContext,
//! };
//!
//! let ctx = SessionContext::new("admin@example.com").with_role("System Manager");
//! let mut reconciler =
//!     Reconciler::new(MemoryPermissionStore::new(), ReconcilerConfig::default()).unwrap();
//!
//! let user = "jane@example.com";
//! let all = ReconcileRequest::apply_to_all(user, "User", user);
//! assert_eq!(reconciler.reconcile(&ctx, &all).unwrap().as_flag(), 1);
//!
//! // Switching modes replaces the apply-to-all grant
//! let some = ReconcileRequest::new(
//!     user,
//!     "User",
//!     user,
//!     PermissionScope::applicable(["Chat Room", "Chat Message"]),
//! );
//! let outcome = reconciler.reconcile(&ctx, &some).unwrap();
//! assert_eq!(outcome.created, 2);
//! assert_eq!(outcome.removed, 1);
//! ```
//!
//! ## Authorization
//!
//! Changes require the configured manager role (`System Manager` by default).
//! The acting identity is always passed in as a [`SessionContext`].

pub mod config;
pub mod context;
pub mod error;
pub mod memory;
pub mod query;
pub mod reconciler;
pub mod record;
pub mod request;
pub mod store;

// Re-export main types for convenience
pub use config::{ReconcilerConfig, DEFAULT_MANAGER_ROLE};
pub use context::SessionContext;
pub use error::{StoreError, StoreResult, UserPermissionError, UserPermissionResult};
pub use memory::{MemoryPermissionStore, StoreStats};
pub use query::{clear_user_permissions, get_user_permissions, UserPermissionEntry, UserPermissionMap};
pub use reconciler::{add_user_permissions, applicable_doctypes, ReconcileOutcome, Reconciler};
pub use record::{PermissionFilter, PermissionRecord, PermissionTarget};
pub use request::{Flag, PermissionScope, RawReconcileRequest, ReconcileRequest};
pub use store::PermissionStore;
