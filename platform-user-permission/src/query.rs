//! Read-side lookups over stored grants.
//!
//! [`get_user_permissions`] folds a user's records into the shape document
//! queries consume: grants keyed by the doctype they restrict.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ReconcilerConfig;
use crate::context::SessionContext;
use crate::error::UserPermissionResult;
use crate::record::PermissionFilter;
use crate::store::PermissionStore;

/// One grant as seen by document queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPermissionEntry {
    /// Granted instance
    pub doc: String,
    /// Doctype the grant is limited to; `None` applies to all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicable_for: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub hide_descendants: bool,
}

impl UserPermissionEntry {
    /// Check whether this grant applies when reading a `doctype` document.
    pub fn applies_to(&self, doctype: &str) -> bool {
        self.applicable_for.as_deref().map_or(true, |d| d == doctype)
    }
}

/// A user's grants keyed by restricted doctype (`allow`).
///
/// # Example
///
/// ```
/// use platform_user_permission::{
///     get_user_permissions, MemoryPermissionStore, PermissionScope, ReconcileRequest,
///     Reconciler, ReconcilerConfig, SessionContext,
/// };
///
/// let ctx = SessionContext::administrator();
/// let mut reconciler =
///     Reconciler::new(MemoryPermissionStore::new(), ReconcilerConfig::default()).unwrap();
/// reconciler
///     .reconcile(
///         &ctx,
///         &ReconcileRequest::new(
///             "jane@example.com",
///             "Company",
///             "Acme",
///             PermissionScope::applicable(["Sales Invoice"]),
///         ),
///     )
///     .unwrap();
///
/// let perms = get_user_permissions(reconciler.store(), "jane@example.com").unwrap();
/// assert!(perms.allows("Company", "Acme", "Sales Invoice"));
/// assert!(!perms.allows("Company", "Acme", "Purchase Invoice"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPermissionMap {
    entries: BTreeMap<String, Vec<UserPermissionEntry>>,
}

impl UserPermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants restricting `allow`, empty if there are none.
    pub fn get(&self, allow: &str) -> &[UserPermissionEntry] {
        self.entries.get(allow).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check whether `allow` is restricted for this user at all.
    pub fn restricts(&self, allow: &str) -> bool {
        !self.get(allow).is_empty()
    }

    /// Check whether a grant on `(allow, doc)` covers a `for_doctype` read.
    pub fn allows(&self, allow: &str, doc: &str, for_doctype: &str) -> bool {
        self.get(allow)
            .iter()
            .any(|e| e.doc == doc && e.applies_to(for_doctype))
    }

    /// Instances of `allow` visible when reading a `for_doctype` document,
    /// each listed once in first-granted order.
    pub fn allowed_docs(&self, allow: &str, for_doctype: &str) -> Vec<&str> {
        let mut docs: Vec<&str> = Vec::new();
        for entry in self.get(allow).iter().filter(|e| e.applies_to(for_doctype)) {
            if !docs.contains(&entry.doc.as_str()) {
                docs.push(entry.doc.as_str());
            }
        }
        docs
    }

    /// The user's default instance for `allow`, if one is flagged.
    pub fn default_value(&self, allow: &str) -> Option<&str> {
        self.get(allow)
            .iter()
            .find(|e| e.is_default)
            .map(|e| e.doc.as_str())
    }

    /// Restricted doctypes, sorted.
    pub fn doctypes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Load every grant held by `user`.
pub fn get_user_permissions<S: PermissionStore + ?Sized>(
    store: &S,
    user: &str,
) -> UserPermissionResult<UserPermissionMap> {
    let mut map = UserPermissionMap::new();
    for record in store.find(&PermissionFilter::new().user(user))? {
        map.entries
            .entry(record.allow)
            .or_default()
            .push(UserPermissionEntry {
                doc: record.for_value,
                applicable_for: record.applicable_for,
                is_default: record.is_default,
                hide_descendants: record.hide_descendants,
            });
    }
    Ok(map)
}

/// Delete every grant `user` holds on `allow` instances.
///
/// Subject to the same role check as reconciliation. Returns the number of
/// records removed.
pub fn clear_user_permissions<S: PermissionStore + ?Sized>(
    store: &mut S,
    config: &ReconcilerConfig,
    ctx: &SessionContext,
    user: &str,
    allow: &str,
) -> UserPermissionResult<usize> {
    config.authorize(ctx)?;

    let removed = store.delete(&PermissionFilter::new().user(user).allow(allow))?;
    if config.auto_commit && removed > 0 {
        store.commit()?;
    }

    tracing::info!(actor = %ctx.user, user, allow, removed, "Cleared user permissions");
    Ok(removed)
}
