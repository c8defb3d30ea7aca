//! # Permission reconciler
//!
//! Brings the stored grants of one `(user, allow, for_value)` target in line
//! with a requested [`PermissionScope`]. After a call the target holds either
//! a single apply-to-all grant or exactly one grant per requested doctype,
//! never both.

use serde::{Deserialize, Serialize};

use crate::config::ReconcilerConfig;
use crate::context::SessionContext;
use crate::error::{StoreError, UserPermissionResult};
use crate::record::{PermissionFilter, PermissionRecord, PermissionTarget};
use crate::request::{PermissionScope, ReconcileRequest};
use crate::store::PermissionStore;

/// What a reconciliation changed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Records inserted
    pub created: usize,
    /// Records deleted
    pub removed: usize,
}

impl ReconcileOutcome {
    /// `1` if any record was inserted, `0` otherwise.
    pub fn as_flag(&self) -> u8 {
        u8::from(self.created > 0)
    }

    /// Check if the call changed nothing.
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.removed == 0
    }
}

/// Reconciles user permission grants over a [`PermissionStore`].
///
/// # Example
///
/// ```
/// use platform_user_permission::{
///     MemoryPermissionStore, ReconcileRequest, Reconciler, ReconcilerConfig, SessionContext,
/// };
///
/// let ctx = SessionContext::new("admin@example.com").with_role("System Manager");
/// let mut reconciler =
///     Reconciler::new(MemoryPermissionStore::new(), ReconcilerConfig::default()).unwrap();
///
/// let request = ReconcileRequest::apply_to_all("jane@example.com", "User", "jane@example.com");
/// assert_eq!(reconciler.reconcile(&ctx, &request).unwrap().as_flag(), 1);
/// assert_eq!(reconciler.reconcile(&ctx, &request).unwrap().as_flag(), 0);
/// ```
#[derive(Debug)]
pub struct Reconciler<S> {
    store: S,
    config: ReconcilerConfig,
}

impl<S: PermissionStore> Reconciler<S> {
    /// Create a reconciler, validating `config`.
    pub fn new(store: S, config: ReconcilerConfig) -> UserPermissionResult<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Make the stored grants for the request's target match its scope.
    ///
    /// Fails with `Forbidden` before touching storage if `ctx` may not manage
    /// permissions. Storage errors are returned unchanged. With `auto_commit`
    /// a failed call rolls the store back to its last commit; otherwise the
    /// writes already made stay in the caller's open transaction.
    pub fn reconcile(
        &mut self,
        ctx: &SessionContext,
        request: &ReconcileRequest,
    ) -> UserPermissionResult<ReconcileOutcome> {
        self.config.authorize(ctx)?;
        request.validate()?;

        let result = self.apply(request).and_then(|outcome| {
            if self.config.auto_commit && !outcome.is_noop() {
                self.store.commit()?;
            }
            Ok(outcome)
        });

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                if self.config.auto_commit {
                    self.store.rollback()?;
                    tracing::warn!(
                        permission_target = %request.target,
                        error = %err,
                        "User permission reconciliation rolled back"
                    );
                }
                return Err(err);
            }
        };

        tracing::info!(
            actor = %ctx.user,
            permission_target = %request.target,
            apply_to_all = request.scope.is_apply_to_all(),
            created = outcome.created,
            removed = outcome.removed,
            "User permissions reconciled"
        );

        Ok(outcome)
    }

    fn apply(&mut self, request: &ReconcileRequest) -> UserPermissionResult<ReconcileOutcome> {
        match &request.scope {
            PermissionScope::ApplyToAll => self.reconcile_apply_to_all(request),
            PermissionScope::Applicable(_) => self.reconcile_applicable(request),
        }
    }

    /// Reject a default grant that would clash with another instance's
    /// default, before anything is deleted.
    fn check_default_conflict(&self, request: &ReconcileRequest) -> UserPermissionResult<()> {
        if !request.is_default {
            return Ok(());
        }

        let target = &request.target;
        let defaults = PermissionFilter::new()
            .user(&target.user)
            .allow(&target.allow)
            .is_default(true);
        let conflict = self
            .store
            .find(&defaults)?
            .iter()
            .any(|r| r.for_value != target.for_value);
        if conflict {
            return Err(StoreError::DefaultConflict {
                user: target.user.clone(),
                allow: target.allow.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn reconcile_apply_to_all(
        &mut self,
        request: &ReconcileRequest,
    ) -> UserPermissionResult<ReconcileOutcome> {
        let target = &request.target;
        if self.store.exists(&target.apply_to_all_filter())?.is_some() {
            return Ok(ReconcileOutcome::default());
        }
        self.check_default_conflict(request)?;

        let removed = self.store.delete(&target.applicable_filter())?;
        if removed > 0 {
            tracing::debug!(
                permission_target = %target,
                removed,
                "Removed applicable user permissions"
            );
        }

        self.insert(request, None)?;
        Ok(ReconcileOutcome { created: 1, removed })
    }

    fn reconcile_applicable(
        &mut self,
        request: &ReconcileRequest,
    ) -> UserPermissionResult<ReconcileOutcome> {
        let target = &request.target;
        let mut outcome = ReconcileOutcome::default();
        self.check_default_conflict(request)?;

        let removed = self.store.delete(&target.apply_to_all_filter())?;
        if removed > 0 {
            tracing::debug!(permission_target = %target, "Removed apply-to-all user permission");
        }
        outcome.removed += removed;

        let existing = applicable_doctypes(&self.store, target)?;
        let requested = request.scope.doctypes();

        for doctype in &requested {
            if !existing.iter().any(|d| d == doctype) {
                self.insert(request, Some(*doctype))?;
                outcome.created += 1;
            }
        }

        for doctype in existing.iter().filter(|d| !requested.contains(&d.as_str())) {
            let removed = self
                .store
                .delete(&target.applicable_filter().applicable_for(doctype))?;
            tracing::debug!(
                permission_target = %target,
                applicable_for = %doctype,
                "Removed user permission"
            );
            outcome.removed += removed;
        }

        Ok(outcome)
    }

    fn insert(
        &mut self,
        request: &ReconcileRequest,
        applicable_for: Option<&str>,
    ) -> UserPermissionResult<()> {
        let target = &request.target;
        let record = match applicable_for {
            Some(doctype) => PermissionRecord::applicable(target, doctype),
            None => PermissionRecord::apply_to_all(target),
        }
        .with_default(request.is_default)
        .with_hide_descendants(request.hide_descendants);

        let record = self.store.create(record)?;
        tracing::debug!(
            permission_target = %target,
            name = %record.name,
            applicable_for = record.applicable_for.as_deref().unwrap_or("*"),
            "Created user permission"
        );
        Ok(())
    }
}

/// The doctypes `target` currently holds applicable grants for, oldest first.
pub fn applicable_doctypes<S: PermissionStore + ?Sized>(
    store: &S,
    target: &PermissionTarget,
) -> UserPermissionResult<Vec<String>> {
    Ok(store
        .find(&target.applicable_filter())?
        .into_iter()
        .filter_map(|r| r.applicable_for)
        .collect())
}

/// Reconcile one request with the default configuration.
///
/// Returns `1` if any record was created and `0` otherwise.
///
/// # Example
///
/// ```
/// use platform_user_permission::{
///     add_user_permissions, MemoryPermissionStore, ReconcileRequest, SessionContext,
/// };
///
/// let mut store = MemoryPermissionStore::new();
/// let ctx = SessionContext::administrator();
/// let request = ReconcileRequest::apply_to_all("jane@example.com", "User", "jane@example.com");
///
/// assert_eq!(add_user_permissions(&mut store, &ctx, &request).unwrap(), 1);
/// assert_eq!(add_user_permissions(&mut store, &ctx, &request).unwrap(), 0);
/// ```
pub fn add_user_permissions<S: PermissionStore>(
    store: &mut S,
    ctx: &SessionContext,
    request: &ReconcileRequest,
) -> UserPermissionResult<u8> {
    let mut reconciler = Reconciler::new(store, ReconcilerConfig::default())?;
    Ok(reconciler.reconcile(ctx, request)?.as_flag())
}
