//! In-memory permission store
//!
//! Suitable for single-process applications and testing. Writes go to a
//! working set; [`MemoryPermissionStore::commit`] publishes them and
//! [`MemoryPermissionStore::rollback`] discards them.

use crate::error::{StoreError, StoreResult};
use crate::record::{PermissionFilter, PermissionRecord};
use crate::store::PermissionStore;

/// Store statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Records inserted
    pub created: u64,
    /// Records deleted
    pub deleted: u64,
    /// Successful commits
    pub commits: u64,
    /// Rollbacks
    pub rollbacks: u64,
}

/// In-memory [`PermissionStore`] with a single open transaction.
#[derive(Debug, Default)]
pub struct MemoryPermissionStore {
    /// Working set, including uncommitted writes
    records: Vec<PermissionRecord>,
    /// Last committed state
    committed: Vec<PermissionRecord>,
    /// Failure armed for a later write, with the writes left before it fires
    pending_failure: Option<(usize, StoreError)>,
    stats: StoreStats,
}

impl MemoryPermissionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose committed state is `records`.
    ///
    /// Records are loaded as-is, without validation.
    pub fn with_records(records: Vec<PermissionRecord>) -> Self {
        Self {
            committed: records.clone(),
            records,
            ..Self::default()
        }
    }

    /// Make the next write fail with `error`.
    pub fn fail_next_write(&mut self, error: StoreError) {
        self.fail_write_after(0, error);
    }

    /// Let `writes` writes succeed, then fail the following one with `error`.
    pub fn fail_write_after(&mut self, writes: usize, error: StoreError) {
        self.pending_failure = Some((writes, error));
    }

    /// All records in the working set.
    pub fn records(&self) -> &[PermissionRecord] {
        &self.records
    }

    /// Records as of the last commit.
    pub fn committed(&self) -> &[PermissionRecord] {
        &self.committed
    }

    /// Check whether there are uncommitted writes.
    pub fn is_dirty(&self) -> bool {
        self.records != self.committed
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn take_failure(&mut self) -> StoreResult<()> {
        match self.pending_failure.take() {
            Some((0, err)) => Err(err),
            Some((left, err)) => {
                self.pending_failure = Some((left - 1, err));
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn validate(&self, record: &PermissionRecord) -> StoreResult<()> {
        match (record.apply_to_all_doctypes, &record.applicable_for) {
            (true, Some(_)) => {
                return Err(StoreError::Constraint(
                    "applicable_for must be empty when apply_to_all_doctypes is set".to_string(),
                ))
            }
            (false, None) => {
                return Err(StoreError::Constraint(
                    "applicable_for is required unless apply_to_all_doctypes is set".to_string(),
                ))
            }
            _ => {}
        }

        if self.records.iter().any(|r| r.same_grant(record)) {
            return Err(StoreError::Duplicate);
        }

        // Several records for the same instance may share the default flag;
        // a default on a different instance conflicts.
        if record.is_default {
            let defaults = PermissionFilter::new()
                .user(&record.user)
                .allow(&record.allow)
                .is_default(true);
            let conflict = self
                .records
                .iter()
                .any(|r| defaults.matches(r) && r.for_value != record.for_value);
            if conflict {
                return Err(StoreError::DefaultConflict {
                    user: record.user.clone(),
                    allow: record.allow.clone(),
                });
            }
        }

        Ok(())
    }
}

impl PermissionStore for MemoryPermissionStore {
    fn exists(&self, filter: &PermissionFilter) -> StoreResult<Option<PermissionRecord>> {
        Ok(self.records.iter().find(|r| filter.matches(r)).cloned())
    }

    fn find(&self, filter: &PermissionFilter) -> StoreResult<Vec<PermissionRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    fn create(&mut self, record: PermissionRecord) -> StoreResult<PermissionRecord> {
        self.take_failure()?;
        self.validate(&record)?;
        self.records.push(record.clone());
        self.stats.created += 1;
        Ok(record)
    }

    fn delete(&mut self, filter: &PermissionFilter) -> StoreResult<usize> {
        self.take_failure()?;
        let before = self.records.len();
        self.records.retain(|r| !filter.matches(r));
        let removed = before - self.records.len();
        self.stats.deleted += removed as u64;
        Ok(removed)
    }

    fn commit(&mut self) -> StoreResult<()> {
        self.take_failure()?;
        self.committed = self.records.clone();
        self.stats.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        self.records = self.committed.clone();
        self.stats.rollbacks += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PermissionTarget;

    fn target() -> PermissionTarget {
        PermissionTarget::new("test@example.com", "User", "test@example.com")
    }

    #[test]
    fn test_create_and_exists() {
        let mut store = MemoryPermissionStore::new();
        store.create(PermissionRecord::apply_to_all(&target())).unwrap();

        assert!(store.exists(&target().apply_to_all_filter()).unwrap().is_some());
        assert!(store.exists(&target().applicable_filter()).unwrap().is_none());
        assert_eq!(store.stats().created, 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut store = MemoryPermissionStore::new();
        store.create(PermissionRecord::applicable(&target(), "Chat Room")).unwrap();

        let err = store
            .create(PermissionRecord::applicable(&target(), "Chat Room"))
            .unwrap_err();
        assert_eq!(err, StoreError::Duplicate);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_mode_constraints() {
        let mut store = MemoryPermissionStore::new();

        let mut bad = PermissionRecord::apply_to_all(&target());
        bad.applicable_for = Some("Chat Room".to_string());
        assert!(matches!(store.create(bad), Err(StoreError::Constraint(_))));

        let mut bad = PermissionRecord::applicable(&target(), "Chat Room");
        bad.applicable_for = None;
        assert!(matches!(store.create(bad), Err(StoreError::Constraint(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_default_conflict_across_instances() {
        let mut store = MemoryPermissionStore::new();
        let acme = PermissionTarget::new("test@example.com", "Company", "Acme");
        let globex = PermissionTarget::new("test@example.com", "Company", "Globex");

        store
            .create(PermissionRecord::applicable(&acme, "Sales Invoice").with_default(true))
            .unwrap();
        // Same instance may carry the flag on several records
        store
            .create(PermissionRecord::applicable(&acme, "Sales Order").with_default(true))
            .unwrap();

        let err = store
            .create(PermissionRecord::apply_to_all(&globex).with_default(true))
            .unwrap_err();
        assert!(matches!(err, StoreError::DefaultConflict { .. }));
    }

    #[test]
    fn test_delete_by_filter() {
        let mut store = MemoryPermissionStore::new();
        store.create(PermissionRecord::applicable(&target(), "Chat Room")).unwrap();
        store.create(PermissionRecord::applicable(&target(), "Chat Message")).unwrap();

        let removed = store
            .delete(&target().filter().applicable_for("Chat Room"))
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.find(&target().filter()).unwrap().len(), 1);
        assert_eq!(store.stats().deleted, 1);
    }

    #[test]
    fn test_commit_and_rollback() {
        let mut store = MemoryPermissionStore::new();
        store.create(PermissionRecord::apply_to_all(&target())).unwrap();
        assert!(store.is_dirty());
        assert!(store.committed().is_empty());

        store.commit().unwrap();
        assert!(!store.is_dirty());
        assert_eq!(store.committed().len(), 1);

        store.delete(&target().filter()).unwrap();
        assert!(store.is_empty());
        store.rollback().unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().rollbacks, 1);
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let mut store = MemoryPermissionStore::new();
        store.fail_next_write(StoreError::Backend("connection reset".to_string()));

        let err = store
            .create(PermissionRecord::apply_to_all(&target()))
            .unwrap_err();
        assert_eq!(err, StoreError::Backend("connection reset".to_string()));
        assert!(store.create(PermissionRecord::apply_to_all(&target())).is_ok());
    }

    #[test]
    fn test_delayed_failure() {
        let mut store = MemoryPermissionStore::new();
        store.fail_write_after(1, StoreError::Backend("disk full".to_string()));

        store.create(PermissionRecord::apply_to_all(&target())).unwrap();
        assert!(store.delete(&target().filter()).is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.delete(&target().filter()).unwrap(), 1);
    }
}
