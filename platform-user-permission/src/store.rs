//! Storage seam for permission records
//!
//! The reconciler only ever talks to storage through [`PermissionStore`].
//! Implementations own persistence and the transaction boundary; writes made
//! before [`PermissionStore::commit`] belong to the caller's open transaction.

use crate::error::StoreResult;
use crate::record::{PermissionFilter, PermissionRecord};

/// Record storage used by the reconciler and the lookup helpers.
pub trait PermissionStore {
    /// Return one record matching `filter`, if any.
    fn exists(&self, filter: &PermissionFilter) -> StoreResult<Option<PermissionRecord>>;

    /// Return every record matching `filter`, oldest first.
    fn find(&self, filter: &PermissionFilter) -> StoreResult<Vec<PermissionRecord>>;

    /// Insert a record, enforcing record-level validation.
    fn create(&mut self, record: PermissionRecord) -> StoreResult<PermissionRecord>;

    /// Delete every record matching `filter`, returning how many were removed.
    fn delete(&mut self, filter: &PermissionFilter) -> StoreResult<usize>;

    /// Make pending writes durable.
    fn commit(&mut self) -> StoreResult<()>;

    /// Discard writes made since the last commit.
    fn rollback(&mut self) -> StoreResult<()>;
}

impl<S: PermissionStore + ?Sized> PermissionStore for &mut S {
    fn exists(&self, filter: &PermissionFilter) -> StoreResult<Option<PermissionRecord>> {
        (**self).exists(filter)
    }

    fn find(&self, filter: &PermissionFilter) -> StoreResult<Vec<PermissionRecord>> {
        (**self).find(filter)
    }

    fn create(&mut self, record: PermissionRecord) -> StoreResult<PermissionRecord> {
        (**self).create(record)
    }

    fn delete(&mut self, filter: &PermissionFilter) -> StoreResult<usize> {
        (**self).delete(filter)
    }

    fn commit(&mut self) -> StoreResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> StoreResult<()> {
        (**self).rollback()
    }
}
