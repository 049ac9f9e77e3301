//! In-memory case collection.

use super::{CaseFilter, CaseStore, StoreError};
use crate::models::{CaseRecord, NewCaseRecord};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Case records held in a vector behind a read/write lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<CaseRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from already persisted rows.
    ///
    /// Derived fields are recomputed; values found in the rows are not trusted.
    pub fn from_records(mut records: Vec<CaseRecord>) -> Self {
        for record in &mut records {
            record.rederive();
        }
        Self {
            records: RwLock::new(records),
        }
    }

    /// Apply `change` to a copy of the rows and install the copy only once
    /// `commit` accepts it. Writers are serialised for the whole call.
    pub fn update_with<C>(
        &self,
        change: impl FnOnce(&mut Vec<CaseRecord>),
        commit: C,
    ) -> Result<(), StoreError>
    where
        C: FnOnce(&[CaseRecord]) -> Result<(), StoreError>,
    {
        let mut records = self.write()?;
        let mut next = records.clone();
        change(&mut next);
        commit(&next)?;
        *records = next;
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<CaseRecord>>, StoreError> {
        self.records.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<CaseRecord>>, StoreError> {
        self.records.write().map_err(|_| StoreError::Poisoned)
    }
}

pub(super) fn derive_all(records: Vec<NewCaseRecord>) -> Vec<CaseRecord> {
    let now = Utc::now();
    records
        .into_iter()
        .map(|new| CaseRecord::from_new(new, now))
        .collect()
}

impl CaseStore for MemoryStore {
    fn find(&self, filter: &CaseFilter) -> Result<Vec<CaseRecord>, StoreError> {
        let records = self.read()?;
        let matched: Vec<CaseRecord> = records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        debug!("{:?} matched {} of {} records", filter, matched.len(), records.len());
        Ok(matched)
    }

    fn distinct_years(&self) -> Result<Vec<i32>, StoreError> {
        let years: BTreeSet<i32> = self.read()?.iter().map(|r| r.year).collect();
        Ok(years.into_iter().collect())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    fn insert_many(&self, records: Vec<NewCaseRecord>) -> Result<usize, StoreError> {
        let derived = derive_all(records);
        let inserted = derived.len();
        self.write()?.extend(derived);
        Ok(inserted)
    }

    fn replace_all(&self, records: Vec<NewCaseRecord>) -> Result<usize, StoreError> {
        let derived = derive_all(records);
        let inserted = derived.len();
        *self.write()? = derived;
        Ok(inserted)
    }
}
