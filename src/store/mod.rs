//! Case record storage.
//!
//! The aggregation layer only sees the [`CaseStore`] trait. Two backends are
//! provided: a purely in-memory store and a JSON snapshot file built on top
//! of it.

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::models::{CaseRecord, NewCaseRecord};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt data file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("case collection lock poisoned")]
    Poisoned,
}

/// Criteria for selecting case records. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseFilter {
    pub year: Option<i32>,
    /// Inclusive `(start, end)` year bounds.
    pub years: Option<(i32, i32)>,
    pub province_code: Option<String>,
    pub regency_code: Option<String>,
}

impl CaseFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn year(year: i32) -> Self {
        Self {
            year: Some(year),
            ..Self::default()
        }
    }

    pub fn between(start: i32, end: i32) -> Self {
        Self {
            years: Some((start, end)),
            ..Self::default()
        }
    }

    pub fn with_province(mut self, code: impl Into<String>) -> Self {
        self.province_code = Some(code.into());
        self
    }

    pub fn with_regency(mut self, code: impl Into<String>) -> Self {
        self.regency_code = Some(code.into());
        self
    }

    /// Whether a record satisfies every populated criterion.
    pub fn matches(&self, record: &CaseRecord) -> bool {
        if self.year.is_some_and(|y| record.year != y) {
            return false;
        }
        if let Some((start, end)) = self.years {
            if record.year < start || record.year > end {
                return false;
            }
        }
        if let Some(ref code) = self.province_code {
            if &record.province_code != code {
                return false;
            }
        }
        if let Some(ref code) = self.regency_code {
            if &record.regency_code != code {
                return false;
            }
        }
        true
    }
}

/// A collection of case records that can be queried and bulk-written.
///
/// Writers are responsible for derived fields: every record a store hands
/// back must satisfy `total_deaths == male_deaths + female_deaths` and carry
/// a zero-guarded fatality rate.
pub trait CaseStore: Send + Sync {
    /// All records matching `filter`, in insertion order.
    fn find(&self, filter: &CaseFilter) -> Result<Vec<CaseRecord>, StoreError>;

    /// Distinct years present, ascending.
    fn distinct_years(&self) -> Result<Vec<i32>, StoreError>;

    /// Number of stored records.
    fn count(&self) -> Result<usize, StoreError>;

    /// Append records, deriving their computed fields. Returns how many were stored.
    fn insert_many(&self, records: Vec<NewCaseRecord>) -> Result<usize, StoreError>;

    /// Drop every stored record and store `records` instead.
    fn replace_all(&self, records: Vec<NewCaseRecord>) -> Result<usize, StoreError>;

    /// Most recent year present, if any.
    fn max_year(&self) -> Result<Option<i32>, StoreError> {
        Ok(self.distinct_years()?.into_iter().max())
    }

    /// Whether any record carries this regency code, in any year.
    fn has_regency(&self, regency_code: &str) -> Result<bool, StoreError> {
        Ok(!self
            .find(&CaseFilter::all().with_regency(regency_code))?
            .is_empty())
    }
}
