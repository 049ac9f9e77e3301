//! JSON snapshot file backend.
//!
//! Records live in a [`MemoryStore`]; every write rewrites the whole file
//! through a temporary sibling and a rename, so readers of the file never see
//! a half-written snapshot.

use super::memory::derive_all;
use super::{CaseFilter, CaseStore, MemoryStore, StoreError};
use crate::models::{CaseRecord, NewCaseRecord};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A case collection persisted as a JSON array on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open the snapshot at `path`.
    ///
    /// A missing file yields an empty store; the file is created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let inner = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;
            let records: Vec<CaseRecord> =
                serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                    path: path.clone(),
                    source,
                })?;
            info!("Loaded {} case records from {}", records.len(), path.display());
            MemoryStore::from_records(records)
        } else {
            warn!(
                "Data file {} not found, starting with an empty collection",
                path.display()
            );
            MemoryStore::new()
        };

        Ok(Self { path, inner })
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, records: &[CaseRecord]) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(records)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        let written = std::fs::write(&tmp, content)
            .map_err(|source| StoreError::Write {
                path: tmp.clone(),
                source,
            })
            .and_then(|()| {
                std::fs::rename(&tmp, &self.path).map_err(|source| StoreError::Write {
                    path: self.path.clone(),
                    source,
                })
            });

        if written.is_err() {
            if let Err(e) = std::fs::remove_file(&tmp) {
                warn!("Could not remove {}: {}", tmp.display(), e);
            }
        }
        written
    }
}

impl CaseStore for JsonFileStore {
    fn find(&self, filter: &CaseFilter) -> Result<Vec<CaseRecord>, StoreError> {
        self.inner.find(filter)
    }

    fn distinct_years(&self) -> Result<Vec<i32>, StoreError> {
        self.inner.distinct_years()
    }

    fn count(&self) -> Result<usize, StoreError> {
        self.inner.count()
    }

    fn insert_many(&self, records: Vec<NewCaseRecord>) -> Result<usize, StoreError> {
        let derived = derive_all(records);
        let inserted = derived.len();
        self.inner
            .update_with(|rows| rows.extend(derived), |rows| self.persist(rows))?;
        Ok(inserted)
    }

    fn replace_all(&self, records: Vec<NewCaseRecord>) -> Result<usize, StoreError> {
        let derived = derive_all(records);
        let inserted = derived.len();
        self.inner
            .update_with(|rows| *rows = derived, |rows| self.persist(rows))?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_record(regency: &str, year: i32) -> NewCaseRecord {
        NewCaseRecord {
            province_code: "35".to_string(),
            province_name: "JAWA TIMUR".to_string(),
            regency_code: regency.to_string(),
            regency_name: format!("KAB {}", regency),
            year,
            total_cases: 40,
            male_deaths: 1,
            female_deaths: 1,
            month: None,
        }
    }

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("cases.json")).unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_writes_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cases.json");

        let store = JsonFileStore::open(&path).unwrap();
        store
            .replace_all(vec![new_record("3501", 2023), new_record("3502", 2024)])
            .unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 2);
        assert_eq!(reopened.max_year().unwrap(), Some(2024));

        let record = &reopened.find(&CaseFilter::year(2023)).unwrap()[0];
        assert_eq!(record.total_deaths, 2);
        assert_eq!(record.case_fatality_rate, 5.0);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cases.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_failed_write_keeps_memory_and_disk_in_step() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cases.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.replace_all(vec![new_record("3501", 2023)]).unwrap();

        // A directory in place of the snapshot makes the rename fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = store
            .insert_many(vec![new_record("3502", 2024)])
            .unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.max_year().unwrap(), Some(2023));
        assert!(!path.with_extension("json.tmp").exists());
    }
}
