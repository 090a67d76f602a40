#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Historical crash record repository.
//!
//! The dataset is loaded once at startup (see [`loader`]) and then only
//! grows through [`RecordRepository::append`]. Readers work on an
//! immutable snapshot taken at the start of each request, so a prediction
//! never observes a half-applied append.

pub mod loader;

use std::sync::{Arc, PoisonError, RwLock};

pub use crash_cause_records_models::{CrashRecord, DatasetColumns, MatchMethod};

/// Errors that can occur while loading the historical dataset.
#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    /// CSV parsing error.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path to the CSV file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// I/O error reading directory or file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Directory does not exist.
    #[error("Data directory not found: {dir}")]
    MissingDirectory {
        /// The directory that was expected.
        dir: String,
    },

    /// Directory exists but holds no CSV files.
    #[error("No CSV files found in {dir}")]
    NoCsvFiles {
        /// The directory that was scanned.
        dir: String,
    },
}

/// Access to the historical crash records.
///
/// Implementations own their concurrency discipline: any number of
/// concurrent [`snapshot`](Self::snapshot) calls, appends serialized.
pub trait RecordRepository: Send + Sync {
    /// Returns every record currently in the repository.
    ///
    /// The returned snapshot is unaffected by later appends.
    fn snapshot(&self) -> Arc<Vec<CrashRecord>>;

    /// Appends a record.
    fn append(&self, record: CrashRecord);

    /// Number of records currently in the repository.
    fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the repository holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append-only in-memory repository with snapshot reads.
///
/// Appends take the write lock and copy-on-write the record list when a
/// snapshot is still held by a reader.
#[derive(Debug, Default)]
pub struct InMemoryRecordRepository {
    records: RwLock<Arc<Vec<CrashRecord>>>,
}

impl InMemoryRecordRepository {
    /// Creates a repository seeded with `records`.
    #[must_use]
    pub fn new(records: Vec<CrashRecord>) -> Self {
        Self {
            records: RwLock::new(Arc::new(records)),
        }
    }
}

impl RecordRepository for InMemoryRecordRepository {
    fn snapshot(&self) -> Arc<Vec<CrashRecord>> {
        // A poisoned lock still guards a complete list: `push` either
        // happened or it did not.
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn append(&self, record: CrashRecord) {
        let mut guard = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut guard).push(record);
    }

    fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn record(street: &str) -> CrashRecord {
        CrashRecord::reported(&DatasetColumns::default(), 2024, "Sants", street, 41.37, 2.13)
    }

    #[test]
    fn snapshot_is_isolated_from_later_appends() {
        let repo = InMemoryRecordRepository::new(vec![record("Carrer de Sants")]);

        let before = repo.snapshot();
        repo.append(record("Gran Via"));

        assert_eq!(before.len(), 1);
        assert_eq!(repo.snapshot().len(), 2);
        assert_eq!(repo.snapshot()[1].street.as_deref(), Some("Gran Via"));
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let repo = Arc::new(InMemoryRecordRepository::default());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = Arc::clone(&repo);
                thread::spawn(move || {
                    for j in 0..50 {
                        repo.append(record(&format!("Carrer {i}-{j}")));
                        let _ = repo.snapshot();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(repo.len(), 400);
    }

    #[test]
    fn empty_repository() {
        let repo = InMemoryRecordRepository::default();
        assert!(repo.is_empty());
        assert!(repo.snapshot().is_empty());
    }
}
