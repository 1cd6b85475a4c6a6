//! CSV importer
//!
//! Two phases:
//! 1. Parse: every row is validated against the column contract. Nothing is written
//!    if any row is malformed.
//! 2. Apply: businesses, symptoms and links are upserted in file order inside one
//!    transaction. A failing row rolls back the whole import.

pub mod row;

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use chrono::Utc;
use serde::Serialize;
use crate::business::NamePolicy;
use crate::storage::{SqliteStore, UpsertOutcome};
use crate::Result;

pub use row::{COLUMNS, ImportRow, parse_rows};

/// Outcome of one import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Data rows read from the file
    pub rows_processed: usize,
    /// Distinct businesses referenced
    pub businesses: usize,
    /// Distinct symptoms referenced
    pub symptoms: usize,
    /// Links created
    pub inserted: usize,
    /// Links that already existed and were updated
    pub updated: usize,
}

/// Applies CSV imports to a store
pub struct Importer<'a> {
    store: &'a mut SqliteStore,
    name_policy: NamePolicy,
}

impl<'a> Importer<'a> {
    /// Create an importer that overwrites names on conflict
    pub fn new(store: &'a mut SqliteStore) -> Self {
        Self {
            store,
            name_policy: NamePolicy::default(),
        }
    }

    pub fn with_name_policy(mut self, name_policy: NamePolicy) -> Self {
        self.name_policy = name_policy;
        self
    }

    /// Import a CSV stream
    pub fn import_reader<R: Read>(&mut self, reader: R) -> Result<ImportSummary> {
        let rows = parse_rows(reader)?;
        self.apply(&rows)
    }

    /// Import an in-memory CSV payload (e.g. an uploaded file)
    pub fn import_bytes(&mut self, bytes: &[u8]) -> Result<ImportSummary> {
        self.import_reader(bytes)
    }

    /// Import a CSV file from disk
    pub fn import_file(&mut self, path: &Path) -> Result<ImportSummary> {
        let file = std::fs::File::open(path)?;
        self.import_reader(std::io::BufReader::new(file))
    }

    /// Upsert already validated rows in a single transaction
    pub fn apply(&mut self, rows: &[ImportRow]) -> Result<ImportSummary> {
        let now = Utc::now();
        let policy = self.name_policy;
        let tx = self.store.transaction()?;

        let mut summary = ImportSummary {
            rows_processed: rows.len(),
            ..Default::default()
        };
        let mut businesses = HashSet::new();
        let mut symptoms = HashSet::new();

        for row in rows {
            let applied = tx
                .upsert_business(&row.business, policy)
                .and_then(|_| tx.upsert_symptom(&row.symptom, policy))
                .and_then(|_| {
                    tx.upsert_business_symptom(row.business.id, &row.symptom.code, row.diagnostic, now)
                });

            match applied {
                Ok(UpsertOutcome::Inserted) => summary.inserted += 1,
                Ok(_) => summary.updated += 1,
                Err(e) => {
                    tracing::warn!(row = row.row, error = %e, "Import aborted, rolling back");
                    return Err(e);
                }
            }

            businesses.insert(row.business.id);
            symptoms.insert(row.symptom.code.as_str());
        }

        tx.commit()?;

        summary.businesses = businesses.len();
        summary.symptoms = symptoms.len();
        tracing::info!(
            rows = summary.rows_processed,
            inserted = summary.inserted,
            updated = summary.updated,
            "Import committed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn header() -> String {
        format!("{}\n", COLUMNS.join(","))
    }

    /// 12 rows, 3 businesses, 5 symptoms, no repeated keys
    fn sample_csv() -> String {
        let mut csv = header();
        let rows = [
            (1001, "Clinic A", "SYMPT0001", "Fever", "true"),
            (1001, "Clinic A", "SYMPT0002", "Cough", "false"),
            (1001, "Clinic A", "SYMPT0003", "Headache", "true"),
            (1001, "Clinic A", "SYMPT0004", "Nausea", "false"),
            (1002, "Clinic B", "SYMPT0001", "Fever", "false"),
            (1002, "Clinic B", "SYMPT0002", "Cough", "true"),
            (1002, "Clinic B", "SYMPT0003", "Headache", "false"),
            (1002, "Clinic B", "SYMPT0005", "Fatigue", "true"),
            (1003, "Clinic C", "SYMPT0002", "Cough", "false"),
            (1003, "Clinic C", "SYMPT0003", "Headache", "true"),
            (1003, "Clinic C", "SYMPT0004", "Nausea", "true"),
            (1003, "Clinic C", "SYMPT0005", "Fatigue", "false"),
        ];
        for (id, name, code, symptom, flag) in rows {
            csv.push_str(&format!("{},{},{},{},{}\n", id, name, code, symptom, flag));
        }
        csv
    }

    #[test]
    fn test_import_counts() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let summary = Importer::new(&mut store).import_bytes(sample_csv().as_bytes()).unwrap();

        assert_eq!(summary.rows_processed, 12);
        assert_eq!(summary.businesses, 3);
        assert_eq!(summary.symptoms, 5);
        assert_eq!(summary.inserted, 12);
        assert_eq!(summary.updated, 0);
        assert_eq!(store.count_business_symptoms().unwrap(), 12);
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        Importer::new(&mut store).import_bytes(sample_csv().as_bytes()).unwrap();
        let first = store.find_business_symptoms(None, None).unwrap();
        let first_stats = store.stats().unwrap();

        std::thread::sleep(Duration::from_millis(5));
        let summary = Importer::new(&mut store).import_bytes(sample_csv().as_bytes()).unwrap();
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.updated, 12);

        let second = store.find_business_symptoms(None, None).unwrap();
        assert_eq!(store.stats().unwrap(), first_stats);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.business_id, b.business_id);
            assert_eq!(a.symptom_code, b.symptom_code);
            assert_eq!(a.diagnostic, b.diagnostic);
            assert_eq!(a.created_at, b.created_at);
            assert!(b.updated_at > a.updated_at);
        }
    }

    #[test]
    fn test_duplicate_key_last_row_wins() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let csv = format!("{}1,A,S1,Fever,false\n1,A,S1,Fever,true\n", header());
        let summary = Importer::new(&mut store).import_bytes(csv.as_bytes()).unwrap();

        assert_eq!(summary.rows_processed, 2);
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.updated, 1);
        assert!(store.get_business_symptom(1, "S1").unwrap().unwrap().diagnostic);
        assert_eq!(store.count_business_symptoms().unwrap(), 1);
    }

    #[test]
    fn test_flipped_flag_advances_updated_at_only() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        Importer::new(&mut store).import_bytes(sample_csv().as_bytes()).unwrap();
        let before = store.get_business_symptom(1001, "SYMPT0002").unwrap().unwrap();
        assert!(!before.diagnostic);

        std::thread::sleep(Duration::from_millis(5));
        let modified = sample_csv().replace(
            "1001,Clinic A,SYMPT0002,Cough,false",
            "1001,Clinic A,SYMPT0002,Cough,true",
        );
        Importer::new(&mut store).import_bytes(modified.as_bytes()).unwrap();

        let after = store.get_business_symptom(1001, "SYMPT0002").unwrap().unwrap();
        assert!(after.diagnostic);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
    }

    #[test]
    fn test_invalid_row_leaves_store_unchanged() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        Importer::new(&mut store).import_bytes(sample_csv().as_bytes()).unwrap();
        let before = store.find_business_symptoms(None, None).unwrap();

        let bad = format!("{}2001,Clinic Z,SYMPT0009,Rash,true\n1001,Clinic A,SYMPT0001,Fever,perhaps\n", header());
        let err = Importer::new(&mut store).import_bytes(bad.as_bytes()).unwrap_err();
        assert!(err.is_client_error());

        assert_eq!(store.find_business_symptoms(None, None).unwrap(), before);
        assert!(store.get_business(2001).unwrap().is_none());
    }

    #[test]
    fn test_storage_failure_rolls_back_earlier_rows() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let rows = vec![
            ImportRow {
                row: 1,
                business: crate::Business::new(1, "A"),
                symptom: crate::Symptom::new("S1", "Fever"),
                diagnostic: true,
            },
            // Bypasses the parser; the symptoms table rejects an empty code
            ImportRow {
                row: 2,
                business: crate::Business::new(2, "B"),
                symptom: crate::Symptom::new("", "Cough"),
                diagnostic: false,
            },
        ];

        let err = Importer::new(&mut store).apply(&rows).unwrap_err();
        assert!(!err.is_client_error());
        assert_eq!(store.stats().unwrap().businesses, 0);
        assert_eq!(store.count_business_symptoms().unwrap(), 0);
    }

    #[test]
    fn test_keep_existing_names() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let first = format!("{}1,Original,S1,Fever,true\n", header());
        let second = format!("{}1,Renamed,S1,High fever,true\n", header());

        Importer::new(&mut store).import_bytes(first.as_bytes()).unwrap();
        Importer::new(&mut store)
            .with_name_policy(NamePolicy::KeepExisting)
            .import_bytes(second.as_bytes())
            .unwrap();
        assert_eq!(store.get_business(1).unwrap().unwrap().name, "Original");
        assert_eq!(store.get_symptom("S1").unwrap().unwrap().name, "Fever");

        Importer::new(&mut store).import_bytes(second.as_bytes()).unwrap();
        assert_eq!(store.get_business(1).unwrap().unwrap().name, "Renamed");
        assert_eq!(store.get_symptom("S1").unwrap().unwrap().name, "High fever");
    }

    #[test]
    fn test_import_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("business_symptom_data.csv");
        std::fs::write(&path, sample_csv()).unwrap();

        let mut store = SqliteStore::open_in_memory().unwrap();
        let summary = Importer::new(&mut store).import_file(&path).unwrap();
        assert_eq!(summary.rows_processed, 12);
    }
}
