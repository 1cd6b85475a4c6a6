//! SQLite storage implementation

use std::path::Path;
use std::time::Duration;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, params_from_iter};
use rusqlite::types::Value;
use serde::Serialize;
use crate::{Result, Error};
use crate::business::{Business, BusinessSymptom, BusinessSymptomRecord, NamePolicy, Symptom};
use super::schema;

/// Busy timeout used when the caller does not pick one
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

const RECORD_COLUMNS: &str = "bs.business_id, b.name, bs.symptom_code, s.name, bs.diagnostic, bs.created_at, bs.updated_at";

/// SQLite-backed storage for businesses, symptoms and their links
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open a database file, waiting up to `busy_timeout` for locks held by other connections
    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut store = Self { conn };
        store.run_migrations()?;
        Ok(store)
    }

    /// Apply every migration newer than the recorded schema version
    fn run_migrations(&mut self) -> Result<()> {
        // Per-request connections land here; skip the write lock when nothing is pending
        if self.has_migrations_table()? && self.schema_version()? == schema::latest_version() {
            return Ok(());
        }

        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(schema::CREATE_SCHEMA_MIGRATIONS_TABLE, [])?;

        let current: i64 = tx.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )?;
        if current > schema::latest_version() {
            return Err(Error::Migration(format!(
                "database schema version {} is newer than supported version {}",
                current,
                schema::latest_version()
            )));
        }

        for migration in schema::MIGRATIONS.iter().filter(|m| m.version > current) {
            for stmt in (migration.statements)() {
                tx.execute(stmt, [])?;
            }
            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                params![migration.version, Utc::now()],
            )?;
            tracing::info!(version = migration.version, "Applied schema migration: {}", migration.description);
        }

        tx.commit()?;
        Ok(())
    }

    fn has_migrations_table(&self) -> Result<bool> {
        let found = self.conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_migrations'",
                [],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Highest applied schema version
    pub fn schema_version(&self) -> Result<i64> {
        let version = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    /// Begin a write transaction.
    ///
    /// The transaction takes the database write lock up front (`BEGIN IMMEDIATE`),
    /// so concurrent importers queue on the busy timeout instead of failing mid-way.
    /// Dropping it without calling `commit` rolls everything back.
    pub fn transaction(&mut self) -> Result<StoreTransaction<'_>> {
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(StoreTransaction { tx })
    }

    // ========== Lookups ==========

    /// Get a business by id
    pub fn get_business(&self, id: i64) -> Result<Option<Business>> {
        self.conn
            .query_row(
                "SELECT id, name FROM businesses WHERE id = ?1",
                [id],
                |row| Ok(Business { id: row.get(0)?, name: row.get(1)? }),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a symptom by code
    pub fn get_symptom(&self, code: &str) -> Result<Option<Symptom>> {
        self.conn
            .query_row(
                "SELECT code, name FROM symptoms WHERE code = ?1",
                [code],
                |row| Ok(Symptom { code: row.get(0)?, name: row.get(1)? }),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Get a single business/symptom link
    pub fn get_business_symptom(&self, business_id: i64, symptom_code: &str) -> Result<Option<BusinessSymptom>> {
        self.conn
            .query_row(
                "SELECT business_id, symptom_code, diagnostic, created_at, updated_at
                 FROM business_symptoms WHERE business_id = ?1 AND symptom_code = ?2",
                params![business_id, symptom_code],
                |row| {
                    Ok(BusinessSymptom {
                        business_id: row.get(0)?,
                        symptom_code: row.get(1)?,
                        diagnostic: row.get(2)?,
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Find links matching every supplied filter, ordered by business id then symptom code
    pub fn find_business_symptoms(
        &self,
        business_id: Option<i64>,
        diagnostic: Option<bool>,
    ) -> Result<Vec<BusinessSymptomRecord>> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(id) = business_id {
            values.push(Value::Integer(id));
            clauses.push(format!("bs.business_id = ?{}", values.len()));
        }
        if let Some(flag) = diagnostic {
            values.push(Value::Integer(i64::from(flag)));
            clauses.push(format!("bs.diagnostic = ?{}", values.len()));
        }

        let mut sql = format!(
            "SELECT {} FROM business_symptoms bs
             JOIN businesses b ON b.id = bs.business_id
             JOIN symptoms s ON s.code = bs.symptom_code",
            RECORD_COLUMNS
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY bs.business_id, bs.symptom_code");

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values), row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    // ========== Counts ==========

    /// Count all businesses
    pub fn count_businesses(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM businesses")
    }

    /// Count all symptoms
    pub fn count_symptoms(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM symptoms")
    }

    /// Count all business/symptom links
    pub fn count_business_symptoms(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM business_symptoms")
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            businesses: self.count_businesses()?,
            symptoms: self.count_symptoms()?,
            business_symptoms: self.count_business_symptoms()?,
            schema_version: self.schema_version()?,
        })
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<BusinessSymptomRecord> {
    Ok(BusinessSymptomRecord {
        business_id: row.get(0)?,
        business_name: row.get(1)?,
        symptom_code: row.get(2)?,
        symptom_name: row.get(3)?,
        diagnostic: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Result of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// Open write transaction on a [`SqliteStore`]
pub struct StoreTransaction<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl StoreTransaction<'_> {
    /// Insert the business if absent, otherwise apply `policy` to its name
    pub fn upsert_business(&self, business: &Business, policy: NamePolicy) -> Result<UpsertOutcome> {
        let existing: Option<String> = self.tx
            .query_row("SELECT name FROM businesses WHERE id = ?1", [business.id], |row| row.get(0))
            .optional()?;

        match existing {
            None => {
                self.tx.execute(
                    "INSERT INTO businesses (id, name) VALUES (?1, ?2)",
                    params![business.id, business.name],
                )?;
                Ok(UpsertOutcome::Inserted)
            }
            Some(name) if policy == NamePolicy::Overwrite && name != business.name => {
                self.tx.execute(
                    "UPDATE businesses SET name = ?2 WHERE id = ?1",
                    params![business.id, business.name],
                )?;
                Ok(UpsertOutcome::Updated)
            }
            Some(_) => Ok(UpsertOutcome::Unchanged),
        }
    }

    /// Insert the symptom if absent, otherwise apply `policy` to its name
    pub fn upsert_symptom(&self, symptom: &Symptom, policy: NamePolicy) -> Result<UpsertOutcome> {
        let existing: Option<String> = self.tx
            .query_row("SELECT name FROM symptoms WHERE code = ?1", [&symptom.code], |row| row.get(0))
            .optional()?;

        match existing {
            None => {
                self.tx.execute(
                    "INSERT INTO symptoms (code, name) VALUES (?1, ?2)",
                    params![symptom.code, symptom.name],
                )?;
                Ok(UpsertOutcome::Inserted)
            }
            Some(name) if policy == NamePolicy::Overwrite && name != symptom.name => {
                self.tx.execute(
                    "UPDATE symptoms SET name = ?2 WHERE code = ?1",
                    params![symptom.code, symptom.name],
                )?;
                Ok(UpsertOutcome::Updated)
            }
            Some(_) => Ok(UpsertOutcome::Unchanged),
        }
    }

    /// Insert the link with both timestamps at `now`, or update its flag and `updated_at`.
    ///
    /// `created_at` is never touched on the update path.
    pub fn upsert_business_symptom(
        &self,
        business_id: i64,
        symptom_code: &str,
        diagnostic: bool,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        let exists = self.tx
            .query_row(
                "SELECT 1 FROM business_symptoms WHERE business_id = ?1 AND symptom_code = ?2",
                params![business_id, symptom_code],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        if exists {
            self.tx.execute(
                "UPDATE business_symptoms SET diagnostic = ?3, updated_at = ?4
                 WHERE business_id = ?1 AND symptom_code = ?2",
                params![business_id, symptom_code, diagnostic, now],
            )?;
            Ok(UpsertOutcome::Updated)
        } else {
            self.tx.execute(
                "INSERT INTO business_symptoms (business_id, symptom_code, diagnostic, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![business_id, symptom_code, diagnostic, now],
            )?;
            Ok(UpsertOutcome::Inserted)
        }
    }

    /// Commit all writes made through this transaction
    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DbStats {
    pub businesses: usize,
    pub symptoms: usize,
    pub business_symptoms: usize,
    pub schema_version: i64,
}
