//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - businesses(id, name)
//! - symptoms(code, name)
//! - business_symptoms(business_id, symptom_code, diagnostic, created_at, updated_at)
//! - schema_migrations(version, applied_at)

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, SqliteStore, StoreTransaction, UpsertOutcome, DEFAULT_BUSY_TIMEOUT};
