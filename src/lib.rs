//! # business-symptoms - Business/Symptom association service
//!
//! Keeps a many-to-many mapping between businesses and symptoms, fed by
//! CSV bulk imports and read back through filtered queries.
//!
//! The crate provides:
//! - Data model for businesses, symptoms and their diagnostic links
//! - SQLite-backed storage with versioned schema migrations
//! - CSV importer that validates the whole file, then upserts in one transaction
//! - Query engine filtering links by business and diagnostic flag
//! - HTTP server exposing import and query endpoints

pub mod business;
pub mod storage;
pub mod importer;
pub mod query;
pub mod server;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use business::{Business, BusinessSymptom, BusinessSymptomRecord, Symptom, parse_flag};
pub use storage::SqliteStore;
pub use importer::{ImportSummary, Importer};
pub use query::{QueryEngine, SymptomFilter};

/// Result type alias for business-symptoms operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for business-symptoms operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed CSV at row {row}: {source}")]
    Csv {
        row: u64,
        #[source]
        source: csv::Error,
    },

    #[error("Missing CSV column: {0}")]
    MissingColumn(String),

    #[error("Invalid row {row}: {message}")]
    InvalidRow { row: u64, message: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("No file field named '{0}' in upload")]
    MissingUpload(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Upload too large: {0}")]
    UploadTooLarge(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

impl Error {
    /// Whether the error was caused by bad client input rather than the store
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Csv { .. }
                | Error::MissingColumn(_)
                | Error::InvalidRow { .. }
                | Error::InvalidFilter(_)
                | Error::MissingUpload(_)
                | Error::Upload(_)
                | Error::UploadTooLarge(_)
        )
    }

    /// Whether SQLite refused the operation because the database is locked
    pub fn is_busy(&self) -> bool {
        match self {
            Error::Storage(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: std::os::raw::c_int) -> Error {
        Error::Storage(rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None))
    }

    #[test]
    fn test_busy_and_locked_are_busy() {
        assert!(sqlite_failure(rusqlite::ffi::SQLITE_BUSY).is_busy());
        assert!(sqlite_failure(rusqlite::ffi::SQLITE_LOCKED).is_busy());
        assert!(!sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT).is_busy());
        assert!(!Error::Upload("truncated".into()).is_busy());
    }

    #[test]
    fn test_client_errors() {
        assert!(Error::UploadTooLarge("limit".into()).is_client_error());
        assert!(Error::InvalidRow { row: 3, message: "bad".into() }.is_client_error());
        assert!(!sqlite_failure(rusqlite::ffi::SQLITE_BUSY).is_client_error());
        assert!(!Error::Migration("newer".into()).is_client_error());
    }
}
