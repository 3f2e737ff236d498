//! Error type for the store layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying DuckDB error
    #[error("store error: {0}")]
    Database(#[from] duckdb::Error),

    /// Migration failed
    #[error("migration {name} failed: {error}")]
    MigrationFailed { name: String, error: String },

    /// IO error (including blocking-task join failures)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn migration_failed(name: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::MigrationFailed {
            name: name.into(),
            error: error.to_string(),
        }
    }
}
