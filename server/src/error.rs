//! Storage error type.
//!
//! `NotFound` gets its own variant because the API layer turns it into a 404;
//! everything else is a storage failure and surfaces as a 500.

use thiserror::Error;

/// Errors returned by `Database` and `TodoStore` operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` rejected a statement or could not be opened.
    #[error("sqlite error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection could be checked out.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// No todo exists with this id.
    #[error("todo not found: {0}")]
    NotFound(i64),

    /// A stored value could not be decoded.
    #[error("corrupt row in {table}.{column}: {detail}")]
    CorruptRow {
        table: &'static str,
        column: &'static str,
        detail: String,
    },

    /// A schema migration failed.
    #[error("migration error: {message}")]
    Migration { message: String },

    /// The database has not been migrated to the version this build expects.
    #[error("database schema is at version {found}, expected {expected}; run `todo-server migrate`")]
    SchemaOutOfDate { found: u32, expected: u32 },
}

pub type Result<T> = std::result::Result<T, StoreError>;
