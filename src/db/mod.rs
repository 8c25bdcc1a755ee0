pub mod document;
pub mod filter;
pub mod sqlite;

pub use document::{Collection, Document, DocumentStore};
pub use filter::{Filter, FilterError, FindOptions, Projection, UpdateSpec};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Store connection lock poisoned")]
    LockPoisoned,

    #[error("Stored document is not a JSON object: {0}")]
    Corrupt(String),

    #[error(transparent)]
    InvalidFilter(#[from] FilterError),
}
