use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("run trace already stored: {0}")]
    DuplicateTrace(Uuid),

    #[error("memory record already stored: {0}")]
    DuplicateRecord(Uuid),

    #[error("stored row is corrupt: {0}")]
    Corrupt(String),

    #[error("memory store not available: {0}")]
    Unavailable(String),
}
