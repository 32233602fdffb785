use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelfDbError {
    #[error("Schema validation failed: {0}")]
    Schema(String),

    #[error("Unable to acquire lock for {path} after {attempts} attempts")]
    LockTimeout { path: String, attempts: u32 },

    #[error("Record with id {id} not found in {collection}")]
    RecordNotFound { collection: String, id: String },

    #[error("Collection {0} not found")]
    CollectionNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ShelfDbError>;
