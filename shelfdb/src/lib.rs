pub mod backup;
pub mod document;
pub mod error;
pub mod lock;
pub mod schema;
pub mod store;

pub use document::{Document, Record};
pub use error::{Result, ShelfDbError};
pub use lock::FileLock;
pub use store::{generate_id, Store};
