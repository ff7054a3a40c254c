//! Storage abstraction layer.
//!
//! - **traits**: the `NotebookStore` interface
//! - **types**: domain records, builders and filters
//! - **sqlite**: the SQLite implementation

pub mod sqlite;
pub mod traits;
pub mod types;

pub use sqlite::SqliteStore;
pub use traits::NotebookStore;
pub use types::*;
