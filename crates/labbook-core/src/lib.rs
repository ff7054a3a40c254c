//! # Labbook Core
//!
//! Core library for Labbook - a laboratory notebook that keeps projects,
//! experiments, versioned journal entries, attachments, imported datasets
//! and derived charts, and assembles them into exportable reports.
//!
//! This crate provides the domain logic, storage abstractions, and data models
//! independent of the CLI interface.
//!
//! ## Architecture
//!
//! - **storage**: `NotebookStore` trait, domain types, SQLite implementation
//! - **audit**: append-only audit recorder shared by every mutation
//! - **attachment**: upload rules (allowed extensions, size ceilings, digests)
//! - **tabular**: CSV/XLSX parsing and per-column profiling
//! - **chart**: chart kinds and the `ChartRenderer` seam
//! - **report**: report assembly (DOCX, XLSX, HTML) and experiment bundles
//! - **search**: read-only filters over projects, experiments and entries
//! - **notebook**: the service that binds the store to the on-disk blob layout

pub mod attachment;
pub mod audit;
pub mod chart;
pub mod error;
pub mod fs;
pub mod layout;
pub mod notebook;
pub mod report;
pub mod search;
pub mod storage;
pub mod tabular;

pub use error::{ErrorKind, LabbookError, Result};
pub use notebook::Notebook;
pub use storage::{NotebookStore, SqliteStore};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
