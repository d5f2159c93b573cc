//! Bulk export/import of the catalog as CSV.
//!
//! # Responsibility
//! - Serialize every book to the interchange file and read it back.
//! - Keep row-level parse problems local to the row.
//!
//! # Invariants
//! - Header is always `id,title,author,year,genre,rating,notes`.
//! - An empty cell means the field is absent.
//! - A bad row is skipped and counted; it never aborts the batch.

use crate::repo::book_repo::RepoError;
use std::path::PathBuf;
use thiserror::Error;

mod csv_format;

pub use csv_format::{
    export_all, export_to_writer, import_all, import_from_reader, ImportReport, CSV_HEADER,
};

pub type InterchangeResult<T> = Result<T, InterchangeError>;

/// Failure that stops an export or import as a whole.
#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error("cannot access `{}`", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed csv")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Repo(#[from] RepoError),
}
