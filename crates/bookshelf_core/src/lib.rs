//! Core catalog logic for Bookshelf.
//! This crate is the single source of truth for book-record invariants.

pub mod config;
pub mod db;
pub mod interchange;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod stats;

pub use config::{CatalogConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use interchange::{ImportReport, InterchangeError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::book::{
    validate_rating, Book, BookId, BookPatch, FieldUpdate, ValidationError,
};
pub use repo::book_repo::{
    BookListQuery, BookRepository, RepoError, RepoResult, SearchField, SortField,
    SqliteBookRepository, UpdateOutcome,
};
pub use service::book_service::BookService;
pub use stats::{summarize, CatalogStats, GenreCount, StatsError, StatsResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
