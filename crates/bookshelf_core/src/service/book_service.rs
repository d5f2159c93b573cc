//! Book use-case service.
//!
//! # Responsibility
//! - Provide stable catalog entry points for adapters.
//! - Delegate persistence to repository implementations and bulk transfer to
//!   the interchange module.
//!
//! # Invariants
//! - Service APIs never bypass repository validation.
//! - Service layer remains storage-agnostic.

use crate::interchange::{self, ImportReport, InterchangeResult};
use crate::model::book::{Book, BookId, BookPatch};
use crate::repo::book_repo::{
    BookListQuery, BookRepository, RepoResult, SearchField, UpdateOutcome,
};
use crate::stats::{CatalogStats, StatsResult};
use std::path::Path;

/// Use-case service wrapper over a [`BookRepository`].
pub struct BookService<R: BookRepository> {
    repo: R,
}

impl<R: BookRepository> BookService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Persists a new book and returns its assigned id.
    pub fn add_book(&self, book: &Book) -> RepoResult<BookId> {
        self.repo.create_book(book)
    }

    /// Gets one book, `None` when the id is unknown.
    pub fn get_book(&self, id: BookId) -> RepoResult<Option<Book>> {
        self.repo.get_book(id)
    }

    pub fn list_books(&self, query: &BookListQuery) -> RepoResult<Vec<Book>> {
        self.repo.list_books(query)
    }

    /// Substring search over one field, or title/author/genre when `field`
    /// is `None`.
    pub fn search_books(&self, keyword: &str, field: Option<SearchField>) -> RepoResult<Vec<Book>> {
        self.repo.search_books(keyword, field)
    }

    /// Applies a partial update.
    ///
    /// Returns `NothingToUpdate` without touching storage for an empty patch.
    pub fn edit_book(&self, id: BookId, patch: &BookPatch) -> RepoResult<UpdateOutcome> {
        self.repo.update_book(id, patch)
    }

    /// Hard-deletes a book. Returns whether a row existed.
    pub fn remove_book(&self, id: BookId) -> RepoResult<bool> {
        self.repo.delete_book(id)
    }

    /// Writes the whole catalog to a CSV file.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> InterchangeResult<usize> {
        interchange::export_all(&self.repo, path)
    }

    /// Reads books from a CSV file, creating one record per usable row.
    pub fn import_csv(
        &self,
        path: impl AsRef<Path>,
        skip_header: bool,
    ) -> InterchangeResult<ImportReport> {
        interchange::import_all(&self.repo, path, skip_header)
    }

    /// Catalog-wide statistics.
    pub fn summarize(&self) -> StatsResult<CatalogStats> {
        self.repo.catalog_stats()
    }
}
