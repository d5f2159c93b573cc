//! Book repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide typed CRUD, listing, and search over the `books` table.
//! - Translate partial updates into single `UPDATE` statements.
//!
//! # Invariants
//! - Statement text only ever embeds identifiers from the fixed allow-lists in
//!   this module (`SortField`, `SearchField`, patch columns). Values are bound.
//! - Write paths validate input before touching storage.
//! - Optional text is written as NULL when empty, on insert and update alike.
//! - `delete_book` is idempotent; `get_book` reports absence as `None`.

use crate::db::migrations::latest_version;
use crate::db::{run, DbError, RunMode};
use crate::model::book::{Book, BookId, BookPatch, FieldUpdate, ValidationError};
use crate::stats::{self, CatalogStats, StatsResult};
use log::debug;
use rusqlite::types::Value;
use rusqlite::Connection;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

const BOOKS_TABLE: &str = "books";
const BOOK_COLUMNS: [&str; 7] = ["id", "title", "author", "year", "genre", "rating", "notes"];
const BOOK_SELECT_SQL: &str = "SELECT id, title, author, year, genre, rating, notes FROM books";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for book persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("book not found: {0}")]
    NotFound(BookId),
    #[error("invalid persisted book data: {0}")]
    InvalidData(String),
    #[error(
        "connection schema version {actual_version} does not match expected {expected_version}"
    )]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),
    #[error("required column `{table}.{column}` is missing")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Columns a listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Id,
    Title,
    Author,
    Year,
    Genre,
    Rating,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        Self::Id,
        Self::Title,
        Self::Author,
        Self::Year,
        Self::Genre,
        Self::Rating,
    ];

    /// SQL column identifier.
    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Author => "author",
            Self::Year => "year",
            Self::Genre => "genre",
            Self::Rating => "rating",
        }
    }
}

impl FromStr for SortField {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|field| field.column() == normalized)
            .ok_or_else(|| ValidationError::UnsupportedSortField(value.trim().to_string()))
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Columns a search may be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Author,
    Genre,
}

impl SearchField {
    pub const ALL: [SearchField; 3] = [Self::Title, Self::Author, Self::Genre];

    pub fn column(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Genre => "genre",
        }
    }

    /// Resolves a user-supplied field name.
    ///
    /// Unknown names yield `None`, which callers treat as "search every field".
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|field| field.column() == normalized)
    }
}

/// Query options for listing books.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookListQuery {
    /// Defaults to `SortField::Id`.
    pub sort_by: Option<SortField>,
    pub descending: bool,
    /// Must be positive when set.
    pub limit: Option<u32>,
}

/// Result of a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// The patch carried no field changes; nothing was written.
    NothingToUpdate,
}

/// Repository interface for book CRUD and query operations.
pub trait BookRepository {
    fn create_book(&self, book: &Book) -> RepoResult<BookId>;
    fn get_book(&self, id: BookId) -> RepoResult<Option<Book>>;
    fn list_books(&self, query: &BookListQuery) -> RepoResult<Vec<Book>>;
    fn search_books(&self, keyword: &str, field: Option<SearchField>) -> RepoResult<Vec<Book>>;
    fn update_book(&self, id: BookId, patch: &BookPatch) -> RepoResult<UpdateOutcome>;
    /// Returns whether a row was removed. Missing ids are not an error.
    fn delete_book(&self, id: BookId) -> RepoResult<bool>;
    /// Totals, average rating, and per-genre counts over the whole catalog.
    fn catalog_stats(&self) -> StatsResult<CatalogStats>;
}

/// SQLite-backed book repository.
pub struct SqliteBookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookRepository<'conn> {
    /// Wraps a connection whose schema has already been brought up to date.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `user_version` is not the latest.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the table shape
    ///   does not match.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_books(&self, sql: &str, binds: &[Value]) -> RepoResult<Vec<Book>> {
        run(self.conn, sql, binds, RunMode::Rows)?
            .into_rows()
            .into_iter()
            .map(parse_book_values)
            .collect()
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn create_book(&self, book: &Book) -> RepoResult<BookId> {
        book.validate()?;

        run(
            self.conn,
            "INSERT INTO books (title, author, year, genre, rating, notes)
             VALUES (?, ?, ?, ?, ?, ?);",
            &[
                Value::Text(book.title.clone()),
                optional_text(book.author.as_deref()),
                optional_integer(book.year),
                optional_text(book.genre.as_deref()),
                optional_integer(book.rating),
                optional_text(book.notes.as_deref()),
            ],
            RunMode::Affected,
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("event=book_create module=repo status=ok book_id={id}");
        Ok(id)
    }

    fn get_book(&self, id: BookId) -> RepoResult<Option<Book>> {
        let sql = format!("{BOOK_SELECT_SQL} WHERE id = ?;");
        Ok(self
            .query_books(&sql, &[Value::Integer(id)])?
            .into_iter()
            .next())
    }

    fn list_books(&self, query: &BookListQuery) -> RepoResult<Vec<Book>> {
        if let Some(0) = query.limit {
            return Err(ValidationError::InvalidLimit(0).into());
        }

        let sort = query.sort_by.unwrap_or_default();
        let direction = if query.descending { "DESC" } else { "ASC" };
        let mut sql = format!("{BOOK_SELECT_SQL} ORDER BY {} {direction}", sort.column());
        if sort != SortField::Id {
            sql.push_str(", id ASC");
        }

        let mut binds = Vec::new();
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            binds.push(Value::Integer(i64::from(limit)));
        }

        self.query_books(&sql, &binds)
    }

    fn search_books(&self, keyword: &str, field: Option<SearchField>) -> RepoResult<Vec<Book>> {
        let predicate = match field {
            Some(field) => format!("{} LIKE ?1 ESCAPE '\\'", field.column()),
            None => SearchField::ALL
                .iter()
                .map(|field| format!("{} LIKE ?1 ESCAPE '\\'", field.column()))
                .collect::<Vec<_>>()
                .join(" OR "),
        };
        let sql = format!("{BOOK_SELECT_SQL} WHERE {predicate} ORDER BY id ASC;");

        let books = self.query_books(&sql, &[Value::Text(like_pattern(keyword))])?;
        debug!(
            "event=book_search module=repo status=ok field={} hits={}",
            field.map_or("all", SearchField::column),
            books.len()
        );
        Ok(books)
    }

    fn update_book(&self, id: BookId, patch: &BookPatch) -> RepoResult<UpdateOutcome> {
        if patch.is_empty() {
            debug!("event=book_update module=repo status=skipped book_id={id} reason=empty_patch");
            return Ok(UpdateOutcome::NothingToUpdate);
        }
        patch.validate()?;

        let mut assignments = Assignments::default();
        assignments.push("title", &patch.title, |v| Value::Text(v.clone()));
        assignments.push("author", &patch.author, |v| optional_text(Some(v.as_str())));
        assignments.push("year", &patch.year, |v| Value::Integer(*v));
        assignments.push("genre", &patch.genre, |v| optional_text(Some(v.as_str())));
        assignments.push("rating", &patch.rating, |v| Value::Integer(*v));
        assignments.push("notes", &patch.notes, |v| optional_text(Some(v.as_str())));

        let sql = format!("UPDATE books SET {} WHERE id = ?;", assignments.set_clause());
        let mut binds = assignments.values;
        binds.push(Value::Integer(id));

        let changed = run(self.conn, &sql, &binds, RunMode::Affected)?.affected();
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        debug!(
            "event=book_update module=repo status=ok book_id={id} fields={}",
            assignments.columns.join(",")
        );
        Ok(UpdateOutcome::Updated)
    }

    fn delete_book(&self, id: BookId) -> RepoResult<bool> {
        let changed = run(
            self.conn,
            "DELETE FROM books WHERE id = ?;",
            &[Value::Integer(id)],
            RunMode::Affected,
        )?
        .affected();

        debug!(
            "event=book_delete module=repo status=ok book_id={id} removed={}",
            changed > 0
        );
        Ok(changed > 0)
    }

    fn catalog_stats(&self) -> StatsResult<CatalogStats> {
        stats::summarize(self.conn)
    }
}

/// `SET` clause under construction. Column names come from string literals in
/// `update_book` only.
#[derive(Default)]
struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Value>,
}

impl Assignments {
    fn push<T>(
        &mut self,
        column: &'static str,
        update: &FieldUpdate<T>,
        to_value: impl FnOnce(&T) -> Value,
    ) {
        let value = match update {
            FieldUpdate::Keep => return,
            FieldUpdate::Clear => Value::Null,
            FieldUpdate::Set(value) => to_value(value),
        };
        self.columns.push(column);
        self.values.push(value);
    }

    fn set_clause(&self) -> String {
        self.columns
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Wraps `keyword` in `%` wildcards, escaping LIKE metacharacters so the
/// keyword itself matches literally.
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for ch in keyword.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

fn parse_book_values(values: Vec<Value>) -> RepoResult<Book> {
    let [id, title, author, year, genre, rating, notes]: [Value; 7] =
        values.try_into().map_err(|values: Vec<Value>| {
            RepoError::InvalidData(format!(
                "expected {} columns in books row, got {}",
                BOOK_COLUMNS.len(),
                values.len()
            ))
        })?;

    Ok(Book {
        id: Some(read_integer(id, "id")?.ok_or_else(|| null_column("id"))?),
        title: read_text(title, "title")?.ok_or_else(|| null_column("title"))?,
        author: read_text(author, "author")?,
        year: read_integer(year, "year")?,
        genre: read_text(genre, "genre")?,
        rating: read_integer(rating, "rating")?,
        notes: read_text(notes, "notes")?,
    })
}

fn read_integer(value: Value, column: &str) -> RepoResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(number) => Ok(Some(number)),
        other => Err(RepoError::InvalidData(format!(
            "unexpected {} value in books.{column}",
            other.data_type()
        ))),
    }
}

fn read_text(value: Value, column: &str) -> RepoResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(RepoError::InvalidData(format!(
            "unexpected {} value in books.{column}",
            other.data_type()
        ))),
    }
}

fn null_column(column: &str) -> RepoError {
    RepoError::InvalidData(format!("books.{column} is NULL"))
}

/// Empty text is stored as NULL so absence has a single representation.
fn optional_text(value: Option<&str>) -> Value {
    match value {
        Some(text) if !text.is_empty() => Value::Text(text.to_string()),
        _ => Value::Null,
    }
}

fn optional_integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, BOOKS_TABLE)? {
        return Err(RepoError::MissingRequiredTable(BOOKS_TABLE));
    }

    let present = table_columns(conn, BOOKS_TABLE)?;
    for column in BOOK_COLUMNS {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: BOOKS_TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &'static str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}
