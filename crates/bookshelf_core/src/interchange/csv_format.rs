//! CSV reader/writer for the interchange file.
//!
//! Rows are positional: `id` is written on export and ignored on import.

use super::{InterchangeError, InterchangeResult};
use crate::model::book::Book;
use crate::repo::book_repo::{BookListQuery, BookRepository, RepoError};
use csv::StringRecord;
use log::{info, warn};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Column names written as the first row of every export.
pub const CSV_HEADER: [&str; 7] = ["id", "title", "author", "year", "genre", "rating", "notes"];

const TITLE_COL: usize = 1;
const AUTHOR_COL: usize = 2;
const YEAR_COL: usize = 3;
const GENRE_COL: usize = 4;
const RATING_COL: usize = 5;
const NOTES_COL: usize = 6;

/// Outcome of an import batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Rows that produced a new book.
    pub imported: usize,
    /// Rows dropped for a missing title or an undecodable record.
    pub skipped: usize,
}

/// Exports every book, in default list order, to `path`.
///
/// Returns the number of books written.
pub fn export_all<R>(repo: &R, path: impl AsRef<Path>) -> InterchangeResult<usize>
where
    R: BookRepository + ?Sized,
{
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| InterchangeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let count = export_to_writer(repo, BufWriter::new(file))?;
    info!("event=csv_export module=interchange status=ok rows={count}");
    Ok(count)
}

/// Same as [`export_all`] over an arbitrary writer.
pub fn export_to_writer<R, W>(repo: &R, writer: W) -> InterchangeResult<usize>
where
    R: BookRepository + ?Sized,
    W: Write,
{
    let books = repo.list_books(&BookListQuery::default())?;
    let mut out = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    out.write_record(CSV_HEADER)?;
    for book in &books {
        out.write_record([
            book.id.map(|id| id.to_string()).unwrap_or_default(),
            book.title.clone(),
            book.author.clone().unwrap_or_default(),
            book.year.map(|year| year.to_string()).unwrap_or_default(),
            book.genre.clone().unwrap_or_default(),
            book.rating.map(|rating| rating.to_string()).unwrap_or_default(),
            book.notes.clone().unwrap_or_default(),
        ])?;
    }
    out.flush().map_err(csv::Error::from)?;

    Ok(books.len())
}

/// Imports books from the CSV file at `path`.
///
/// When `skip_header` is set the first record is discarded unread.
pub fn import_all<R>(
    repo: &R,
    path: impl AsRef<Path>,
    skip_header: bool,
) -> InterchangeResult<ImportReport>
where
    R: BookRepository + ?Sized,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| InterchangeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let report = import_from_reader(repo, BufReader::new(file), skip_header)?;
    info!(
        "event=csv_import module=interchange status=ok imported={} skipped={}",
        report.imported, report.skipped
    );
    Ok(report)
}

/// Same as [`import_all`] over an arbitrary reader.
///
/// # Errors
/// - I/O failures of the underlying reader.
/// - Storage failures while creating a book. Row-level problems are counted
///   in [`ImportReport::skipped`] instead.
pub fn import_from_reader<R, Rd>(
    repo: &R,
    reader: Rd,
    skip_header: bool,
) -> InterchangeResult<ImportReport>
where
    R: BookRepository + ?Sized,
    Rd: Read,
{
    let mut rows = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut report = ImportReport::default();

    for (index, result) in rows.records().enumerate() {
        if index == 0 && skip_header {
            continue;
        }

        let record = match result {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                let line = err.position().map_or(index as u64 + 1, |pos| pos.line());
                warn!(
                    "event=csv_import_row module=interchange status=skipped line={line} reason=malformed_record"
                );
                report.skipped += 1;
                continue;
            }
        };
        let line = record.position().map_or(index as u64 + 1, |pos| pos.line());

        let Some(book) = book_from_record(&record) else {
            warn!(
                "event=csv_import_row module=interchange status=skipped line={line} reason=missing_title"
            );
            report.skipped += 1;
            continue;
        };

        match repo.create_book(&book) {
            Ok(_) => report.imported += 1,
            Err(RepoError::Validation(err)) => {
                warn!(
                    "event=csv_import_row module=interchange status=skipped line={line} reason=invalid error={err}"
                );
                report.skipped += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(report)
}

fn book_from_record(record: &StringRecord) -> Option<Book> {
    let title = record.get(TITLE_COL)?;
    if title.trim().is_empty() {
        return None;
    }

    Some(Book {
        id: None,
        title: title.to_string(),
        author: text_cell(record, AUTHOR_COL),
        year: integer_cell(record, YEAR_COL),
        genre: text_cell(record, GENRE_COL),
        rating: integer_cell(record, RATING_COL),
        notes: text_cell(record, NOTES_COL),
    })
}

fn text_cell(record: &StringRecord, index: usize) -> Option<String> {
    record
        .get(index)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
}

/// Accepts only plain non-negative digit strings; anything else is absent.
fn integer_cell(record: &StringRecord, index: usize) -> Option<i64> {
    record
        .get(index)
        .filter(|cell| !cell.is_empty() && cell.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|cell| cell.parse().ok())
}
