//! Aggregate read-only queries over the catalog.
//!
//! # Invariants
//! - `average_rating` ignores unrated books and is `None` when none are rated.
//! - `per_genre` is ordered by count descending, then genre ascending, with the
//!   absent genre kept as `None` rather than a display label.

use crate::db::{run, DbError, RunMode};
use log::debug;
use rusqlite::types::Value;
use rusqlite::Connection;
use thiserror::Error;

pub type StatsResult<T> = Result<T, StatsError>;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("invalid aggregate row: {0}")]
    InvalidData(String),
}

/// Book count for one genre value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreCount {
    /// `None` groups every book without a genre.
    pub genre: Option<String>,
    pub count: u64,
}

/// Catalog-wide summary.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogStats {
    pub total: u64,
    /// Mean rating rounded to two decimals.
    pub average_rating: Option<f64>,
    pub per_genre: Vec<GenreCount>,
}

/// Computes catalog totals, average rating, and per-genre counts.
pub fn summarize(conn: &Connection) -> StatsResult<CatalogStats> {
    let total = single_value(conn, "SELECT COUNT(*) FROM books;")
        .and_then(|value| read_count(value, "total"))?;

    let average_rating = match single_value(
        conn,
        "SELECT AVG(rating) FROM books WHERE rating IS NOT NULL;",
    )? {
        Value::Null => None,
        Value::Real(mean) => Some(round_to_hundredths(mean)),
        Value::Integer(mean) => Some(mean as f64),
        other => {
            return Err(StatsError::InvalidData(format!(
                "unexpected {} for average rating",
                other.data_type()
            )))
        }
    };

    let per_genre = run(
        conn,
        "SELECT genre, COUNT(*) AS book_count
         FROM books
         GROUP BY genre
         ORDER BY book_count DESC, genre ASC;",
        &[],
        RunMode::Rows,
    )?
    .into_rows()
    .into_iter()
    .map(parse_genre_row)
    .collect::<StatsResult<Vec<_>>>()?;

    debug!(
        "event=catalog_stats module=stats status=ok total={total} genres={}",
        per_genre.len()
    );

    Ok(CatalogStats {
        total,
        average_rating,
        per_genre,
    })
}

fn single_value(conn: &Connection, sql: &str) -> StatsResult<Value> {
    run(conn, sql, &[], RunMode::Rows)?
        .into_rows()
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next())
        .ok_or_else(|| StatsError::InvalidData(format!("no value returned by `{sql}`")))
}

fn parse_genre_row(row: Vec<Value>) -> StatsResult<GenreCount> {
    let [genre, count]: [Value; 2] = row.try_into().map_err(|row: Vec<Value>| {
        StatsError::InvalidData(format!("expected 2 columns in genre row, got {}", row.len()))
    })?;

    let genre = match genre {
        Value::Null => None,
        Value::Text(text) => Some(text),
        other => {
            return Err(StatsError::InvalidData(format!(
                "unexpected {} in books.genre",
                other.data_type()
            )))
        }
    };

    Ok(GenreCount {
        genre,
        count: read_count(count, "genre count")?,
    })
}

fn read_count(value: Value, label: &str) -> StatsResult<u64> {
    match value {
        Value::Integer(count) => u64::try_from(count)
            .map_err(|_| StatsError::InvalidData(format!("negative {label}: {count}"))),
        other => Err(StatsError::InvalidData(format!(
            "unexpected {} for {label}",
            other.data_type()
        ))),
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
