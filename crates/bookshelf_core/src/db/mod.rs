//! SQLite storage backend for the catalog.
//!
//! # Responsibility
//! - Open and configure SQLite connections.
//! - Keep the `books` schema current through versioned migrations.
//! - Execute parameterized statements and surface faults with query context.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Statement values are always bound, never formatted into SQL text.

use rusqlite::params_from_iter;
use rusqlite::types::Value;
use std::path::PathBuf;
use thiserror::Error;

pub mod migrations;
mod open;

pub use migrations::ensure_schema;
pub use open::{open_db, open_db_in_memory};
pub use rusqlite::Connection;

pub type DbResult<T> = Result<T, DbError>;

/// Storage-level failure.
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    /// A statement failed; `sql` is the statement text, without bound values.
    #[error("query failed (sql: {sql})")]
    Query {
        sql: String,
        source: rusqlite::Error,
    },
    #[error("failed to prepare database location `{}`", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    fn query(sql: &str, source: rusqlite::Error) -> Self {
        Self::Query {
            sql: sql.trim().to_string(),
            source,
        }
    }
}

/// What [`run`] should hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Collect the full result set.
    Rows,
    /// Execute for side effects and report the affected row count.
    Affected,
}

/// Result of [`run`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Each row in select-list order.
    Rows(Vec<Vec<Value>>),
    Affected(usize),
}

impl QueryOutcome {
    /// Returns the rows, or an empty set for an `Affected` outcome.
    pub fn into_rows(self) -> Vec<Vec<Value>> {
        match self {
            Self::Rows(rows) => rows,
            Self::Affected(_) => Vec::new(),
        }
    }

    /// Returns the affected count, or `0` for a `Rows` outcome.
    pub fn affected(&self) -> usize {
        match self {
            Self::Rows(_) => 0,
            Self::Affected(count) => *count,
        }
    }
}

/// Executes one parameterized statement.
///
/// `params` are bound positionally to `?` placeholders in `sql`.
///
/// # Errors
/// - Returns `DbError::Query` carrying `sql` for any SQLite failure.
pub fn run(conn: &Connection, sql: &str, params: &[Value], mode: RunMode) -> DbResult<QueryOutcome> {
    let mut stmt = conn.prepare(sql).map_err(|err| DbError::query(sql, err))?;

    match mode {
        RunMode::Affected => {
            let changed = stmt
                .execute(params_from_iter(params.iter()))
                .map_err(|err| DbError::query(sql, err))?;
            Ok(QueryOutcome::Affected(changed))
        }
        RunMode::Rows => {
            let column_count = stmt.column_count();
            let mut rows = stmt
                .query(params_from_iter(params.iter()))
                .map_err(|err| DbError::query(sql, err))?;
            let mut collected = Vec::new();
            while let Some(row) = rows.next().map_err(|err| DbError::query(sql, err))? {
                let mut values = Vec::with_capacity(column_count);
                for index in 0..column_count {
                    values.push(
                        row.get::<_, Value>(index)
                            .map_err(|err| DbError::query(sql, err))?,
                    );
                }
                collected.push(values);
            }
            Ok(QueryOutcome::Rows(collected))
        }
    }
}
