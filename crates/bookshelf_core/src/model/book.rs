//! Book domain model.
//!
//! # Responsibility
//! - Define the single catalog record and its partial-update shape.
//! - Own input validation shared by repository and adapters.
//!
//! # Invariants
//! - `id` is `None` until the record is persisted and never changes afterwards.
//! - Optional fields use `None` for absence, never an empty string. The
//!   repository stores `Some("")` and `Set("")` for text fields as NULL.
//! - `title` is never empty or whitespace-only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage-assigned book identifier.
pub type BookId = i64;

/// Lowest rating adapters accept.
pub const RATING_MIN: i64 = 1;
/// Highest rating adapters accept.
pub const RATING_MAX: i64 = 5;

/// Rejected caller input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("title is required")]
    EmptyTitle,
    #[error("field `{0}` is required and cannot be cleared")]
    RequiredFieldCleared(&'static str),
    #[error("unsupported sort field `{0}`; expected id|title|author|year|genre|rating")]
    UnsupportedSortField(String),
    #[error("limit must be a positive integer, got {0}")]
    InvalidLimit(u32),
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i64),
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// `None` for a record that has not been persisted yet.
    pub id: Option<BookId>,
    pub title: String,
    pub author: Option<String>,
    pub year: Option<i64>,
    pub genre: Option<String>,
    /// Conventionally 1-5; storage accepts any integer.
    pub rating: Option<i64>,
    pub notes: Option<String>,
}

impl Book {
    /// Creates an unpersisted book with only a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: None,
            year: None,
            genre: None,
            rating: None,
            notes: None,
        }
    }

    /// Checks the invariants required before persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)
    }

    /// Returns whether this record has been assigned a storage id.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// One field of a [`BookPatch`].
///
/// `Keep` and `Clear` are distinct so that "not provided" never collapses into
/// "remove the stored value".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    /// Leave the stored value untouched.
    #[default]
    Keep,
    /// Store NULL.
    Clear,
    /// Store the given value.
    Set(T),
}

impl<T> FieldUpdate<T> {
    /// Maps `None` to `Keep` and `Some(v)` to `Set(v)`.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Set(value),
            None => Self::Keep,
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

/// Partial field set for an update. Every field defaults to `Keep`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookPatch {
    pub title: FieldUpdate<String>,
    pub author: FieldUpdate<String>,
    pub year: FieldUpdate<i64>,
    pub genre: FieldUpdate<String>,
    pub rating: FieldUpdate<i64>,
    pub notes: FieldUpdate<String>,
}

impl BookPatch {
    /// Returns `true` when no field would be written.
    pub fn is_empty(&self) -> bool {
        self.title.is_keep()
            && self.author.is_keep()
            && self.year.is_keep()
            && self.genre.is_keep()
            && self.rating.is_keep()
            && self.notes.is_keep()
    }

    /// Rejects patches that would break the `title` invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.title {
            FieldUpdate::Keep => Ok(()),
            FieldUpdate::Clear => Err(ValidationError::RequiredFieldCleared("title")),
            FieldUpdate::Set(title) => validate_title(title),
        }
    }
}

/// Checks a rating against the 1-5 convention. Used by adapters; storage does
/// not enforce it.
pub fn validate_rating(rating: i64) -> Result<i64, ValidationError> {
    if (RATING_MIN..=RATING_MAX).contains(&rating) {
        Ok(rating)
    } else {
        Err(ValidationError::RatingOutOfRange(rating))
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        Err(ValidationError::EmptyTitle)
    } else {
        Ok(())
    }
}
