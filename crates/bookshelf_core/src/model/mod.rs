//! Catalog domain model.
//!
//! # Invariants
//! - `Book` is the only persisted entity.
//! - Deletion is a hard delete; there are no tombstones.

pub mod book;
