//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and interchange calls into use-case level APIs.
//! - Keep adapters decoupled from storage details.

pub mod book_service;
