//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into record-level operations.
//! - Own transaction boundaries; repositories never commit on their own.

pub mod record_composer;
pub mod versioning;
