//! Registry domain model.
//!
//! # Responsibility
//! - Define elements, versioned identifications and the record aggregate.
//! - Keep URN rendering/parsing and status ordering next to the data.
//!
//! # Invariants
//! - Every registry entity has exactly one `Element` row with a stable uuid.
//! - An identification's status only moves forward within one version.

pub mod element;
pub mod identification;
pub mod record;
pub mod user;
