//! Core registry logic for versioned metadata records.
//! This crate is the single source of truth for record invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ComposerConfig, UpdatePolicy};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::element::{Element, ElementId, ElementType};
pub use model::identification::{
    Identification, IdentificationId, Status, StoredIdentification, UrnParseError,
};
pub use model::record::{Definition, Member, Record, RecordValidationError, Slot, StoredRecord};
pub use model::user::UserContext;
pub use repo::element_repo::{ElementRepository, ResolvedElement, SqliteElementRepository};
pub use repo::identification_repo::{IdentificationRepository, SqliteIdentificationRepository};
pub use repo::namespace_repo::{NamespaceAccess, NamespaceRepository, SqliteNamespaceRepository};
pub use repo::{RepoError, RepoResult};
pub use service::record_composer::{ErrorKind, RecordComposer, RecordError, RecordResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
