//! Repository layer: the collaborator stores a record is composed from.
//!
//! # Responsibility
//! - Define one data access contract per record section.
//! - Isolate SQLite query details from the composing service.
//!
//! # Invariants
//! - Stores never begin, commit or roll back. They run inside whatever
//!   transaction scope the caller opened on the shared connection.
//! - Stores only accept connections migrated to the latest schema.
//! - Repository APIs return semantic errors (`NotFound`, `AccessDenied`) in
//!   addition to DB transport errors.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::identification::{Status, UrnParseError};
use crate::model::record::RecordValidationError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod definition_repo;
pub mod element_repo;
pub mod identification_repo;
pub mod member_repo;
pub mod namespace_repo;
pub mod slot_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error shared by every registry store.
#[derive(Debug)]
pub enum RepoError {
    Validation(RecordValidationError),
    InvalidUrn(UrnParseError),
    Db(DbError),
    /// Target row does not exist. Carries a URN or row description.
    NotFound(String),
    /// User lacks write access to the namespace.
    AccessDenied {
        namespace_id: i64,
        user_id: i64,
    },
    UnknownNamespace(i64),
    /// Requested status would move an identification backwards.
    InvalidStatusTransition {
        from: Status,
        to: Status,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid model value.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidUrn(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::AccessDenied {
                namespace_id,
                user_id,
            } => write!(
                f,
                "user {user_id} has no write access to namespace {namespace_id}"
            ),
            Self::UnknownNamespace(id) => write!(f, "namespace does not exist: {id}"),
            Self::InvalidStatusTransition { from, to } => write!(
                f,
                "status cannot move from `{}` to `{}`",
                from.as_str(),
                to.as_str()
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "registry repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted registry data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::InvalidUrn(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RecordValidationError> for RepoError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<UrnParseError> for RepoError {
    fn from(value: UrnParseError) -> Self {
        Self::InvalidUrn(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Rejects connections that have not been opened through `db::open_*`.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}

pub(crate) fn position_to_db(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}
