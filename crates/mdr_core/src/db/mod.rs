//! SQLite storage bootstrap, schema migrations and transaction scopes.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the registry core.
//! - Apply schema migrations in deterministic order.
//! - Provide the explicit transaction handle used by write orchestration.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Registry data must not be read or written before migrations succeed.
//! - Only the orchestrating service begins, commits or rolls back; stores
//!   run inside whatever scope they are handed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod tx;

pub use open::{open_db, open_db_in_memory};
pub use tx::{ScopeKind, TransactionMode, TxScope};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "registry schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
