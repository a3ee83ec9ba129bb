//! Namespace repository and access grants.
//!
//! # Responsibility
//! - Create namespaces and record which users may read or write them.
//! - Answer access-level lookups for identification writes.
//!
//! # Invariants
//! - The creating user always holds `write` access.
//! - Granting access replaces any earlier grant for the same user.

use crate::model::user::UserContext;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Access level a user holds on one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NamespaceAccess {
    Read,
    Write,
}

impl NamespaceAccess {
    fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            _ => None,
        }
    }
}

/// Repository interface for namespaces.
pub trait NamespaceRepository {
    /// Creates one namespace owned by `user` and returns its id.
    fn create_namespace(&self, user: &UserContext, name: &str) -> RepoResult<i64>;
    fn grant_access(
        &self,
        namespace_id: i64,
        user_id: i64,
        access: NamespaceAccess,
    ) -> RepoResult<()>;
    /// Returns `None` when the user holds no grant.
    fn access_level(&self, namespace_id: i64, user_id: i64)
        -> RepoResult<Option<NamespaceAccess>>;
}

/// SQLite-backed namespace repository.
pub struct SqliteNamespaceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNamespaceRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NamespaceRepository for SqliteNamespaceRepository<'_> {
    fn create_namespace(&self, user: &UserContext, name: &str) -> RepoResult<i64> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(RepoError::InvalidData(
                "namespace name must not be blank".to_string(),
            ));
        }

        self.conn.execute(
            "INSERT INTO namespaces (name, created_by) VALUES (?1, ?2);",
            params![trimmed, user.user_id],
        )?;
        let namespace_id = self.conn.last_insert_rowid();
        self.grant_access(namespace_id, user.user_id, NamespaceAccess::Write)?;
        Ok(namespace_id)
    }

    fn grant_access(
        &self,
        namespace_id: i64,
        user_id: i64,
        access: NamespaceAccess,
    ) -> RepoResult<()> {
        if !namespace_exists(self.conn, namespace_id)? {
            return Err(RepoError::UnknownNamespace(namespace_id));
        }
        self.conn.execute(
            "INSERT INTO namespace_grants (namespace_id, user_id, access)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (namespace_id, user_id) DO UPDATE SET access = excluded.access;",
            params![namespace_id, user_id, access.as_str()],
        )?;
        Ok(())
    }

    fn access_level(
        &self,
        namespace_id: i64,
        user_id: i64,
    ) -> RepoResult<Option<NamespaceAccess>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT access FROM namespace_grants WHERE namespace_id = ?1 AND user_id = ?2;",
                params![namespace_id, user_id],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(text) => NamespaceAccess::parse(&text).map(Some).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid access value `{text}` in namespace_grants.access"
                ))
            }),
            None => Ok(None),
        }
    }
}

/// Fails unless `user` may write into `namespace_id`.
pub(crate) fn ensure_write_access(
    conn: &Connection,
    user: &UserContext,
    namespace_id: i64,
) -> RepoResult<()> {
    if !namespace_exists(conn, namespace_id)? {
        return Err(RepoError::UnknownNamespace(namespace_id));
    }
    let repo = SqliteNamespaceRepository { conn };
    match repo.access_level(namespace_id, user.user_id)? {
        Some(NamespaceAccess::Write) => Ok(()),
        _ => Err(RepoError::AccessDenied {
            namespace_id,
            user_id: user.user_id,
        }),
    }
}

fn namespace_exists(conn: &Connection, namespace_id: i64) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM namespaces WHERE id = ?1);",
        [namespace_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
