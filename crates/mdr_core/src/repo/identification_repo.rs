//! Identification repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Parse URNs and look up the identification rows they name.
//! - Allocate identifiers and versions for new identification rows.
//! - Apply forward-only status changes in place.
//!
//! # Invariants
//! - Every write checks namespace write access first.
//! - Identifiers come from `identifier_sequences` and are never reused in a
//!   namespace, even after the row holding them is deleted.
//! - A new version keeps namespace and identifier and bumps version by one.

use crate::model::element::{ElementId, ElementType};
use crate::model::identification::{
    Identification, IdentificationId, Status, StoredIdentification,
};
use crate::model::user::UserContext;
use crate::repo::namespace_repo::ensure_write_access;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const IDENTIFICATION_SELECT_SQL: &str = "SELECT
    id,
    element_id,
    namespace_id,
    element_type,
    identifier,
    version,
    status
FROM identifications";

/// Repository interface for identification rows.
pub trait IdentificationRepository {
    /// Parses a URN without touching storage.
    fn parse(&self, urn: &str) -> RepoResult<Identification>;
    /// Loads the stored row named by namespace, type, identifier and version.
    fn get(&self, identification: &Identification) -> RepoResult<Option<StoredIdentification>>;
    /// Creates version 1 of a new identifier owned by `element_id`.
    fn create(
        &self,
        user: &UserContext,
        identification: &Identification,
        element_id: ElementId,
    ) -> RepoResult<StoredIdentification>;
    /// Creates the next version of `previous` owned by `element_id`.
    fn create_version(
        &self,
        user: &UserContext,
        identification: &Identification,
        element_id: ElementId,
        previous: &Identification,
    ) -> RepoResult<StoredIdentification>;
    /// Updates the row owned by `element_id` in place.
    fn update(
        &self,
        user: &UserContext,
        identification: &Identification,
        element_id: ElementId,
    ) -> RepoResult<StoredIdentification>;
    fn delete(&self, id: IdentificationId) -> RepoResult<()>;
}

/// SQLite-backed identification repository.
pub struct SqliteIdentificationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteIdentificationRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn insert(
        &self,
        user: &UserContext,
        identification: Identification,
        element_id: ElementId,
    ) -> RepoResult<StoredIdentification> {
        self.conn.execute(
            "INSERT INTO identifications (
                element_id,
                namespace_id,
                element_type,
                identifier,
                version,
                status,
                created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                element_id.0,
                identification.namespace_id,
                identification.element_type.as_str(),
                identification.identifier,
                identification.version,
                identification.status.as_str(),
                user.user_id,
            ],
        )?;

        Ok(StoredIdentification {
            id: IdentificationId(self.conn.last_insert_rowid()),
            element_id,
            identification,
        })
    }

    fn get_by_element(&self, element_id: ElementId) -> RepoResult<Option<StoredIdentification>> {
        self.conn
            .query_row(
                &format!("{IDENTIFICATION_SELECT_SQL} WHERE element_id = ?1;"),
                [element_id.0],
                |row| Ok(parse_identification_row(row)),
            )
            .optional()?
            .transpose()
    }
}

impl IdentificationRepository for SqliteIdentificationRepository<'_> {
    fn parse(&self, urn: &str) -> RepoResult<Identification> {
        Identification::parse_urn(urn).map_err(Into::into)
    }

    fn get(&self, identification: &Identification) -> RepoResult<Option<StoredIdentification>> {
        let (Some(identifier), Some(version)) = (identification.identifier, identification.version)
        else {
            return Ok(None);
        };

        self.conn
            .query_row(
                &format!(
                    "{IDENTIFICATION_SELECT_SQL}
                     WHERE namespace_id = ?1
                       AND element_type = ?2
                       AND identifier = ?3
                       AND version = ?4;"
                ),
                params![
                    identification.namespace_id,
                    identification.element_type.as_str(),
                    identifier,
                    version,
                ],
                |row| Ok(parse_identification_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn create(
        &self,
        user: &UserContext,
        identification: &Identification,
        element_id: ElementId,
    ) -> RepoResult<StoredIdentification> {
        ensure_write_access(self.conn, user, identification.namespace_id)?;
        let identifier = next_identifier(
            self.conn,
            identification.namespace_id,
            identification.element_type,
        )?;

        self.insert(
            user,
            Identification {
                identifier: Some(identifier),
                version: Some(1),
                ..identification.clone()
            },
            element_id,
        )
    }

    fn create_version(
        &self,
        user: &UserContext,
        identification: &Identification,
        element_id: ElementId,
        previous: &Identification,
    ) -> RepoResult<StoredIdentification> {
        ensure_write_access(self.conn, user, previous.namespace_id)?;
        let (Some(identifier), Some(version)) = (previous.identifier, previous.version) else {
            return Err(RepoError::InvalidData(
                "previous identification has no identifier/version".to_string(),
            ));
        };

        self.insert(
            user,
            Identification {
                namespace_id: previous.namespace_id,
                element_type: previous.element_type,
                identifier: Some(identifier),
                version: Some(version.saturating_add(1)),
                status: identification.status,
            },
            element_id,
        )
    }

    fn update(
        &self,
        user: &UserContext,
        identification: &Identification,
        element_id: ElementId,
    ) -> RepoResult<StoredIdentification> {
        let current = self
            .get_by_element(element_id)?
            .ok_or_else(|| RepoError::NotFound(format!("identification of element {element_id}")))?;
        ensure_write_access(self.conn, user, current.identification.namespace_id)?;

        let from = current.identification.status;
        let to = identification.status;
        if !from.can_transition_to(to) {
            return Err(RepoError::InvalidStatusTransition { from, to });
        }

        self.conn.execute(
            "UPDATE identifications
             SET status = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![current.id.0, to.as_str()],
        )?;

        Ok(StoredIdentification {
            identification: Identification {
                status: to,
                ..current.identification
            },
            ..current
        })
    }

    fn delete(&self, id: IdentificationId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM identifications WHERE id = ?1;", [id.0])?;
        if changed == 0 {
            return Err(RepoError::NotFound(format!("identification {}", id.0)));
        }
        Ok(())
    }
}

fn next_identifier(
    conn: &Connection,
    namespace_id: i64,
    element_type: ElementType,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO identifier_sequences (namespace_id, element_type, last_identifier)
         VALUES (?1, ?2, 1)
         ON CONFLICT (namespace_id, element_type)
         DO UPDATE SET last_identifier = last_identifier + 1;",
        params![namespace_id, element_type.as_str()],
    )?;
    let identifier = conn.query_row(
        "SELECT last_identifier
         FROM identifier_sequences
         WHERE namespace_id = ?1 AND element_type = ?2;",
        params![namespace_id, element_type.as_str()],
        |row| row.get(0),
    )?;
    Ok(identifier)
}

fn parse_identification_row(row: &Row<'_>) -> RepoResult<StoredIdentification> {
    let type_text: String = row.get("element_type")?;
    let element_type = ElementType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid element type `{type_text}` in identifications.element_type"
        ))
    })?;

    let status_text: String = row.get("status")?;
    let status = Status::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in identifications.status"
        ))
    })?;

    Ok(StoredIdentification {
        id: IdentificationId(row.get("id")?),
        element_id: ElementId(row.get("element_id")?),
        identification: Identification {
            namespace_id: row.get("namespace_id")?,
            element_type,
            identifier: Some(row.get("identifier")?),
            version: Some(row.get("version")?),
            status,
        },
    })
}
