//! Element repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create, load and delete the element rows every registry entity owns.
//! - Resolve member URNs to the elements they name.
//!
//! # Invariants
//! - The uuid written is the one carried by the `Element` value; storage
//!   never generates or rewrites it.
//! - URN resolution returns each element at most once, in request order.
//! - Resolved URNs are canonical: spelling variants of one URN collapse into
//!   a single entry.

use crate::model::element::{Element, ElementId, ElementType};
use crate::model::identification::Identification;
use crate::model::user::UserContext;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use uuid::Uuid;

/// Element found for one requested URN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    pub urn: String,
    pub element: Element,
}

impl ResolvedElement {
    pub fn element_id(&self) -> RepoResult<ElementId> {
        self.element
            .id
            .ok_or_else(|| RepoError::InvalidData(format!("resolved `{}` has no id", self.urn)))
    }
}

/// Repository interface for element rows.
pub trait ElementRepository {
    /// Resolves URNs to existing elements; unknown or malformed URNs are
    /// left out of the result.
    fn resolve_by_urns(
        &self,
        user: &UserContext,
        urns: &[String],
    ) -> RepoResult<Vec<ResolvedElement>>;
    /// Inserts one element row and returns its surrogate id.
    fn create_element(&self, element: &Element) -> RepoResult<ElementId>;
    fn get_element(&self, id: ElementId) -> RepoResult<Option<Element>>;
    /// Hard-deletes one element row.
    fn delete_element(&self, id: ElementId) -> RepoResult<()>;
}

/// SQLite-backed element repository.
pub struct SqliteElementRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteElementRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ElementRepository for SqliteElementRepository<'_> {
    fn resolve_by_urns(
        &self,
        user: &UserContext,
        urns: &[String],
    ) -> RepoResult<Vec<ResolvedElement>> {
        let mut seen_urns = HashSet::new();
        let mut seen_elements = HashSet::new();
        let mut resolved = Vec::with_capacity(urns.len());

        for urn in urns {
            let Ok(parsed) = Identification::parse_urn(urn) else {
                continue;
            };
            let Some(canonical) = parsed.urn() else {
                continue;
            };
            if !seen_urns.insert(canonical.clone()) {
                continue;
            }
            let element = self
                .conn
                .query_row(
                    "SELECT e.id AS id, e.uuid AS uuid, e.element_type AS element_type
                     FROM identifications i
                     INNER JOIN elements e ON e.id = i.element_id
                     WHERE i.namespace_id = ?1
                       AND i.element_type = ?2
                       AND i.identifier = ?3
                       AND i.version = ?4;",
                    params![
                        parsed.namespace_id,
                        parsed.element_type.as_str(),
                        parsed.identifier,
                        parsed.version,
                    ],
                    |row| Ok(parse_element_row(row)),
                )
                .optional()?
                .transpose()?;

            let Some(element) = element else {
                continue;
            };
            if element.id.is_some_and(|id| !seen_elements.insert(id)) {
                continue;
            }
            resolved.push(ResolvedElement {
                urn: canonical,
                element,
            });
        }

        debug!(
            "event=element_resolve module=repo status=ok user_id={} requested={} resolved={}",
            user.user_id,
            urns.len(),
            resolved.len()
        );
        Ok(resolved)
    }

    fn create_element(&self, element: &Element) -> RepoResult<ElementId> {
        self.conn.execute(
            "INSERT INTO elements (uuid, element_type) VALUES (?1, ?2);",
            params![element.uuid.to_string(), element.element_type.as_str()],
        )?;
        Ok(ElementId(self.conn.last_insert_rowid()))
    }

    fn get_element(&self, id: ElementId) -> RepoResult<Option<Element>> {
        self.conn
            .query_row(
                "SELECT id, uuid, element_type FROM elements WHERE id = ?1;",
                [id.0],
                |row| Ok(parse_element_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn delete_element(&self, id: ElementId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM elements WHERE id = ?1;", [id.0])?;
        if changed == 0 {
            return Err(RepoError::NotFound(format!("element {id}")));
        }
        Ok(())
    }
}

fn parse_element_row(row: &Row<'_>) -> RepoResult<Element> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in elements.uuid"))
    })?;

    let type_text: String = row.get("element_type")?;
    let element_type = ElementType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid element type `{type_text}` in elements.element_type"
        ))
    })?;

    Ok(Element {
        id: Some(ElementId(row.get("id")?)),
        uuid,
        element_type,
    })
}
