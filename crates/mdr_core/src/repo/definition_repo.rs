//! Definition repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the free-text definitions of one identification.
//!
//! # Invariants
//! - Definitions are read back in insertion order (`position ASC`).

use crate::model::element::ElementId;
use crate::model::identification::IdentificationId;
use crate::model::record::Definition;
use crate::model::user::UserContext;
use crate::repo::{ensure_connection_ready, position_to_db, RepoResult};
use rusqlite::{params, Connection};

/// Repository interface for record definitions.
pub trait DefinitionRepository {
    fn get_definitions(&self, identification_id: IdentificationId) -> RepoResult<Vec<Definition>>;
    /// Appends definitions for one identification.
    fn create_definitions(
        &self,
        user: &UserContext,
        definitions: &[Definition],
        element_id: ElementId,
        identification_id: IdentificationId,
    ) -> RepoResult<()>;
    /// Removes every definition of one identification; returns rows removed.
    fn delete_definitions(&self, identification_id: IdentificationId) -> RepoResult<usize>;
}

/// SQLite-backed definition repository.
pub struct SqliteDefinitionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDefinitionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl DefinitionRepository for SqliteDefinitionRepository<'_> {
    fn get_definitions(&self, identification_id: IdentificationId) -> RepoResult<Vec<Definition>> {
        let mut stmt = self.conn.prepare(
            "SELECT designation, definition, language
             FROM definitions
             WHERE identification_id = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([identification_id.0])?;
        let mut definitions = Vec::new();
        while let Some(row) = rows.next()? {
            definitions.push(Definition {
                designation: row.get("designation")?,
                definition: row.get("definition")?,
                language: row.get("language")?,
            });
        }
        Ok(definitions)
    }

    fn create_definitions(
        &self,
        _user: &UserContext,
        definitions: &[Definition],
        element_id: ElementId,
        identification_id: IdentificationId,
    ) -> RepoResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO definitions (
                element_id,
                identification_id,
                position,
                designation,
                definition,
                language
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        )?;
        for (index, definition) in definitions.iter().enumerate() {
            stmt.execute(params![
                element_id.0,
                identification_id.0,
                position_to_db(index),
                definition.designation.trim(),
                definition.definition.as_str(),
                definition.language.trim(),
            ])?;
        }
        Ok(())
    }

    fn delete_definitions(&self, identification_id: IdentificationId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM definitions WHERE identification_id = ?1;",
            [identification_id.0],
        )?;
        Ok(removed)
    }
}
