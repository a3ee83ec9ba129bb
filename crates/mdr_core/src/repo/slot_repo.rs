//! Slot repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist key/value slots attached to one identification.
//!
//! # Invariants
//! - Slots are read back in insertion order (`position ASC`).
//! - Duplicate slot names are kept; slots are an ordered list, not a map.

use crate::model::identification::IdentificationId;
use crate::model::record::Slot;
use crate::model::user::UserContext;
use crate::repo::{ensure_connection_ready, position_to_db, RepoResult};
use rusqlite::{params, Connection};

/// Repository interface for record slots.
pub trait SlotRepository {
    fn get_slots(&self, identification_id: IdentificationId) -> RepoResult<Vec<Slot>>;
    fn create_slots(
        &self,
        user: &UserContext,
        slots: &[Slot],
        identification_id: IdentificationId,
    ) -> RepoResult<()>;
    fn delete_slots(&self, identification_id: IdentificationId) -> RepoResult<usize>;
}

/// SQLite-backed slot repository.
pub struct SqliteSlotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSlotRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SlotRepository for SqliteSlotRepository<'_> {
    fn get_slots(&self, identification_id: IdentificationId) -> RepoResult<Vec<Slot>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, value
             FROM slots
             WHERE identification_id = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([identification_id.0])?;
        let mut slots = Vec::new();
        while let Some(row) = rows.next()? {
            slots.push(Slot {
                name: row.get("name")?,
                value: row.get("value")?,
            });
        }
        Ok(slots)
    }

    fn create_slots(
        &self,
        _user: &UserContext,
        slots: &[Slot],
        identification_id: IdentificationId,
    ) -> RepoResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO slots (identification_id, position, name, value)
             VALUES (?1, ?2, ?3, ?4);",
        )?;
        for (index, slot) in slots.iter().enumerate() {
            stmt.execute(params![
                identification_id.0,
                position_to_db(index),
                slot.name.trim(),
                slot.value.as_str(),
            ])?;
        }
        Ok(())
    }

    fn delete_slots(&self, identification_id: IdentificationId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM slots WHERE identification_id = ?1;",
            [identification_id.0],
        )?;
        Ok(removed)
    }
}
