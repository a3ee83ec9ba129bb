//! Member repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist record -> element member associations.
//!
//! # Invariants
//! - Only the association (target element id and URN) is stored, never the
//!   target's content.
//! - Members are read back in insertion order (`position ASC`).
//! - A member target cannot be deleted while a record references it
//!   (`members.member_element_id` foreign key).

use crate::model::identification::IdentificationId;
use crate::model::record::Member;
use crate::model::user::UserContext;
use crate::repo::element_repo::ResolvedElement;
use crate::repo::{ensure_connection_ready, position_to_db, RepoResult};
use rusqlite::{params, Connection};

/// Repository interface for record members.
pub trait MemberRepository {
    fn get_members(&self, identification_id: IdentificationId) -> RepoResult<Vec<Member>>;
    /// Stores associations to already-resolved elements, in slice order.
    fn create_members(
        &self,
        user: &UserContext,
        members: &[ResolvedElement],
        identification_id: IdentificationId,
    ) -> RepoResult<()>;
    fn delete_members(&self, identification_id: IdentificationId) -> RepoResult<usize>;
}

/// SQLite-backed member repository.
pub struct SqliteMemberRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemberRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl MemberRepository for SqliteMemberRepository<'_> {
    fn get_members(&self, identification_id: IdentificationId) -> RepoResult<Vec<Member>> {
        let mut stmt = self.conn.prepare(
            "SELECT member_urn
             FROM members
             WHERE identification_id = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([identification_id.0])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(Member {
                element_urn: row.get("member_urn")?,
            });
        }
        Ok(members)
    }

    fn create_members(
        &self,
        user: &UserContext,
        members: &[ResolvedElement],
        identification_id: IdentificationId,
    ) -> RepoResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO members (
                identification_id,
                member_element_id,
                member_urn,
                position,
                created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
        )?;
        for (index, member) in members.iter().enumerate() {
            stmt.execute(params![
                identification_id.0,
                member.element_id()?.0,
                member.urn.as_str(),
                position_to_db(index),
                user.user_id,
            ])?;
        }
        Ok(())
    }

    fn delete_members(&self, identification_id: IdentificationId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM members WHERE identification_id = ?1;",
            [identification_id.0],
        )?;
        Ok(removed)
    }
}
