//! Record composition service.
//!
//! # Responsibility
//! - Read, create and update a record as one unit spanning element,
//!   identification, definition, slot and member storage.
//! - Own transaction boundaries for every record operation.
//! - Enforce cross-store rules: member resolution, member immutability and
//!   the status-gated versioning of updates.
//!
//! # Invariants
//! - Input validation and member resolution of `create` run before any
//!   transaction is opened, so they never leave writes behind.
//! - Every scope this service opens is committed or rolled back exactly once
//!   before the call returns.
//! - `update` never changes a record's members.
//! - Replacing a record deletes the previous aggregate and creates the next
//!   version inside the same scope.

use crate::config::ComposerConfig;
use crate::db::{DbError, TxScope};
use crate::model::element::{Element, ElementId, ElementType};
use crate::model::identification::{Identification, StoredIdentification};
use crate::model::record::{Record, RecordValidationError, StoredRecord};
use crate::model::user::UserContext;
use crate::repo::definition_repo::{DefinitionRepository, SqliteDefinitionRepository};
use crate::repo::element_repo::{ElementRepository, ResolvedElement, SqliteElementRepository};
use crate::repo::identification_repo::{
    IdentificationRepository, SqliteIdentificationRepository,
};
use crate::repo::member_repo::{MemberRepository, SqliteMemberRepository};
use crate::repo::slot_repo::{SlotRepository, SqliteSlotRepository};
use crate::repo::RepoError;
use crate::service::versioning::{plan_update, RecordState, UpdatePlan};
use log::{error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type RecordResult<T> = Result<T, RecordError>;

/// Coarse error category for transport-layer mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Access,
    Storage,
}

impl ErrorKind {
    /// Stable code used in log events.
    pub fn code(self) -> &'static str {
        match self {
            Self::Validation => "validation_failed",
            Self::NotFound => "not_found",
            Self::Access => "access_denied",
            Self::Storage => "storage_failed",
        }
    }
}

/// Error returned by record operations.
#[derive(Debug)]
pub enum RecordError {
    /// Malformed input, unresolved or duplicate members, member mismatch on
    /// update, or a backwards status change.
    Validation(String),
    /// URN does not name an existing record.
    NotFound(String),
    /// A store denied the write for this user.
    Access(String),
    /// Transactional I/O failure.
    Storage(RepoError),
}

impl RecordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Access(_) => ErrorKind::Access,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "invalid record: {message}"),
            Self::NotFound(urn) => write!(f, "record not found: {urn}"),
            Self::Access(message) => write!(f, "access denied: {message}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RecordError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RecordError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(what) => Self::NotFound(what),
            err @ RepoError::AccessDenied { .. } => Self::Access(err.to_string()),
            err @ (RepoError::Validation(_)
            | RepoError::InvalidUrn(_)
            | RepoError::UnknownNamespace(_)
            | RepoError::InvalidStatusTransition { .. }) => Self::Validation(err.to_string()),
            other => Self::Storage(other),
        }
    }
}

impl From<DbError> for RecordError {
    fn from(value: DbError) -> Self {
        Self::Storage(RepoError::Db(value))
    }
}

impl From<RecordValidationError> for RecordError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value.to_string())
    }
}

/// Transactional facade over the record section stores.
pub struct RecordComposer<'conn> {
    conn: &'conn Connection,
    config: ComposerConfig,
    elements: SqliteElementRepository<'conn>,
    identifications: SqliteIdentificationRepository<'conn>,
    definitions: SqliteDefinitionRepository<'conn>,
    slots: SqliteSlotRepository<'conn>,
    members: SqliteMemberRepository<'conn>,
}

impl<'conn> RecordComposer<'conn> {
    /// Creates a composer with default configuration.
    pub fn try_new(conn: &'conn Connection) -> RecordResult<Self> {
        Self::with_config(conn, ComposerConfig::default())
    }

    /// Creates a composer over a migrated connection.
    ///
    /// The connection may already be inside a caller transaction; record
    /// operations then join it through a savepoint instead of committing.
    pub fn with_config(conn: &'conn Connection, config: ComposerConfig) -> RecordResult<Self> {
        Ok(Self {
            conn,
            config,
            elements: SqliteElementRepository::try_new(conn)?,
            identifications: SqliteIdentificationRepository::try_new(conn)?,
            definitions: SqliteDefinitionRepository::try_new(conn)?,
            slots: SqliteSlotRepository::try_new(conn)?,
            members: SqliteMemberRepository::try_new(conn)?,
        })
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Loads one record by URN.
    ///
    /// All sections are read inside one read scope, so they come from one
    /// consistent snapshot.
    pub fn get(&self, user: &UserContext, urn: &str) -> RecordResult<Record> {
        self.get_stored(user, urn).map(|stored| stored.record)
    }

    /// Loads one record by URN together with its element row.
    pub fn get_stored(&self, user: &UserContext, urn: &str) -> RecordResult<StoredRecord> {
        let started_at = Instant::now();
        let result = self.read_snapshot(urn);

        log_outcome("record_get", user, urn, started_at, &result);
        result
    }

    /// Creates a record and returns its assigned identification.
    ///
    /// # Errors
    /// - `Validation` when the record shape is invalid or member URNs do not
    ///   resolve to distinct existing elements. Nothing is written.
    /// - `Access` when the user cannot write the namespace.
    /// - `Storage` on any write failure; the scope is rolled back.
    pub fn create(&self, user: &UserContext, record: &Record) -> RecordResult<Identification> {
        let started_at = Instant::now();
        let result = self.create_checked(user, record);

        let urn = match &result {
            Ok(stored) => stored.urn(),
            Err(_) => "-".to_string(),
        };
        log_outcome("record_create", user, &urn, started_at, &result);
        result.map(|stored| stored.identification)
    }

    /// Updates an existing record named by `record.identification`.
    ///
    /// Drafts are patched in place (same element and URN) unless the
    /// configured policy says otherwise. Any other status deletes the
    /// previous aggregate and creates the next version in the same scope.
    ///
    /// # Errors
    /// - `Validation` when members differ from the stored record, the shape
    ///   is invalid, or the status would move backwards. Nothing is written.
    /// - `NotFound` when the URN does not name a record.
    /// - `Access` when the user cannot write the namespace.
    /// - `Storage` on any write failure; the scope is rolled back.
    pub fn update(&self, user: &UserContext, record: &Record) -> RecordResult<Identification> {
        let started_at = Instant::now();
        let urn = record.identification.urn().unwrap_or_default();
        let result = self.update_checked(user, record, &urn);

        log_outcome("record_update", user, &urn, started_at, &result);
        result.map(|stored| stored.identification)
    }

    fn read_snapshot(&self, urn: &str) -> RecordResult<StoredRecord> {
        let parsed = self.identifications.parse(urn)?;
        let scope = TxScope::begin(self.conn, self.config.read_mode)?;
        finish_scope(scope, self.load(&parsed, urn))
    }

    fn create_checked(
        &self,
        user: &UserContext,
        record: &Record,
    ) -> RecordResult<StoredIdentification> {
        record.validate()?;
        let resolved = self.resolve_members(user, record)?;

        let scope = TxScope::begin(self.conn, self.config.write_mode)?;
        finish_scope(scope, self.insert_aggregate(user, record, &resolved, None))
    }

    fn update_checked(
        &self,
        user: &UserContext,
        record: &Record,
        urn: &str,
    ) -> RecordResult<StoredIdentification> {
        record.validate()?;
        if urn.is_empty() {
            return Err(RecordError::Validation(
                "update requires the identifier and version of an existing record".to_string(),
            ));
        }
        let parsed = self.identifications.parse(urn)?;

        // Previous snapshot is read under the write lock so two concurrent
        // updates cannot both replace the same version.
        let scope = TxScope::begin(self.conn, self.config.write_mode)?;
        finish_scope(scope, self.apply_update(user, record, &parsed, urn))
    }

    fn apply_update(
        &self,
        user: &UserContext,
        record: &Record,
        parsed: &Identification,
        urn: &str,
    ) -> RecordResult<StoredIdentification> {
        let previous = self.load(parsed, urn)?;
        if record.member_urns() != previous.record.member_urns() {
            return Err(RecordError::Validation(format!(
                "members of {urn} cannot change through update"
            )));
        }

        let state = RecordState::of(previous.record.identification.status);
        match plan_update(state, self.config.update_policy) {
            UpdatePlan::PatchInPlace => self.patch_in_place(user, record, &previous),
            UpdatePlan::ReplaceWithNewVersion => {
                let resolved = self.resolve_members(user, record)?;
                self.delete_aggregate(&previous)?;
                self.insert_aggregate(
                    user,
                    record,
                    &resolved,
                    Some(&previous.record.identification),
                )
            }
        }
    }

    fn load(&self, parsed: &Identification, urn: &str) -> RecordResult<StoredRecord> {
        let not_found = || RecordError::NotFound(urn.to_string());

        let stored = self.identifications.get(parsed)?.ok_or_else(not_found)?;
        if stored.identification.element_type != ElementType::Record {
            return Err(not_found());
        }
        let element = self
            .elements
            .get_element(stored.element_id)?
            .ok_or_else(not_found)?;

        let definitions = self.definitions.get_definitions(stored.id)?;
        let members = self.members.get_members(stored.id)?;
        let slots = self.slots.get_slots(stored.id)?;

        Ok(StoredRecord {
            element,
            identification_id: stored.id,
            record: Record {
                identification: stored.identification,
                definitions,
                slots,
                members,
            },
        })
    }

    fn resolve_members(
        &self,
        user: &UserContext,
        record: &Record,
    ) -> RecordResult<Vec<ResolvedElement>> {
        if record.members.is_empty() {
            return Ok(Vec::new());
        }

        let urns = record.member_urns();
        let resolved = self.elements.resolve_by_urns(user, &urns)?;
        if resolved.len() != urns.len() {
            return Err(RecordError::Validation(format!(
                "expected {} distinct existing member elements, resolved {}",
                urns.len(),
                resolved.len()
            )));
        }
        Ok(resolved)
    }

    fn insert_aggregate(
        &self,
        user: &UserContext,
        record: &Record,
        members: &[ResolvedElement],
        previous: Option<&Identification>,
    ) -> RecordResult<StoredIdentification> {
        let element = Element::new(ElementType::Record);
        let element_id = self.elements.create_element(&element)?;

        let stored = match previous {
            None => self
                .identifications
                .create(user, &record.identification, element_id)?,
            Some(previous) => self.identifications.create_version(
                user,
                &record.identification,
                element_id,
                previous,
            )?,
        };

        self.definitions
            .create_definitions(user, &record.definitions, element_id, stored.id)?;
        if !record.slots.is_empty() {
            self.slots.create_slots(user, &record.slots, stored.id)?;
        }
        if !members.is_empty() {
            self.members.create_members(user, members, stored.id)?;
        }
        Ok(stored)
    }

    fn patch_in_place(
        &self,
        user: &UserContext,
        record: &Record,
        previous: &StoredRecord,
    ) -> RecordResult<StoredIdentification> {
        let element_id = stored_element_id(previous)?;
        let identification = Identification {
            namespace_id: previous.record.identification.namespace_id,
            ..record.identification.clone()
        };
        let stored = self
            .identifications
            .update(user, &identification, element_id)?;

        self.definitions.delete_definitions(stored.id)?;
        self.definitions
            .create_definitions(user, &record.definitions, element_id, stored.id)?;
        self.slots.delete_slots(stored.id)?;
        if !record.slots.is_empty() {
            self.slots.create_slots(user, &record.slots, stored.id)?;
        }
        Ok(stored)
    }

    fn delete_aggregate(&self, previous: &StoredRecord) -> RecordResult<()> {
        let identification_id = previous.identification_id;
        self.members.delete_members(identification_id)?;
        self.slots.delete_slots(identification_id)?;
        self.definitions.delete_definitions(identification_id)?;
        self.identifications.delete(identification_id)?;
        self.elements.delete_element(stored_element_id(previous)?)?;
        Ok(())
    }
}

fn stored_element_id(stored: &StoredRecord) -> RecordResult<ElementId> {
    stored.element.id.ok_or_else(|| {
        RecordError::Storage(RepoError::InvalidData(
            "loaded record element has no id".to_string(),
        ))
    })
}

/// Commits on success, rolls back on failure; the original error wins over
/// a rollback failure.
fn finish_scope<T>(scope: TxScope<'_>, result: RecordResult<T>) -> RecordResult<T> {
    match result {
        Ok(value) => {
            scope.commit()?;
            Ok(value)
        }
        Err(err) => {
            let kind = scope.kind();
            if let Err(rollback_err) = scope.rollback() {
                error!(
                    "event=tx_rollback module=service status=error kind={:?} error={}",
                    kind, rollback_err
                );
            }
            Err(err)
        }
    }
}

fn log_outcome<T>(
    event: &str,
    user: &UserContext,
    urn: &str,
    started_at: Instant,
    result: &RecordResult<T>,
) {
    match result {
        Ok(_) => info!(
            "event={} module=service status=ok user_id={} urn={} duration_ms={}",
            event,
            user.user_id,
            urn,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={} module=service status=error user_id={} urn={} duration_ms={} error_code={} error={}",
            event,
            user.user_id,
            urn,
            started_at.elapsed().as_millis(),
            err.kind().code(),
            err
        ),
    }
}
