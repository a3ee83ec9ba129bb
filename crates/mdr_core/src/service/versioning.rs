//! Update planning for versioned records.
//!
//! The previous record's status maps to a `RecordState`; together with the
//! configured `UpdatePolicy` it picks exactly one `UpdatePlan`. Keeping the
//! decision here makes it testable without storage.

use crate::config::UpdatePolicy;
use crate::model::identification::Status;

/// Versioning state of an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Still editable in place.
    Draft,
    /// Released or later; edits must produce a new version.
    Versioned,
}

impl RecordState {
    pub fn of(status: Status) -> Self {
        match status {
            Status::Draft => Self::Draft,
            Status::Released | Status::Outdated => Self::Versioned,
        }
    }
}

/// What `update` does to the previous aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Keep element and identification rows; rewrite status and sections.
    PatchInPlace,
    /// Delete the previous aggregate and create the next version in the
    /// same transaction.
    ReplaceWithNewVersion,
}

pub fn plan_update(state: RecordState, policy: UpdatePolicy) -> UpdatePlan {
    match (state, policy) {
        (RecordState::Draft, UpdatePolicy::InPlaceDraft) => UpdatePlan::PatchInPlace,
        (RecordState::Draft, UpdatePolicy::AlwaysReplace) => UpdatePlan::ReplaceWithNewVersion,
        (RecordState::Versioned, _) => UpdatePlan::ReplaceWithNewVersion,
    }
}

#[cfg(test)]
mod tests {
    use super::{plan_update, RecordState, UpdatePlan};
    use crate::config::UpdatePolicy;
    use crate::model::identification::Status;

    #[test]
    fn drafts_are_patched_under_default_policy() {
        assert_eq!(
            plan_update(RecordState::of(Status::Draft), UpdatePolicy::InPlaceDraft),
            UpdatePlan::PatchInPlace
        );
    }

    #[test]
    fn released_and_outdated_records_always_get_a_new_version() {
        for status in [Status::Released, Status::Outdated] {
            for policy in [UpdatePolicy::InPlaceDraft, UpdatePolicy::AlwaysReplace] {
                assert_eq!(
                    plan_update(RecordState::of(status), policy),
                    UpdatePlan::ReplaceWithNewVersion
                );
            }
        }
    }

    #[test]
    fn always_replace_policy_versions_drafts_too() {
        assert_eq!(
            plan_update(RecordState::Draft, UpdatePolicy::AlwaysReplace),
            UpdatePlan::ReplaceWithNewVersion
        );
    }
}
