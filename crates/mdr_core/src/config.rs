//! Composer configuration.
//!
//! # Responsibility
//! - Hold the per-composer choices: transaction lock modes and the update
//!   policy for draft records.
//! - Read overrides from `MDR_*` environment variables for binaries.
//!
//! # Invariants
//! - `ComposerConfig::default()` is the behavior callers get without any
//!   configuration: immediate write transactions, deferred reads, drafts
//!   patched in place.

use crate::db::TransactionMode;

const ENV_UPDATE_POLICY: &str = "MDR_UPDATE_POLICY";
const ENV_WRITE_MODE: &str = "MDR_WRITE_MODE";

/// How `update` treats records that are still drafts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePolicy {
    /// Drafts are patched in place; other statuses get a new version.
    #[default]
    InPlaceDraft,
    /// Every update deletes the previous aggregate and creates a new
    /// version, regardless of status.
    AlwaysReplace,
}

impl UpdatePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "in_place_draft" => Some(Self::InPlaceDraft),
            "always_replace" => Some(Self::AlwaysReplace),
            _ => None,
        }
    }
}

/// Settings for one `RecordComposer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposerConfig {
    /// Lock mode for create/update transactions.
    pub write_mode: TransactionMode,
    /// Lock mode for the read snapshot taken by `get`.
    pub read_mode: TransactionMode,
    pub update_policy: UpdatePolicy,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            write_mode: TransactionMode::Immediate,
            read_mode: TransactionMode::Deferred,
            update_policy: UpdatePolicy::InPlaceDraft,
        }
    }
}

impl ComposerConfig {
    pub fn with_update_policy(mut self, update_policy: UpdatePolicy) -> Self {
        self.update_policy = update_policy;
        self
    }

    pub fn with_write_mode(mut self, write_mode: TransactionMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn with_read_mode(mut self, read_mode: TransactionMode) -> Self {
        self.read_mode = read_mode;
        self
    }

    /// Builds a config from process environment overrides.
    ///
    /// # Errors
    /// - Returns an error when a variable is set to an unsupported value.
    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_UPDATE_POLICY) {
            config.update_policy = UpdatePolicy::parse(&value).ok_or_else(|| {
                format!(
                    "unsupported {ENV_UPDATE_POLICY} `{value}`; expected in_place_draft|always_replace"
                )
            })?;
        }

        if let Some(value) = lookup(ENV_WRITE_MODE) {
            config.write_mode = match value.trim().to_ascii_lowercase().as_str() {
                "deferred" => TransactionMode::Deferred,
                "immediate" => TransactionMode::Immediate,
                "exclusive" => TransactionMode::Exclusive,
                _ => {
                    return Err(format!(
                        "unsupported {ENV_WRITE_MODE} `{value}`; expected deferred|immediate|exclusive"
                    ))
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::{ComposerConfig, UpdatePolicy};
    use crate::db::TransactionMode;

    #[test]
    fn defaults_patch_drafts_with_immediate_writes() {
        let config = ComposerConfig::default();
        assert_eq!(config.update_policy, UpdatePolicy::InPlaceDraft);
        assert_eq!(config.write_mode, TransactionMode::Immediate);
        assert_eq!(config.read_mode, TransactionMode::Deferred);
    }

    #[test]
    fn from_vars_applies_overrides() {
        let config = ComposerConfig::from_vars(|key| match key {
            "MDR_UPDATE_POLICY" => Some(" Always_Replace ".to_string()),
            "MDR_WRITE_MODE" => Some("exclusive".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.update_policy, UpdatePolicy::AlwaysReplace);
        assert_eq!(config.write_mode, TransactionMode::Exclusive);
    }

    #[test]
    fn from_vars_rejects_unknown_values() {
        let error = ComposerConfig::from_vars(|key| {
            (key == "MDR_UPDATE_POLICY").then(|| "sometimes".to_string())
        })
        .unwrap_err();
        assert!(error.contains("MDR_UPDATE_POLICY"));
    }
}
