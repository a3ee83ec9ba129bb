//! Versioned identification model.
//!
//! # Responsibility
//! - Describe the namespace-scoped identity of a registry element version.
//! - Render and parse URNs of the form
//!   `urn:<namespace_id>:<element_type>:<identifier>:<version>`.
//! - Own lifecycle status ordering.
//!
//! # Invariants
//! - `identifier` and `version` are assigned by storage; callers leave them
//!   unset on create.
//! - Status moves forward only: `draft -> released -> outdated`.

use crate::model::element::{ElementId, ElementType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static URN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^urn:([1-9][0-9]*):([a-z]+):([1-9][0-9]*):([1-9][0-9]*)$")
        .expect("valid urn regex")
});

/// Lifecycle status of one identification version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Editable in place.
    Draft,
    /// Published; edits produce a new version.
    Released,
    /// Superseded; kept for reference only.
    Outdated,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Released => "released",
            Self::Outdated => "outdated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "released" => Some(Self::Released),
            "outdated" => Some(Self::Outdated),
            _ => None,
        }
    }

    /// Whether a row currently in `self` may be moved to `next`.
    ///
    /// Staying in the same status is allowed.
    pub fn can_transition_to(self, next: Status) -> bool {
        next >= self
    }
}

/// Storage id of an identification row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentificationId(pub i64);

/// Namespace-scoped identity of one registry element version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identification {
    pub namespace_id: i64,
    pub element_type: ElementType,
    /// Assigned on first create, kept across versions.
    pub identifier: Option<i64>,
    /// Starts at 1 and grows by one per new version.
    pub version: Option<u32>,
    pub status: Status,
}

impl Identification {
    /// Builds create input for a new element in `namespace_id`.
    pub fn new(namespace_id: i64, element_type: ElementType, status: Status) -> Self {
        Self {
            namespace_id,
            element_type,
            identifier: None,
            version: None,
            status,
        }
    }

    /// Parses a URN into an identification.
    ///
    /// The URN carries no status, so the result holds `Status::Draft` as a
    /// placeholder; the stored row is authoritative.
    pub fn parse_urn(urn: &str) -> Result<Self, UrnParseError> {
        let caps = URN_RE
            .captures(urn.trim())
            .ok_or_else(|| UrnParseError::Malformed(urn.to_string()))?;

        let element_type = ElementType::parse(&caps[2])
            .ok_or_else(|| UrnParseError::UnknownElementType(caps[2].to_string()))?;
        let namespace_id = parse_component(urn, &caps[1])?;
        let identifier = parse_component(urn, &caps[3])?;
        let version = u32::try_from(parse_component(urn, &caps[4])?)
            .map_err(|_| UrnParseError::OutOfRange(urn.to_string()))?;

        Ok(Self {
            namespace_id,
            element_type,
            identifier: Some(identifier),
            version: Some(version),
            status: Status::Draft,
        })
    }

    /// Renders the URN once identifier and version are assigned.
    pub fn urn(&self) -> Option<String> {
        match (self.identifier, self.version) {
            (Some(identifier), Some(version)) => Some(format!(
                "urn:{}:{}:{}:{}",
                self.namespace_id,
                self.element_type.as_str(),
                identifier,
                version
            )),
            _ => None,
        }
    }
}

fn parse_component(urn: &str, value: &str) -> Result<i64, UrnParseError> {
    value
        .parse::<i64>()
        .map_err(|_| UrnParseError::OutOfRange(urn.to_string()))
}

/// Identification row as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIdentification {
    pub id: IdentificationId,
    pub element_id: ElementId,
    pub identification: Identification,
}

impl StoredIdentification {
    pub fn urn(&self) -> String {
        self.identification.urn().unwrap_or_default()
    }
}

/// URN parsing failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrnParseError {
    /// Input does not match `urn:<ns>:<type>:<identifier>:<version>`.
    Malformed(String),
    UnknownElementType(String),
    /// Numeric component does not fit the storage type.
    OutOfRange(String),
}

impl Display for UrnParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(urn) => write!(f, "malformed urn: `{urn}`"),
            Self::UnknownElementType(kind) => write!(f, "unknown element type in urn: `{kind}`"),
            Self::OutOfRange(urn) => write!(f, "urn component out of range: `{urn}`"),
        }
    }
}

impl Error for UrnParseError {}

#[cfg(test)]
mod tests {
    use super::{Identification, Status, UrnParseError};
    use crate::model::element::ElementType;

    #[test]
    fn parse_urn_reads_every_component() {
        let parsed = Identification::parse_urn("urn:3:record:12:4").unwrap();
        assert_eq!(parsed.namespace_id, 3);
        assert_eq!(parsed.element_type, ElementType::Record);
        assert_eq!(parsed.identifier, Some(12));
        assert_eq!(parsed.version, Some(4));
        assert_eq!(parsed.urn().as_deref(), Some("urn:3:record:12:4"));
    }

    #[test]
    fn parse_urn_rejects_bad_shapes() {
        for urn in ["", "1:1:1", "urn:1:record:1", "urn:0:record:1:1", "urn:1:record:1:x"] {
            assert!(
                matches!(
                    Identification::parse_urn(urn),
                    Err(UrnParseError::Malformed(_))
                ),
                "{urn} should be malformed"
            );
        }
        assert!(matches!(
            Identification::parse_urn("urn:1:namespace:1:1"),
            Err(UrnParseError::UnknownElementType(_))
        ));
        assert!(matches!(
            Identification::parse_urn("urn:1:record:1:99999999999"),
            Err(UrnParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn unsaved_identification_has_no_urn() {
        let identification = Identification::new(1, ElementType::Record, Status::Draft);
        assert!(identification.urn().is_none());
    }

    #[test]
    fn status_only_moves_forward() {
        assert!(Status::Draft.can_transition_to(Status::Released));
        assert!(Status::Released.can_transition_to(Status::Outdated));
        assert!(Status::Released.can_transition_to(Status::Released));
        assert!(!Status::Released.can_transition_to(Status::Draft));
        assert!(!Status::Outdated.can_transition_to(Status::Released));
    }
}
