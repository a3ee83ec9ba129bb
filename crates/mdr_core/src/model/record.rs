//! Record aggregate model.
//!
//! # Responsibility
//! - Define the composite record: identification, definitions, slots and
//!   member references.
//! - Validate caller input before any storage write.
//!
//! # Invariants
//! - A record has at least one definition.
//! - Members are references by URN; the referenced content is not owned.
//! - Empty `slots`/`members` mean "absent" and are skipped on create.

use crate::model::element::{Element, ElementType};
use crate::model::identification::{Identification, IdentificationId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Free-text description in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub designation: String,
    pub definition: String,
    /// Language tag, e.g. `en`.
    pub language: String,
}

impl Definition {
    pub fn new(
        designation: impl Into<String>,
        definition: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            designation: designation.into(),
            definition: definition.into(),
            language: language.into(),
        }
    }
}

/// Key/value property attached to a record identification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    pub value: String,
}

impl Slot {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Reference from a record to another registry element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub element_urn: String,
}

impl Member {
    pub fn new(element_urn: impl Into<String>) -> Self {
        Self {
            element_urn: element_urn.into(),
        }
    }
}

/// Composite record as exchanged with callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub identification: Identification,
    pub definitions: Vec<Definition>,
    #[serde(default)]
    pub slots: Vec<Slot>,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Record {
    /// Creates a record with one definition and no slots or members.
    pub fn new(identification: Identification, definition: Definition) -> Self {
        Self {
            identification,
            definitions: vec![definition],
            slots: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Member URNs in record order, canonicalized where they parse.
    pub fn member_urns(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|member| {
                Identification::parse_urn(&member.element_urn)
                    .ok()
                    .and_then(|parsed| parsed.urn())
                    .unwrap_or_else(|| member.element_urn.trim().to_string())
            })
            .collect()
    }

    /// Validates caller-supplied shape before persistence.
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.identification.element_type != ElementType::Record {
            return Err(RecordValidationError::NotARecord(
                self.identification.element_type,
            ));
        }
        if self.definitions.is_empty() {
            return Err(RecordValidationError::MissingDefinition);
        }
        for (index, definition) in self.definitions.iter().enumerate() {
            if definition.designation.trim().is_empty() {
                return Err(RecordValidationError::BlankDesignation { index });
            }
            if definition.language.trim().is_empty() {
                return Err(RecordValidationError::BlankLanguage { index });
            }
        }
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.name.trim().is_empty() {
                return Err(RecordValidationError::BlankSlotName { index });
            }
        }
        Ok(())
    }
}

/// Record snapshot including server-assigned storage fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub element: Element,
    pub identification_id: IdentificationId,
    pub record: Record,
}

/// Record shape validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    NotARecord(ElementType),
    MissingDefinition,
    BlankDesignation { index: usize },
    BlankLanguage { index: usize },
    BlankSlotName { index: usize },
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotARecord(kind) => {
                write!(f, "identification type must be record, got `{}`", kind.as_str())
            }
            Self::MissingDefinition => write!(f, "record requires at least one definition"),
            Self::BlankDesignation { index } => {
                write!(f, "definition {index} has a blank designation")
            }
            Self::BlankLanguage { index } => write!(f, "definition {index} has a blank language"),
            Self::BlankSlotName { index } => write!(f, "slot {index} has a blank name"),
        }
    }
}

impl Error for RecordValidationError {}

#[cfg(test)]
mod tests {
    use super::{Definition, Member, Record, RecordValidationError, Slot};
    use crate::model::element::ElementType;
    use crate::model::identification::{Identification, Status};

    fn record() -> Record {
        Record::new(
            Identification::new(1, ElementType::Record, Status::Draft),
            Definition::new("Patient", "Patient master data", "en"),
        )
    }

    #[test]
    fn valid_record_passes() {
        assert!(record().validate().is_ok());
    }

    #[test]
    fn record_without_definitions_is_rejected() {
        let mut record = record();
        record.definitions.clear();
        assert_eq!(
            record.validate(),
            Err(RecordValidationError::MissingDefinition)
        );
    }

    #[test]
    fn member_urns_are_canonical() {
        let mut record = record();
        record.members.push(Member::new(" urn:1:dataelement:4:2 "));
        record.members.push(Member::new("not-a-urn "));
        assert_eq!(
            record.member_urns(),
            vec!["urn:1:dataelement:4:2".to_string(), "not-a-urn".to_string()]
        );
    }

    #[test]
    fn blank_slot_name_is_rejected() {
        let mut record = record();
        record.slots.push(Slot::new("  ", "value"));
        assert_eq!(
            record.validate(),
            Err(RecordValidationError::BlankSlotName { index: 0 })
        );
    }

    #[test]
    fn non_record_identification_is_rejected() {
        let mut record = record();
        record.identification.element_type = ElementType::DataElement;
        assert!(matches!(
            record.validate(),
            Err(RecordValidationError::NotARecord(ElementType::DataElement))
        ));
    }
}
