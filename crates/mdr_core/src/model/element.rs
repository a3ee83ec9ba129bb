//! Element model.
//!
//! # Responsibility
//! - Describe the storage row that gives every registry entity a surrogate
//!   id, a global uuid and a type tag.
//!
//! # Invariants
//! - `uuid` is generated exactly once, when the element value is built, and
//!   is never regenerated by storage.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Surrogate storage id of an element row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub i64);

impl Display for ElementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type tag of a registry element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// Single data element; typical member target.
    #[serde(rename = "dataelement")]
    DataElement,
    /// Composite record made of member elements.
    Record,
}

impl ElementType {
    /// Stable text used in URNs and storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataElement => "dataelement",
            Self::Record => "record",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dataelement" => Some(Self::DataElement),
            "record" => Some(Self::Record),
            _ => None,
        }
    }
}

/// Registry element row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// `None` until the row is persisted.
    pub id: Option<ElementId>,
    pub uuid: Uuid,
    pub element_type: ElementType,
}

impl Element {
    /// Builds an unsaved element with a freshly generated uuid.
    pub fn new(element_type: ElementType) -> Self {
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            element_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Element, ElementType};

    #[test]
    fn element_type_text_roundtrips() {
        for kind in [ElementType::DataElement, ElementType::Record] {
            assert_eq!(ElementType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ElementType::parse("namespace"), None);
    }

    #[test]
    fn new_elements_get_distinct_uuids() {
        let first = Element::new(ElementType::Record);
        let second = Element::new(ElementType::Record);
        assert!(first.id.is_none());
        assert_ne!(first.uuid, second.uuid);
    }
}
