use mdr_core::{
    Definition, ElementType, Identification, Member, Record, RecordValidationError, Slot, Status,
};
use serde_json::json;

#[test]
fn record_serialization_uses_expected_wire_fields() {
    let mut identification = Identification::new(3, ElementType::Record, Status::Released);
    identification.identifier = Some(12);
    identification.version = Some(2);
    let mut record = Record::new(
        identification,
        Definition::new("Visit", "One outpatient visit", "en"),
    );
    record.slots.push(Slot::new("source", "registry"));
    record.members.push(Member::new("urn:3:dataelement:4:1"));

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["identification"]["namespace_id"], 3);
    assert_eq!(json["identification"]["element_type"], "record");
    assert_eq!(json["identification"]["identifier"], 12);
    assert_eq!(json["identification"]["version"], 2);
    assert_eq!(json["identification"]["status"], "released");
    assert_eq!(json["definitions"][0]["language"], "en");
    assert_eq!(json["slots"][0]["name"], "source");
    assert_eq!(json["members"][0]["element_urn"], "urn:3:dataelement:4:1");

    let decoded: Record = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, record);
    assert_eq!(decoded.identification.urn().as_deref(), Some("urn:3:record:12:2"));
}

#[test]
fn record_without_slots_or_members_decodes_as_empty() {
    let decoded: Record = serde_json::from_value(json!({
        "identification": {
            "namespace_id": 1,
            "element_type": "record",
            "identifier": null,
            "version": null,
            "status": "draft"
        },
        "definitions": [
            { "designation": "Patient", "definition": "", "language": "de" }
        ]
    }))
    .unwrap();

    assert!(decoded.slots.is_empty());
    assert!(decoded.members.is_empty());
    assert_eq!(decoded.identification.urn(), None);
    assert!(decoded.validate().is_ok());
}

#[test]
fn validate_rejects_data_element_identification() {
    let record = Record::new(
        Identification::new(1, ElementType::DataElement, Status::Draft),
        Definition::new("Age", "Age in years", "en"),
    );

    assert_eq!(
        record.validate().unwrap_err(),
        RecordValidationError::NotARecord(ElementType::DataElement)
    );
}

#[test]
fn validate_reports_first_blank_slot_name() {
    let mut record = Record::new(
        Identification::new(1, ElementType::Record, Status::Draft),
        Definition::new("Visit", "", "en"),
    );
    record.slots.push(Slot::new("kept", "1"));
    record.slots.push(Slot::new("  ", "2"));

    assert_eq!(
        record.validate().unwrap_err(),
        RecordValidationError::BlankSlotName { index: 1 }
    );
}
