use mdr_core::db::open_db_in_memory;
use mdr_core::{
    Element, ElementRepository, ElementType, Identification, IdentificationRepository,
    NamespaceAccess, NamespaceRepository, RepoError, SqliteElementRepository,
    SqliteIdentificationRepository, SqliteNamespaceRepository, Status, UserContext,
};
use rusqlite::Connection;

const OWNER: UserContext = UserContext { user_id: 1 };

fn setup() -> (Connection, i64) {
    let conn = open_db_in_memory().unwrap();
    let namespace_id = SqliteNamespaceRepository::try_new(&conn)
        .unwrap()
        .create_namespace(&OWNER, "registry")
        .unwrap();
    (conn, namespace_id)
}

fn data_element(conn: &Connection, namespace_id: i64, status: Status) -> (i64, String) {
    let elements = SqliteElementRepository::try_new(conn).unwrap();
    let identifications = SqliteIdentificationRepository::try_new(conn).unwrap();
    let element_id = elements
        .create_element(&Element::new(ElementType::DataElement))
        .unwrap();
    let stored = identifications
        .create(
            &OWNER,
            &Identification::new(namespace_id, ElementType::DataElement, status),
            element_id,
        )
        .unwrap();
    (element_id.0, stored.urn())
}

#[test]
fn namespace_creator_holds_write_and_grants_replace() {
    let (conn, namespace_id) = setup();
    let namespaces = SqliteNamespaceRepository::try_new(&conn).unwrap();

    assert_eq!(
        namespaces.access_level(namespace_id, OWNER.user_id).unwrap(),
        Some(NamespaceAccess::Write)
    );
    assert_eq!(namespaces.access_level(namespace_id, 2).unwrap(), None);

    namespaces
        .grant_access(namespace_id, 2, NamespaceAccess::Write)
        .unwrap();
    namespaces
        .grant_access(namespace_id, 2, NamespaceAccess::Read)
        .unwrap();
    assert_eq!(
        namespaces.access_level(namespace_id, 2).unwrap(),
        Some(NamespaceAccess::Read)
    );

    assert!(namespaces.create_namespace(&OWNER, "   ").is_err());
}

#[test]
fn identifiers_are_allocated_per_namespace_and_type() {
    let (conn, namespace_id) = setup();
    let other_namespace = SqliteNamespaceRepository::try_new(&conn)
        .unwrap()
        .create_namespace(&OWNER, "other")
        .unwrap();

    let (_, first) = data_element(&conn, namespace_id, Status::Draft);
    let (_, second) = data_element(&conn, namespace_id, Status::Draft);
    let (_, elsewhere) = data_element(&conn, other_namespace, Status::Draft);

    assert_eq!(first, "urn:1:dataelement:1:1");
    assert_eq!(second, "urn:1:dataelement:2:1");
    assert_eq!(elsewhere, "urn:2:dataelement:1:1");
}

#[test]
fn identification_create_requires_write_grant() {
    let (conn, namespace_id) = setup();
    let elements = SqliteElementRepository::try_new(&conn).unwrap();
    let identifications = SqliteIdentificationRepository::try_new(&conn).unwrap();
    let element_id = elements
        .create_element(&Element::new(ElementType::DataElement))
        .unwrap();

    let err = identifications
        .create(
            &UserContext::new(9),
            &Identification::new(namespace_id, ElementType::DataElement, Status::Draft),
            element_id,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::AccessDenied {
            namespace_id: 1,
            user_id: 9
        }
    ));

    let err = identifications
        .create(
            &OWNER,
            &Identification::new(77, ElementType::DataElement, Status::Draft),
            element_id,
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::UnknownNamespace(77)));
}

#[test]
fn identification_update_moves_status_forward_only() {
    let (conn, namespace_id) = setup();
    let identifications = SqliteIdentificationRepository::try_new(&conn).unwrap();
    let (element_id, urn) = data_element(&conn, namespace_id, Status::Released);
    let element_id = mdr_core::ElementId(element_id);

    let mut parsed = identifications.parse(&urn).unwrap();
    parsed.status = Status::Draft;
    let err = identifications
        .update(&OWNER, &parsed, element_id)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::InvalidStatusTransition {
            from: Status::Released,
            to: Status::Draft
        }
    ));

    parsed.status = Status::Outdated;
    let updated = identifications.update(&OWNER, &parsed, element_id).unwrap();
    assert_eq!(updated.identification.status, Status::Outdated);
    assert_eq!(updated.urn(), urn);

    let stored = identifications.get(&parsed).unwrap().unwrap();
    assert_eq!(stored.identification.status, Status::Outdated);
}

#[test]
fn create_version_keeps_identifier_and_bumps_version() {
    let (conn, namespace_id) = setup();
    let elements = SqliteElementRepository::try_new(&conn).unwrap();
    let identifications = SqliteIdentificationRepository::try_new(&conn).unwrap();
    let (_, urn) = data_element(&conn, namespace_id, Status::Released);
    let previous = identifications
        .get(&identifications.parse(&urn).unwrap())
        .unwrap()
        .unwrap();

    let element_id = elements
        .create_element(&Element::new(ElementType::DataElement))
        .unwrap();
    let next = identifications
        .create_version(
            &OWNER,
            &Identification::new(namespace_id, ElementType::DataElement, Status::Draft),
            element_id,
            &previous.identification,
        )
        .unwrap();

    assert_eq!(next.urn(), "urn:1:dataelement:1:2");
    assert_eq!(next.identification.status, Status::Draft);
    assert_eq!(next.element_id, element_id);
}

#[test]
fn resolve_by_urns_skips_unknown_and_duplicate_urns_in_request_order() {
    let (conn, namespace_id) = setup();
    let elements = SqliteElementRepository::try_new(&conn).unwrap();
    let (first_id, first) = data_element(&conn, namespace_id, Status::Released);
    let (second_id, second) = data_element(&conn, namespace_id, Status::Released);

    let requested = vec![
        second.clone(),
        "urn:1:dataelement:404:1".to_string(),
        first.clone(),
        second.clone(),
        "not-a-urn".to_string(),
    ];
    let resolved = elements.resolve_by_urns(&OWNER, &requested).unwrap();

    let urns: Vec<&str> = resolved.iter().map(|item| item.urn.as_str()).collect();
    assert_eq!(urns, vec![second.as_str(), first.as_str()]);
    let ids: Vec<i64> = resolved
        .iter()
        .map(|item| item.element_id().unwrap().0)
        .collect();
    assert_eq!(ids, vec![second_id, first_id]);
    assert!(resolved
        .iter()
        .all(|item| item.element.element_type == ElementType::DataElement));
}

#[test]
fn deleting_missing_rows_reports_not_found() {
    let (conn, _) = setup();
    let elements = SqliteElementRepository::try_new(&conn).unwrap();
    let identifications = SqliteIdentificationRepository::try_new(&conn).unwrap();

    assert!(matches!(
        elements.delete_element(mdr_core::ElementId(404)),
        Err(RepoError::NotFound(_))
    ));
    assert!(matches!(
        identifications.delete(mdr_core::IdentificationId(404)),
        Err(RepoError::NotFound(_))
    ));
    assert_eq!(
        elements.get_element(mdr_core::ElementId(404)).unwrap(),
        None
    );
}
