use report_spec::{
    DocumentKind, DocumentStore, EngineError, HeaderSet, MemoryStore, StoreGridItems,
    build_assessment_headers,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "bundle" => include_str!("../tests/fixtures/bundle.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn store() -> MemoryStore {
    MemoryStore::from_json(fixture("bundle")).expect("deserialize bundle")
}

fn headers_for(store: &MemoryStore, assessment_id: &str) -> HeaderSet {
    let grid_items = StoreGridItems::new(store);
    build_assessment_headers(store, &grid_items, assessment_id).expect("headers")
}

#[test]
fn location_and_gps_headers_follow_rank_order() {
    let store = store();
    let headers = headers_for(&store, "a-loc");
    assert_eq!(
        headers.keys(),
        vec![
            "a-loc.assessment_id",
            "a-loc.assessment_name",
            "a-loc.enumerator",
            "a-loc.start_time",
            "a-loc.order_map",
            "S1.lat",
            "S1.lon",
            "S1.timestamp_0",
            "S2.latitude",
            "S2.longitude",
            "S2.accuracy",
            "S2.altitude",
            "S2.altitudeAccuracy",
            "S2.heading",
            "S2.speed",
            "S2.timestamp_1",
            "end_time",
        ]
    );
    assert_eq!(headers.column_headers[0].header, "Assessment ID");
    assert_eq!(headers.column_headers[5].header, "lat");
}

#[test]
fn repeated_prototypes_take_numeric_suffixes() {
    let store = store();
    let keys = headers_for(&store, "a-consent")
        .keys()
        .into_iter()
        .skip(5)
        .map(String::from)
        .collect::<Vec<_>>();
    assert_eq!(
        keys,
        vec![
            "C1.consent",
            "C1.timestamp_0",
            "C2.consent_1",
            "C2.timestamp_1",
            "end_time"
        ]
    );
}

#[test]
fn survey_questions_and_unknown_prototypes() {
    let store = store();
    let headers = headers_for(&store, "a-full");
    let keys = headers.keys();

    assert!(!keys.iter().any(|key| key.starts_with("F-audio")));
    let head = keys
        .iter()
        .position(|key| *key == "F-survey.head_name")
        .expect("head_name column");
    assert_eq!(keys[head + 1], "F-survey.household_size");
    assert_eq!(keys[head + 2], "F-survey.timestamp_2");
    assert!(keys.contains(&"F-survey2.has_water_1"));
    assert!(keys.contains(&"F-date.assess_time"));
    assert!(keys.contains(&"F-id.participant_id"));
    assert!(keys.contains(&"F-photo.photo_url"));
    assert_eq!(keys[keys.len() - 2], "F-gps.timestamp_5");

    let photo = headers
        .column_headers
        .iter()
        .find(|descriptor| descriptor.key == "F-photo.photo_captured")
        .expect("photo column");
    assert_eq!(photo.header, "house photo_captured");
}

#[test]
fn only_the_first_grid_becomes_columns() {
    let store = store();
    let keys = headers_for(&store, "a-grid")
        .keys()
        .into_iter()
        .skip(5)
        .map(String::from)
        .collect::<Vec<_>>();
    assert_eq!(
        keys,
        vec![
            "G1.auto_stop",
            "G1.time_remain",
            "G1.capture_item_at_time",
            "G1.attempted",
            "G1.time_intermediate_captured",
            "G1.time_allowed",
            "G1.a",
            "G1.b",
            "G1.c",
            "G1.timestamp_0",
            // G2 is left out but still advanced the timestamp counter by its two items.
            "P1.consent",
            "P1.timestamp_5",
            "end_time",
        ]
    );
}

#[test]
fn header_generation_is_idempotent() {
    let store = store();
    let first = serde_json::to_string(&headers_for(&store, "a-full")).expect("encode");
    let second = serde_json::to_string(&headers_for(&store, "a-full")).expect("encode");
    assert_eq!(first, second);
}

#[test]
fn unknown_assessment_is_not_found() {
    let store = store();
    let grid_items = StoreGridItems::new(&store);
    let err = build_assessment_headers(&store, &grid_items, "missing").unwrap_err();
    assert!(matches!(
        err,
        EngineError::NotFound {
            kind: DocumentKind::Assessment,
            ref id
        } if id == "missing"
    ));
    assert!(store.workflow("w1").is_ok());
}

#[test]
fn header_record_serializes_column_headers() {
    let store = store();
    let value = serde_json::to_value(headers_for(&store, "a-consent")).expect("encode");
    let columns = value["column_headers"].as_array().expect("columns");
    assert_eq!(columns[5]["key"], "C1.consent");
    assert_eq!(columns[7]["header"], "consent_1");
}
