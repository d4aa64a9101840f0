use std::io::Write;
use std::sync::Arc;
use std::thread;

use record_store::{fields_from_json, seed_store, RecordStore, StoreError};
use serde_json::json;
use tempfile::NamedTempFile;

fn payload(value: serde_json::Value) -> record_store::Fields {
    fields_from_json(value).expect("object payload")
}

#[test]
fn ids_are_strictly_increasing_and_never_reused() {
    let store = RecordStore::new();
    let mut seen = Vec::new();
    for i in 0..10 {
        seen.push(store.insert(payload(json!({ "n": i }))).id);
    }
    assert!(seen.windows(2).all(|w| w[0] < w[1]));

    // Deleting the newest record must not hand its id out again.
    store.delete(10).unwrap();
    store.delete(3).unwrap();
    let next = store.insert(payload(json!({ "n": "after" })));
    assert_eq!(next.id, 11);
    assert!(matches!(store.get(10), Err(StoreError::NotFound(10))));
}

#[test]
fn update_always_keeps_the_path_id() {
    let store = RecordStore::new();
    let rec = store.insert(payload(json!({ "address": "123" })));

    let updated = store
        .update(rec.id, payload(json!({ "id": 500, "address": "456" })))
        .unwrap();
    assert_eq!(updated.id, rec.id);
    assert_eq!(updated.to_json(), json!({ "address": "456", "id": 1 }));
    assert!(matches!(store.get(500), Err(StoreError::NotFound(500))));
}

#[test]
fn insert_then_get_round_trips() {
    let store = RecordStore::new();
    let body = json!({
        "protocol": "0",
        "address": "M-Money",
        "date": "1715351458724",
        "read": 1,
        "contact_name": null
    });
    let created = store.insert(payload(body.clone()));

    let mut expected = body;
    expected["id"] = json!(created.id);
    assert_eq!(store.get(created.id).unwrap().to_json(), expected);
}

#[test]
fn concurrent_inserts_get_distinct_ids() {
    let store = Arc::new(RecordStore::new());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            thread::spawn(move || {
                (0..50)
                    .map(|i| store.insert(payload(json!({ "t": t, "i": i }))).id)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 400);
    assert_eq!(store.len(), 400);
    assert_eq!(store.next_id(), 401);
}

#[test]
fn seeding_assigns_ids_in_source_order() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
            {{"protocol": "0", "address": "M-Money", "body": "You have received 2000 RWF"}},
            {{"id": "77", "protocol": "0", "address": "M-Money", "body": "Your payment of 1000 RWF"}}
        ]"#
    )
    .unwrap();

    let store = RecordStore::new();
    assert_eq!(seed_store(&store, file.path()), 2);

    let records = store.list_all();
    assert_eq!(records[0].id, 1);
    assert_eq!(records[1].id, 2);
    assert_eq!(
        records[1].get("body").and_then(|v| v.as_str()),
        Some("Your payment of 1000 RWF")
    );
    assert_eq!(store.next_id(), 3);
}

#[test]
fn failed_seeding_leaves_store_empty() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"[{{"address": "ok"}}, "not a record"]"#).unwrap();

    let store = RecordStore::new();
    assert_eq!(seed_store(&store, file.path()), 0);
    assert!(store.is_empty());

    let missing = file.path().with_extension("missing");
    assert_eq!(seed_store(&store, &missing), 0);
    assert!(store.is_empty());
    assert_eq!(store.next_id(), 1);
}
