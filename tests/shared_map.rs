#![cfg(feature = "json")]

use serde_json::{json, Value};
use shared_map::{ErrorCode, Id, Listener, MapOptions, Severity, SharedMap};
use std::cell::Cell;
use std::rc::Rc;

fn people() -> SharedMap<Value> {
    SharedMap::new(
        "id",
        MapOptions::default()
            .with_label("people")
            .with_default_data([json!({ "id": 1, "name": "a" }), json!({ "id": 2, "name": "b" })]),
    )
    .unwrap()
}

#[test]
fn concrete_scenario() {
    let map = people();

    assert_eq!(map.get(1), Some(json!({ "id": 1, "name": "a" })));

    map.add([json!({ "id": 2, "name": "c" })]).unwrap();
    assert_eq!(map.get(2), Some(json!({ "id": 2, "name": "c" })));
    assert_eq!(map.data().len(), 2);

    map.remove([1]).unwrap();
    assert_eq!(map.get(1), None);
    assert_eq!(map.data().len(), 1);

    map.reset().unwrap();
    assert_eq!(map.data().len(), 0);
}

#[test]
fn every_default_record_is_retrievable_by_its_key() {
    let records = vec![
        json!({ "id": "x", "v": 1 }),
        json!({ "id": "y", "v": 2 }),
        json!({ "id": 10, "v": 3 }),
    ];
    let map = SharedMap::new("id", MapOptions::default().with_default_data(records.clone())).unwrap();

    for record in &records {
        let id = match &record["id"] {
            Value::String(s) => Id::from(s.as_str()),
            other => Id::Num(other.as_i64().unwrap()),
        };
        assert_eq!(map.get(id).as_ref(), Some(record));
    }
}

#[test]
fn numeric_string_and_number_ids_are_one_key() {
    let map: SharedMap<Value> = SharedMap::empty("id");
    map.add([json!({ "id": 1, "from": "number" })]).unwrap();
    map.add([json!({ "id": "1", "from": "string" })]).unwrap();

    assert_eq!(map.len(), 1);
    assert_eq!(map.get(1), Some(json!({ "id": "1", "from": "string" })));
    assert_eq!(map.get("1"), map.get(1));

    // A route parameter finds a record keyed by number
    let route_param = String::from("1");
    assert!(map.contains(&route_param));

    map.remove(["1"]).unwrap();
    assert!(map.is_empty());
}

#[test]
fn non_canonical_numeric_strings_stay_strings() {
    let map: SharedMap<Value> = SharedMap::empty("id");
    map.add([json!({ "id": 1 }), json!({ "id": "01" }), json!({ "id": 1.0 })]).unwrap();

    assert_eq!(map.len(), 2);
    assert_eq!(map.get(1), Some(json!({ "id": 1.0 })));
    assert_eq!(map.get("01"), Some(json!({ "id": "01" })));
}

#[test]
fn wide_integer_ids() {
    let map: SharedMap<Value> = SharedMap::empty("id");
    map.add([json!({ "id": 3 }), json!({ "id": u64::MAX })]).unwrap();

    let index: usize = 3;
    assert!(map.contains(index));
    assert!(map.contains(u64::MAX));
    assert!(map.contains(u64::MAX.to_string()));
}

#[test]
fn changing_and_reverting_in_one_add_is_a_no_op() {
    let map = people();
    let hits = Rc::new(Cell::new(0));
    let list = Listener::new({
        let hits = hits.clone();
        move || hits.set(hits.get() + 1)
    });
    map.register_list(&list);
    let before = map.update_id();

    map.add([json!({ "id": 1, "name": "tmp" }), json!({ "id": 1, "name": "a" })])
        .unwrap();

    assert_eq!(map.get(1), Some(json!({ "id": 1, "name": "a" })));
    assert_eq!(map.update_id(), before);
    assert_eq!(hits.get(), 0);
}

#[test]
fn custom_key_field() {
    let map: SharedMap<Value> = SharedMap::empty("sku");
    map.add([json!({ "sku": "A-1", "qty": 3 })]).unwrap();

    assert_eq!(map.key(), "sku");
    assert!(map.contains("A-1"));
}

#[test]
fn record_without_key_field_is_rejected() {
    let map = people();
    let before = map.update_id();

    let err = map
        .add([json!({ "id": 3, "name": "ok" }), json!({ "name": "no id" })])
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::AddData);
    assert_eq!(err.severity(), Severity::High);
    assert_eq!(err.name(), "State Error");
    assert_eq!(err.message(), "Error adding data");

    // Keys are checked before anything is written
    assert!(!map.contains(3));
    assert_eq!(map.update_id(), before);
}

#[test]
fn later_call_wins() {
    let map = people();

    map.remove([2]).unwrap();
    map.add([json!({ "id": 2, "name": "back" })]).unwrap();
    assert_eq!(map.get(2), Some(json!({ "id": 2, "name": "back" })));

    map.add([json!({ "id": 2, "name": "again" })]).unwrap();
    map.remove([2]).unwrap();
    assert_eq!(map.get(2), None);
}

#[test]
fn token_changes_on_every_membership_mutation() {
    let map = people();
    let mut seen = vec![map.update_id()];

    map.add([json!({ "id": 3 })]).unwrap();
    seen.push(map.update_id());

    map.remove([3]).unwrap();
    seen.push(map.update_id());

    map.refresh([1]).unwrap();
    seen.push(map.update_id());

    map.reset_to([json!({ "id": 9 })]).unwrap();
    seen.push(map.update_id());

    for pair in seen.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
}

#[test]
fn list_listener_versus_element_listener() {
    let map = people();

    let list_hits = Rc::new(Cell::new(0));
    let list = Listener::new({
        let list_hits = list_hits.clone();
        move || list_hits.set(list_hits.get() + 1)
    });
    map.register_list(&list);

    let element_hits = Rc::new(Cell::new(0));
    let element = Listener::new({
        let element_hits = element_hits.clone();
        move || element_hits.set(element_hits.get() + 1)
    });
    map.register_element(&element, [1]);

    map.add([json!({ "id": 2, "name": "unrelated" })]).unwrap();
    assert_eq!((list_hits.get(), element_hits.get()), (1, 0));

    map.add([json!({ "id": 1, "name": "related" })]).unwrap();
    assert_eq!((list_hits.get(), element_hits.get()), (2, 1));

    map.add([json!({ "id": 3 })]).unwrap();
    assert_eq!((list_hits.get(), element_hits.get()), (3, 1));
}

#[test]
fn handles_share_one_collection() {
    let map = people();
    let other = map.clone();

    other.add([json!({ "id": 5 })]).unwrap();
    assert!(map.contains(5));
}

#[test]
fn ids_lists_every_key() {
    let map = people();
    let mut ids = map.ids();
    ids.sort();
    assert_eq!(ids, vec![Id::Num(1), Id::Num(2)]);
}
