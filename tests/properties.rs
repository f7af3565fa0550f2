//! Property tests for keyed storage and the list-version token.

use proptest::prelude::*;
use shared_map::{Element, Id, MapOptions, SharedMap};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
struct Record {
    id: i64,
    value: u8,
}

impl Element for Record {
    fn id(&self, key_field: &str) -> Option<Id> {
        (key_field == "id").then_some(Id::Num(self.id))
    }
}

#[derive(Debug, Clone)]
enum Op {
    Add(Vec<Record>),
    Remove(Vec<i64>),
    Reset,
}

fn record() -> impl Strategy<Value = Record> {
    (0i64..16, any::<u8>()).prop_map(|(id, value)| Record { id, value })
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => prop::collection::vec(record(), 0..6).prop_map(Op::Add),
        3 => prop::collection::vec(0i64..16, 0..4).prop_map(Op::Remove),
        1 => Just(Op::Reset),
    ]
}

proptest! {
    #[test]
    fn default_records_are_keyed_by_id(records in prop::collection::vec(record(), 0..24)) {
        let map = SharedMap::new("id", MapOptions::default().with_default_data(records.clone())).unwrap();

        let mut expected: HashMap<i64, Record> = HashMap::new();
        for r in records {
            expected.insert(r.id, r);
        }

        prop_assert_eq!(map.len(), expected.len());
        for (id, r) in &expected {
            let got = map.get(*id);
            prop_assert_eq!(got.as_ref(), Some(r));
        }
    }

    #[test]
    fn operations_match_a_plain_hash_map(ops in prop::collection::vec(op(), 0..32)) {
        let map: SharedMap<Record> = SharedMap::empty("id");
        let mut model: HashMap<i64, Record> = HashMap::new();

        for op in ops {
            let before = map.update_id();
            let model_before = model.clone();
            let is_reset = matches!(op, Op::Reset);

            match op {
                Op::Add(records) => {
                    map.add(records.clone()).unwrap();
                    for r in records {
                        model.insert(r.id, r);
                    }
                }
                Op::Remove(ids) => {
                    map.remove(ids.clone()).unwrap();
                    for id in ids {
                        model.remove(&id);
                    }
                }
                Op::Reset => {
                    map.reset().unwrap();
                    model.clear();
                    prop_assert_ne!(map.update_id(), before);
                }
            }

            // Reset always moves the token; add and remove only on a real change
            if model != model_before {
                prop_assert_ne!(map.update_id(), before);
            } else if !is_reset {
                prop_assert_eq!(map.update_id(), before);
            }

            prop_assert_eq!(map.len(), model.len());
            for id in 0i64..16 {
                prop_assert_eq!(map.get(id), model.get(&id).cloned());
            }
        }
    }
}
