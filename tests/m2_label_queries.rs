//! Tests for M2: Label Queries
//! Covers TC-2.1 rack scenario, TC-2.2 in/notin complement, TC-2.3 unknown keys,
//! TC-2.4 chained filters, TC-2.5 typed resources via factory
//!
//! Run individual tests with:
//! cargo test tc_2_2 -- --nocapture

use labelstore::{
    basic_factory, BasicResource, BoxError, LabelStore, Labels, Operator, Query, QueryMode, Resource,
    ResourceFactory, StoreConfig, StoreError,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

fn setup_store() -> LabelStore {
    let store = LabelStore::default();
    store.initialize().unwrap();
    store
}

fn rack(id: &str, value: &str) -> Arc<BasicResource> {
    Arc::new(BasicResource::new(id, "server").label("rack", value))
}

fn ids(store: &LabelStore, query: Query) -> Vec<String> {
    store.query(&query).unwrap().ids()
}

mod tc_2_1_rack_scenario {
    use super::*;

    #[test]
    fn test_rack_scenario() {
        let store = setup_store();
        let a = rack("a", "7");
        store.create(a.clone()).unwrap();
        store.create(rack("b", "8")).unwrap();

        assert_eq!(ids(&store, Query::equal("rack", "7")), vec!["a"]);
        assert_eq!(ids(&store, Query::any_of("rack", &["7", "8"])), vec!["a", "b"]);
        assert_eq!(ids(&store, Query::none_of("rack", &["7"])), vec!["b"]);
        assert_eq!(ids(&store, Query::not_equal("rack", "8")), vec!["a"]);

        store.delete(&*a).unwrap();
        assert!(ids(&store, Query::equal("rack", "7")).is_empty());
    }

    #[test]
    fn test_results_keyed_by_type() {
        let store = setup_store();
        store.create(rack("a", "7")).unwrap();
        store.create(Arc::new(BasicResource::new("sw", "switch").label("rack", "7"))).unwrap();

        let hits = store.query(&Query::equal("rack", "7")).unwrap();
        let mut keys: Vec<&str> = hits.keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["server", "switch"]);
        assert_eq!(hits.get("switch").unwrap().ids(), vec!["sw"]);

        let json = hits.to_json();
        assert_eq!(json["switch"][0], json!({"id": "sw", "type": "switch", "labels": {"rack": "7"}}));
    }
}

mod tc_2_2_in_notin_complement {
    use super::*;

    #[test]
    fn test_in_and_notin_partition_key_holders() {
        let mut rng = StdRng::seed_from_u64(7);
        let store = setup_store();
        let values = ["1", "2", "3", "4", "5"];

        let mut holders = BTreeSet::new();
        for i in 0..200 {
            let id = format!("r{}", i);
            let mut res = BasicResource::new(&id, if i % 3 == 0 { "switch" } else { "server" });
            if rng.gen_bool(0.8) {
                res = res.label("rack", values[rng.gen_range(0..values.len())]);
                holders.insert(id.clone());
            }
            if rng.gen_bool(0.5) {
                res = res.label("row", "x");
            }
            store.create(Arc::new(res)).unwrap();
        }

        for split in 0..=values.len() {
            let chosen = &values[..split];
            let inside: BTreeSet<String> = ids(&store, Query::any_of("rack", chosen)).into_iter().collect();
            let outside: BTreeSet<String> = ids(&store, Query::none_of("rack", chosen)).into_iter().collect();

            assert!(inside.is_disjoint(&outside), "split {}", split);
            let union: BTreeSet<String> = inside.union(&outside).cloned().collect();
            assert_eq!(union, holders, "split {}", split);
        }
    }

    #[test]
    fn test_notin_ignores_resources_without_key() {
        let store = setup_store();
        store.create(rack("a", "7")).unwrap();
        store.create(Arc::new(BasicResource::new("b", "server").label("row", "x"))).unwrap();

        assert_eq!(ids(&store, Query::none_of("rack", &["8"])), vec!["a"]);
    }
}

mod tc_2_3_unknown_keys {
    use super::*;

    #[test]
    fn test_unknown_key_is_empty() {
        let store = setup_store();
        store.create(rack("a", "7")).unwrap();

        assert!(ids(&store, Query::any_of("nonexistent-key", &["x"])).is_empty());
        assert!(ids(&store, Query::none_of("nonexistent-key", &["x"])).is_empty());
        assert!(ids(&store, Query::equal("rack", "nonexistent-value")).is_empty());
        assert!(store.label_values("nonexistent-key").unwrap().is_empty());
    }

    #[test]
    fn test_empty_store_queries() {
        let store = setup_store();
        for op in [Operator::MatchIn, Operator::MatchNotIn] {
            assert!(store.query(&Query::new(op, "rack", ["7"])).unwrap().is_empty());
        }
    }

    #[test]
    fn test_malformed_queries_by_mode() {
        let strict = setup_store();
        let lenient = LabelStore::new(StoreConfig::new(QueryMode::Lenient));
        lenient.initialize().unwrap();
        for store in [&strict, &lenient] {
            store.create(rack("a", "7")).unwrap();
        }

        let bad = [
            Query::new(Operator::MatchEqual, "rack", ["7", "8"]),
            Query::new(Operator::MatchNotEqual, "rack", Vec::<String>::new()),
        ];
        for q in &bad {
            assert!(matches!(strict.query(q), Err(StoreError::InvalidQuery(_))));
            assert!(lenient.query(q).unwrap().is_empty());
        }
    }
}

mod tc_2_4_chained_filters {
    use super::*;

    #[test]
    fn test_query_all_narrows_results() {
        let store = setup_store();
        let mk = |id: &str, rack: &str, row: &str| Arc::new(BasicResource::new(id, "server").label("rack", rack).label("row", row));
        store.create(mk("a", "7", "1")).unwrap();
        store.create(mk("b", "7", "2")).unwrap();
        store.create(mk("c", "8", "2")).unwrap();

        let queries = Query::parse_many(
            &json!([
                {"op": "in", "key": "rack", "values": ["7", "8"]},
                {"op": "!=", "key": "row", "values": ["1"]},
                {"op": "notin", "key": "rack", "values": ["8"]}
            ])
            .to_string(),
        )
        .unwrap();

        assert_eq!(store.query_all(&queries).unwrap().ids(), vec!["b"]);
        assert_eq!(store.query_all(&queries[..1]).unwrap().ids(), vec!["a", "b", "c"]);
        assert!(store.query_all(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_label_introspection() {
        let store = setup_store();
        store.create(rack("a", "7")).unwrap();
        store.create(rack("b", "8")).unwrap();
        assert_eq!(store.label_keys().unwrap(), vec!["rack"]);
        assert_eq!(store.label_values("rack").unwrap(), vec!["7", "8"]);
    }
}

mod tc_2_5_typed_resources {
    use super::*;

    /// Server with a mandatory rack unit position
    #[derive(Debug, Default, Deserialize)]
    struct Server {
        id: String,
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        labels: Labels,
        rack_unit: u32,
    }

    impl Resource for Server {
        fn id(&self) -> &str {
            &self.id
        }

        fn resource_type(&self) -> &str {
            &self.kind
        }

        fn labels(&self) -> &Labels {
            &self.labels
        }

        fn validate(&self) -> Result<(), BoxError> {
            if self.rack_unit == 0 {
                return Err("rack_unit must be positive".into());
            }
            Ok(())
        }
    }

    fn factory() -> ResourceFactory {
        let factory = basic_factory(&["vlan"]);
        factory.register::<Server>("server");
        factory
    }

    #[test]
    fn test_decoded_resources_are_indexed() {
        let factory = factory();
        let store = setup_store();

        let payloads = [
            json!({"id": "s1", "type": "server", "rack_unit": 4, "labels": {"rack": "7"}}),
            json!({"id": "v1", "type": "vlan", "labels": {"rack": "7", "vid": "100"}}),
        ];
        for p in payloads {
            store.create(factory.decode_value(p).unwrap()).unwrap();
        }

        let hits = store.query(&Query::equal("rack", "7")).unwrap();
        assert_eq!(hits.ids(), vec!["s1", "v1"]);
        assert_eq!(hits.get("vlan").unwrap().ids(), vec!["v1"]);
    }

    #[test]
    fn test_type_specific_validation() {
        let factory = factory();
        let store = setup_store();

        let res = factory
            .decode(&json!({"id": "s1", "type": "server", "rack_unit": 0}).to_string())
            .unwrap();
        let err = store.create(res).unwrap_err();
        assert!(matches!(err, StoreError::Validation { ref id, .. } if id == "s1"));
        assert!(store.is_empty().unwrap());

        let zero = factory.new_resource("server").unwrap();
        assert!(zero.validate().is_err());
    }
}
