//! Edge Case Tests
//!
//! Rendering, bulk operations, unusual payloads, and property checks.

use lazystore::prelude::*;
use lazystore::Failure;
use proptest::prelude::*;
use std::collections::BTreeMap;

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn display_never_evaluates() {
    let store = LazyStore::<i32>::builder()
        .literal("x", 5)
        .producer("y", || panic!("display must not evaluate"))
        .build();

    assert_eq!(store.to_string(), r#"{"x": 5, "y": <producer>}"#);
    assert_eq!(store.state("y"), Some(EntryState::Defined));
}

#[test]
fn display_shows_captured_failures() {
    let store = LazyStore::<i32>::builder()
        .producer("bad", || bail!("no such snapshot"))
        .build();
    store.get("bad").unwrap_err();

    assert_eq!(store.to_string(), r#"{"bad": <error: no such snapshot>}"#);
}

#[test]
fn display_of_empty_store() {
    assert_eq!(LazyStore::<i32>::new().to_string(), "{}");
}

#[test]
fn debug_reports_states() {
    let store = LazyStore::<i32>::builder()
        .name("plot-options")
        .literal("dpi", 300)
        .build();
    store.get("dpi").unwrap();

    let rendered = format!("{:?}", store);
    assert!(rendered.contains("plot-options"));
    assert!(rendered.contains("write-once"));
    assert!(rendered.contains("Evaluated"));
    assert!(rendered.contains("Literal(300)"));
}

#[test]
fn states_serialize_for_diagnostics() {
    let store = LazyStore::<i32>::builder()
        .literal("a", 1)
        .producer("b", || Ok(2))
        .build();
    store.get("a").unwrap();

    let states: BTreeMap<String, EntryState> = store.states().into_iter().collect();
    let json = serde_json::to_string(&states).unwrap();
    assert_eq!(json, r#"{"a":"evaluated","b":"defined"}"#);
}

// ============================================================================
// Bulk operations
// ============================================================================

#[test]
fn update_applies_in_order() {
    let store = MutableLazyStore::<i32>::new();
    store
        .update([
            ("a", Payload::Literal(1)),
            ("b", Payload::producer(|| Ok(2))),
            ("a", Payload::Literal(3)),
        ])
        .unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.get("a").unwrap(), 3);
    assert_eq!(store.get("b").unwrap(), 2);
}

#[test]
fn update_stops_at_first_rejected_write() {
    let store = LazyStore::<i32>::from_entries([("frozen", Payload::Literal(0))]);
    store.get("frozen").unwrap();

    let err = store
        .update([
            ("before", Payload::Literal(1)),
            ("frozen", Payload::Literal(2)),
            ("after", Payload::Literal(3)),
        ])
        .unwrap_err();

    assert!(err.is_constant_redefinition());
    assert!(store.contains("before"));
    assert!(!store.contains("after"));
}

#[test]
fn clear_empties_mutable_store() {
    let store = MutableLazyStore::<i32>::builder()
        .literal("a", 1)
        .producer("b", || Ok(2))
        .build();
    store.get("a").unwrap();

    store.clear().unwrap();
    assert!(store.is_empty());
}

#[test]
fn clear_on_write_once_stops_at_frozen_entry() {
    let store = LazyStore::<i32>::from_entries([
        ("a", Payload::Literal(1)),
        ("b", Payload::Literal(2)),
        ("c", Payload::Literal(3)),
    ]);
    store.get("b").unwrap();

    assert!(store.clear().unwrap_err().is_constant_redefinition());
    assert_eq!(store.keys(), vec!["b", "c"]);
}

// ============================================================================
// Unusual payloads
// ============================================================================

#[test]
fn preresolved_payload_acts_like_literal() {
    let store = LazyStore::<i32>::from_entries([("r", Payload::Resolved(9))]);
    assert_eq!(store.get("r").unwrap(), 9);
    assert_eq!(store.state("r"), Some(EntryState::Evaluated));
}

#[test]
fn stored_failure_payload_replays_and_settles_as_error() {
    let failure = Failure::new(anyhow!("seeded failure"));
    let store = LazyStore::<i32>::from_entries([("f", Payload::Failed(failure.clone()))]);

    let err = store.get("f").unwrap_err();
    assert!(err.failure().unwrap().ptr_eq(&failure));
    assert_eq!(store.state("f"), Some(EntryState::Error));
}

#[test]
fn empty_string_key() {
    let store = LazyStore::<i32>::new();
    store.set("", 1).unwrap();
    assert!(store.contains(""));
    assert_eq!(store.get("").unwrap(), 1);
}

#[test]
fn producer_values_can_be_structs() {
    #[derive(Debug, Clone, PartialEq)]
    struct Binning {
        bins: usize,
        range: (f64, f64),
    }

    let store = LazyStore::<Binning>::builder()
        .producer("binning", || {
            Ok(Binning {
                bins: 64,
                range: (0.0, 1.0),
            })
        })
        .build();

    let binning = store.get("binning").unwrap();
    assert_eq!(binning.bins, 64);
    assert_eq!(binning.range, (0.0, 1.0));
}

#[test]
fn get_or_returns_default_only_when_missing() {
    let store = LazyStore::<i32>::from_entries([("present", Payload::Literal(1))]);
    assert_eq!(store.get_or("present", 0).unwrap(), 1);
    assert_eq!(store.get_or("absent", 0).unwrap(), 0);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn literal_reads_are_stable(entries in prop::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..32)) {
        let store: LazyStore<i64> = entries
            .iter()
            .map(|(k, v)| (k.clone(), Payload::Literal(*v)))
            .collect();

        prop_assert_eq!(store.len(), entries.len());
        for (key, value) in &entries {
            prop_assert_eq!(store.get(key).unwrap(), *value);
            prop_assert_eq!(store.state(key), Some(EntryState::Evaluated));
            prop_assert_eq!(store.get(key).unwrap(), *value);
        }
    }

    #[test]
    fn delete_removes_exactly_one(
        entries in prop::collection::btree_map("[a-z]{1,8}", any::<i32>(), 1..16),
        pick in any::<prop::sample::Index>(),
    ) {
        let store: MutableLazyStore<i32> = entries
            .iter()
            .map(|(k, v)| (k.clone(), Payload::Literal(*v)))
            .collect();
        let keys: Vec<_> = entries.keys().cloned().collect();
        let victim = pick.get(&keys);

        store.get(victim).unwrap();
        store.delete(victim).unwrap();

        prop_assert_eq!(store.len(), entries.len() - 1);
        prop_assert!(!store.contains(victim));
        prop_assert!(store.get(victim).unwrap_err().is_not_found());
    }
}
