//! Tests for Store
//!
//! These tests verify:
//! - Reads served from memory (get / get_all)
//! - Record creation with generated and explicit ids
//! - In-place updates and not-found signalling
//! - The on-disk rows/index format written by save
//! - Index rebuilding and the validation hook

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use shelfdb::store::{INDEX_FILENAME, ROWS_FILENAME};
use shelfdb::{Record, RecordIndex, RecordValidator, SchemaDescriptor, ShelfError, Store, WriteOp};
use tempfile::TempDir;
use uuid::{Uuid, Version};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::new("contacts", temp_dir.path().join("contacts")).with_sync_writes(false);
    (temp_dir, store)
}

fn read_rows(store: &Store) -> Vec<Value> {
    fs::read_to_string(store.dir().join(ROWS_FILENAME))
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn read_index(store: &Store) -> Value {
    serde_json::from_str(&fs::read_to_string(store.dir().join(INDEX_FILENAME)).unwrap()).unwrap()
}

fn assert_index_consistent(store: &Store) {
    let records = store.get_all();
    for (id, pos) in store.index().iter() {
        assert_eq!(records[pos].id(), Some(id), "index entry {} -> {}", id, pos);
    }
}

fn record(value: Value) -> Record {
    Record::from_value(value).unwrap()
}

// =============================================================================
// Create Tests
// =============================================================================

#[test]
fn test_create_generates_uuid_v4() {
    let (_temp, store) = setup_temp_store();

    let id = store.create(json!({})).unwrap();

    let parsed = Uuid::parse_str(&id).unwrap();
    assert_eq!(parsed.get_version(), Some(Version::Random));
    assert_eq!(store.get(&id).unwrap().id(), Some(id.as_str()));
}

#[test]
fn test_create_generates_distinct_ids() {
    let (_temp, store) = setup_temp_store();

    let a = store.create(json!({ "n": 1 })).unwrap();
    let b = store.create(json!({ "n": 2 })).unwrap();

    assert_ne!(a, b);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_create_keeps_explicit_id() {
    let (_temp, store) = setup_temp_store();

    let id = store.create(json!({ "id": "piet", "age": 42 })).unwrap();

    assert_eq!(id, "piet");
    assert_eq!(store.get("piet").unwrap().get("age"), Some(&json!(42)));
}

#[test]
fn test_create_replaces_null_or_empty_id() {
    let (_temp, store) = setup_temp_store();

    let from_null = store.create(json!({ "id": null })).unwrap();
    let from_empty = store.create(json!({ "id": "" })).unwrap();

    assert!(Uuid::parse_str(&from_null).is_ok());
    assert!(Uuid::parse_str(&from_empty).is_ok());
}

#[test]
fn test_create_rejects_non_string_id() {
    let (_temp, store) = setup_temp_store();

    for id in [json!(7), json!(0), json!(false), json!(true), json!([]), json!({})] {
        let result = store.create(json!({ "id": id }));
        assert!(
            matches!(result, Err(ShelfError::InvalidRecord(_))),
            "id {} should be rejected",
            id
        );
    }
    assert!(store.is_empty());
}

#[test]
fn test_create_rejects_non_object() {
    let (_temp, store) = setup_temp_store();

    let result = store.create(json!(["not", "a", "record"]));

    assert!(matches!(result, Err(ShelfError::InvalidRecord(_))));
    assert!(!store.dir().exists());
}

#[test]
fn test_create_does_not_modify_input() {
    let (_temp, store) = setup_temp_store();
    let data = json!({ "name": "Piet" });

    let id = store.create(data.clone()).unwrap();

    assert_eq!(data, json!({ "name": "Piet" }));
    assert_eq!(
        store.get(&id).unwrap().into_value(),
        json!({ "id": id, "name": "Piet" })
    );
}

#[test]
fn test_create_duplicate_id_orphans_previous() {
    let (_temp, store) = setup_temp_store();

    store.create(json!({ "id": "dup", "v": 1 })).unwrap();
    store.create(json!({ "id": "dup", "v": 2 })).unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.get("dup").unwrap().get("v"), Some(&json!(2)));
    assert_eq!(store.index().get("dup"), Some(1));
    assert_index_consistent(&store);
}

#[test]
fn test_create_persists_both_files() {
    let (_temp, store) = setup_temp_store();

    let a = store.create(json!({ "n": 1 })).unwrap();
    let b = store.create(json!({ "n": 2 })).unwrap();

    let rows = read_rows(&store);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], json!({ "id": a, "n": 1 }));
    assert_eq!(rows[1], json!({ "id": b, "n": 2 }));

    let index = read_index(&store);
    assert_eq!(index[&a], json!(0));
    assert_eq!(index[&b], json!(1));
}

#[test]
fn test_create_failed_save_keeps_memory_ahead_of_disk() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    fs::write(&blocker, b"a file where the store directory should be").unwrap();

    let store = Store::new("blocked", &blocker);
    let result = store.create(json!({ "id": "x" }));

    assert!(matches!(result, Err(ShelfError::FileIo { .. })));
    assert_eq!(store.len(), 1);
    assert!(store.get("x").is_some());
}

// =============================================================================
// Get Tests
// =============================================================================

#[test]
fn test_get_unknown_id() {
    let (_temp, store) = setup_temp_store();

    store.create(json!({ "id": "a" })).unwrap();

    assert!(store.get("b").is_none());
    assert!(!store.contains("b"));
    assert!(store.contains("a"));
}

#[test]
fn test_get_all_preserves_insertion_order() {
    let (_temp, store) = setup_temp_store();

    for name in ["c", "a", "b"] {
        store.create(json!({ "id": name })).unwrap();
    }

    let ids: Vec<String> = store
        .get_all()
        .iter()
        .map(|r| r.id().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[test]
fn test_get_ignores_out_of_range_index_entry() {
    let temp_dir = TempDir::new().unwrap();
    let mut index = RecordIndex::new();
    index.insert("ghost", 3);

    let store = Store::with_data("s", temp_dir.path().join("s"), Vec::new(), index);

    assert!(store.get("ghost").is_none());
}

// =============================================================================
// Set Tests
// =============================================================================

#[test]
fn test_set_updates_in_place() {
    let (_temp, store) = setup_temp_store();
    let id = store.create(json!({ "name": "Piet" })).unwrap();
    store.create(json!({ "name": "Klaas" })).unwrap();

    let returned = store.set(&id, json!({ "id": id, "name": "Pieter" })).unwrap();

    assert_eq!(returned, id);
    assert_eq!(store.len(), 2);
    assert_eq!(
        store.get(&id).unwrap().into_value(),
        json!({ "id": id, "name": "Pieter" })
    );
    assert_eq!(read_rows(&store)[0]["name"], json!("Pieter"));
    assert_index_consistent(&store);
}

#[test]
fn test_set_fills_missing_id() {
    let (_temp, store) = setup_temp_store();
    let id = store.create(json!({ "name": "Piet" })).unwrap();

    store.set(&id, json!({ "name": "Jan" })).unwrap();

    assert_eq!(store.get(&id).unwrap().id(), Some(id.as_str()));
    assert_index_consistent(&store);
}

#[test]
fn test_set_replaces_whole_record() {
    let (_temp, store) = setup_temp_store();
    let id = store.create(json!({ "name": "Piet", "age": 40 })).unwrap();

    store.set(&id, json!({ "name": "Piet" })).unwrap();

    assert!(store.get(&id).unwrap().get("age").is_none());
}

#[test]
fn test_set_unknown_id_is_not_found() {
    let (_temp, store) = setup_temp_store();
    store.create(json!({ "id": "a", "v": 1 })).unwrap();
    let index_before = store.index();

    let err = store.set("nonexistent-id", json!({ "v": 2 })).unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(store.len(), 1);
    assert_eq!(store.index(), index_before);
    assert_eq!(store.get("a").unwrap().get("v"), Some(&json!(1)));
}

#[test]
fn test_set_rejects_id_mismatch() {
    let (_temp, store) = setup_temp_store();
    store.create(json!({ "id": "a", "v": 1 })).unwrap();

    let err = store.set("a", json!({ "id": "b", "v": 2 })).unwrap_err();

    match err {
        ShelfError::IdMismatch { expected, found } => {
            assert_eq!(expected, "a");
            assert_eq!(found, "b");
        }
        other => panic!("expected IdMismatch, got {:?}", other),
    }
    assert_eq!(store.get("a").unwrap().get("v"), Some(&json!(1)));
    assert!(store.get("b").is_none());
}

// =============================================================================
// Save / Rebuild Tests
// =============================================================================

#[test]
fn test_save_empty_store_writes_empty_files() {
    let (_temp, store) = setup_temp_store();

    store.save().unwrap();

    assert_eq!(fs::read_to_string(store.dir().join(ROWS_FILENAME)).unwrap(), "");
    assert_eq!(fs::read_to_string(store.dir().join(INDEX_FILENAME)).unwrap(), "{}");
}

#[test]
fn test_save_creates_nested_directories() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join("a").join("b").join("store");
    let store = Store::new("store", &dir);

    store.create(json!({ "id": "x" })).unwrap();

    assert!(dir.join(ROWS_FILENAME).exists());
    assert!(dir.join(INDEX_FILENAME).exists());
}

#[test]
fn test_save_leaves_no_temp_files() {
    let (_temp, store) = setup_temp_store();

    store.create(json!({ "id": "x" })).unwrap();

    let names: Vec<String> = fs::read_dir(store.dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names.len(), 2, "unexpected files: {:?}", names);
}

#[test]
fn test_rebuild_index_from_records() {
    let temp_dir = TempDir::new().unwrap();
    let records = vec![
        record(json!({ "id": "a" })),
        record(json!({ "id": "b" })),
        record(json!({ "id": "a", "second": true })),
    ];
    let store = Store::with_data("s", temp_dir.path().join("s"), records, RecordIndex::new());
    assert!(store.get("a").is_none());

    let indexed = store.rebuild_index();

    assert_eq!(indexed, 2);
    assert_eq!(store.index().get("a"), Some(2));
    assert_eq!(store.index().get("b"), Some(1));
    assert_index_consistent(&store);
}

// =============================================================================
// Quarantine / Validation Tests
// =============================================================================

#[test]
fn test_quarantined_store_refuses_writes() {
    let (_temp, store) = setup_temp_store();
    let store = store.quarantined("rows file is corrupt");

    assert!(matches!(
        store.create(json!({})),
        Err(ShelfError::StoreUnavailable { .. })
    ));
    assert!(matches!(
        store.save(),
        Err(ShelfError::StoreUnavailable { .. })
    ));
    assert_eq!(store.unavailable_reason(), Some("rows file is corrupt"));
    assert!(!store.dir().exists());
}

struct RequireFields;

impl RecordValidator for RequireFields {
    fn validate(
        &self,
        store: &str,
        schema: Option<&SchemaDescriptor>,
        record: &Record,
        _op: WriteOp,
    ) -> shelfdb::Result<()> {
        let Some(required) = schema.and_then(|s| s.as_value()["required"].as_array()) else {
            return Ok(());
        };
        for field in required.iter().filter_map(Value::as_str) {
            if record.get(field).is_none() {
                return Err(ShelfError::validation(store, format!("missing field {}", field)));
            }
        }
        Ok(())
    }
}

fn setup_validated_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let schema = SchemaDescriptor::new(json!({ "required": ["name"] }));
    let store = Store::new("people", temp_dir.path().join("people"))
        .with_schema(Some(schema))
        .with_validator(Some(Arc::new(RequireFields)));
    (temp_dir, store)
}

#[test]
fn test_validator_rejects_create() {
    let (_temp, store) = setup_validated_store();

    let result = store.create(json!({ "age": 3 }));

    assert!(matches!(result, Err(ShelfError::Validation { .. })));
    assert!(store.is_empty());
    assert!(!store.dir().exists());
}

#[test]
fn test_validator_rejects_set() {
    let (_temp, store) = setup_validated_store();
    let id = store.create(json!({ "name": "Piet" })).unwrap();

    let result = store.set(&id, json!({ "age": 3 }));

    assert!(matches!(result, Err(ShelfError::Validation { .. })));
    assert_eq!(store.get(&id).unwrap().get("name"), Some(&json!("Piet")));
}

#[test]
fn test_validator_accepts_valid_record() {
    let (_temp, store) = setup_validated_store();

    let id = store.create(json!({ "name": "Piet" })).unwrap();

    assert!(store.get(&id).is_some());
    assert_eq!(
        store.schema().unwrap().as_value(),
        &json!({ "required": ["name"] })
    );
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_creates_are_serialized() {
    let (_temp, store) = setup_temp_store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..25 {
                    store.create(json!({ "thread": t, "i": i })).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 100);
    assert_eq!(store.index().len(), 100);
    assert_eq!(read_rows(&store).len(), 100);
    assert_index_consistent(&store);
}

#[test]
fn test_concurrent_saves_do_not_collide() {
    let (temp, store) = setup_temp_store();
    for i in 0..200 {
        store.create(json!({ "i": i })).unwrap();
    }
    let store = Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || (0..200).filter(|_| store.save().is_err()).count())
        })
        .collect();
    let errors: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(errors, 0);
    assert_eq!(read_rows(&store).len(), 200);
    assert_index_consistent(&store);

    let leftovers: Vec<_> = fs::read_dir(temp.path().join("contacts"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left: {:?}", leftovers);
}

#[test]
fn test_dir_matches_construction() {
    let temp_dir = TempDir::new().unwrap();
    let dir: PathBuf = temp_dir.path().join("contacts");

    let store = Store::new("contacts", &dir);

    assert_eq!(store.name(), "contacts");
    assert_eq!(store.dir(), dir.as_path());
}
