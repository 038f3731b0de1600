use apiato_mock::memory::{ListQuery, MemoryStore, Record};
use serde_json::{json, Value};

fn fields(v: Value) -> Record {
    v.as_object().cloned().unwrap()
}

#[test]
fn memory_store_crud_flow() {
    let store = MemoryStore::new();
    let created = store.create("posts", fields(json!({ "title": "Hello" })));
    let id = created["id"].as_i64().unwrap();

    let fetched = store.get("posts", id).unwrap();
    assert_eq!(fetched["title"], "Hello");

    let listed = store.list("posts", &ListQuery::default());
    assert_eq!(listed.total, 1);

    let updated = store
        .update("posts", id, fields(json!({ "title": "Bye", "draft": true })))
        .unwrap();
    assert_eq!(updated["title"], "Bye");
    assert_eq!(updated["draft"], true);

    let deleted = store.delete("posts", id).unwrap();
    assert_eq!(deleted["id"], id);
    assert!(store.get("posts", id).is_none());
}

#[test]
fn memory_store_handles_missing_rows() {
    let store = MemoryStore::new();
    assert!(store.get("posts", 1).is_none());
    assert!(store.update("posts", 1, Record::new()).is_none());
    assert!(store.delete("posts", 1).is_none());

    let empty = store.list("posts", &ListQuery::default());
    assert_eq!(empty.total, 0);
    assert!(empty.records.is_empty());
    assert_eq!(empty.total_pages(), 1);
}
