// Integration tests for the persisted contact store
//
// These tests run against the JSON file store the binary uses, so they also
// cover the on-disk format.

use anyhow::Result;
use safe_alert::contacts::{ContactStore, JsonFileStore, KeyValueStore, CONTACTS_KEY, MAX_CONTACTS};
use std::sync::Arc;
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> Result<ContactStore> {
    let kv = JsonFileStore::open(dir.path().join("safealert.json"))?;
    Ok(ContactStore::new(Arc::new(kv)))
}

#[test]
fn test_store_starts_empty_without_stored_value() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;

    assert!(store.list_contacts().is_empty());
    Ok(())
}

#[test]
fn test_fourth_contact_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;

    store.add_contact("Ana", "5550001")?;
    store.add_contact("Luis", "5550002")?;
    store.add_contact("Marta", "5550003")?;
    let before = store.list_contacts();

    let err = store.add_contact("Pedro", "5550004").unwrap_err();

    assert!(err.is_validation());
    assert_eq!(store.len(), MAX_CONTACTS);
    assert_eq!(store.list_contacts(), before);
    Ok(())
}

#[test]
fn test_blank_fields_are_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;

    assert!(store.add_contact("", "555").unwrap_err().is_validation());
    assert!(store.add_contact("Name", "  ").unwrap_err().is_validation());
    assert!(store.list_contacts().is_empty());
    Ok(())
}

#[test]
fn test_removing_unknown_id_is_a_no_op() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    store.add_contact("Ana", "5550001")?;
    let before = store.list_contacts();

    store.remove_contact("does-not-exist")?;

    assert_eq!(store.list_contacts(), before);
    Ok(())
}

#[test]
fn test_remove_keeps_remaining_order() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    let a = store.add_contact("Ana", "5550001")?;
    let b = store.add_contact("Luis", "5550002")?;
    let c = store.add_contact("Marta", "5550003")?;

    // Ids stay distinct even when added within the same millisecond
    assert_ne!(a.id, b.id);
    assert_ne!(b.id, c.id);

    store.remove_contact(&b.id)?;

    let names: Vec<String> = store.list_contacts().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Ana", "Marta"]);

    // Freed slot can be reused
    store.add_contact("Pedro", "5550004")?;
    assert_eq!(store.len(), 3);
    Ok(())
}

#[test]
fn test_reload_yields_same_contacts() -> Result<()> {
    let dir = TempDir::new()?;

    let written = {
        let store = open_store(&dir)?;
        store.add_contact("Ana", "5550001")?;
        store.add_contact("Luis", "+52 55 5000 0002")?;
        store.list_contacts()
    };

    let reopened = open_store(&dir)?;
    assert_eq!(reopened.list_contacts(), written);
    Ok(())
}

#[test]
fn test_persisted_value_is_plain_contact_array() -> Result<()> {
    let dir = TempDir::new()?;
    let kv = Arc::new(JsonFileStore::open(dir.path().join("safealert.json"))?);
    let store = ContactStore::new(kv.clone());
    let contact = store.add_contact("Ana", "5550001")?;

    let raw = kv.get(CONTACTS_KEY)?.expect("contacts should be persisted");
    let value: serde_json::Value = serde_json::from_str(&raw)?;

    assert_eq!(
        value,
        serde_json::json!([{ "id": contact.id, "name": "Ana", "phone": "5550001" }])
    );
    Ok(())
}

#[test]
fn test_corrupt_value_loads_as_empty_list() -> Result<()> {
    let dir = TempDir::new()?;
    let kv = Arc::new(JsonFileStore::open(dir.path().join("safealert.json"))?);
    kv.set(CONTACTS_KEY, "[{\"id\": 1")?;

    let store = ContactStore::new(kv);
    assert!(store.list_contacts().is_empty());

    // Writing afterwards replaces the corrupt value
    store.add_contact("Ana", "5550001")?;
    assert_eq!(store.len(), 1);
    Ok(())
}

#[test]
fn test_reset_clears_persisted_contacts() -> Result<()> {
    let dir = TempDir::new()?;
    let store = open_store(&dir)?;
    store.add_contact("Ana", "5550001")?;

    store.reset()?;

    assert!(store.is_empty());
    assert!(open_store(&dir)?.list_contacts().is_empty());
    Ok(())
}
