use anyhow::Context;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use super::contact::Contact;
use super::kv::KeyValueStore;
use crate::error::AlertError;

/// Key under which the contact list is persisted
pub const CONTACTS_KEY: &str = "emergencyContacts";

/// Maximum number of emergency contacts
pub const MAX_CONTACTS: usize = 3;

/// Ordered list of emergency contacts backed by a key-value store
///
/// Insertion order is escalation order. The list is loaded on first use and
/// the whole list is written back after every change.
pub struct ContactStore {
    kv: Arc<dyn KeyValueStore>,
    contacts: Mutex<Option<Vec<Contact>>>,
}

impl ContactStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            contacts: Mutex::new(None),
        }
    }

    /// Current contacts in escalation order
    pub fn list_contacts(&self) -> Vec<Contact> {
        let mut cached = self.lock();
        self.loaded(&mut cached).clone()
    }

    pub fn len(&self) -> usize {
        let mut cached = self.lock();
        self.loaded(&mut cached).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a contact, rejecting blank fields and a full list
    pub fn add_contact(&self, name: &str, phone: &str) -> Result<Contact, AlertError> {
        let name = name.trim();
        let phone = phone.trim();

        if name.is_empty() {
            return Err(AlertError::ValidationRejected("name is empty".to_string()));
        }
        if phone.is_empty() {
            return Err(AlertError::ValidationRejected("phone is empty".to_string()));
        }

        let mut cached = self.lock();
        let contacts = self.loaded(&mut cached);

        if contacts.len() >= MAX_CONTACTS {
            return Err(AlertError::ValidationRejected(format!(
                "at most {} contacts allowed",
                MAX_CONTACTS
            )));
        }

        let contact = Contact::new(name, phone, contacts);
        let mut updated = contacts.clone();
        updated.push(contact.clone());

        self.persist(&updated)?;
        *contacts = updated;

        info!("Added contact {} ({})", contact.name, contact.id);
        Ok(contact)
    }

    /// Remove the contact with `id`; unknown ids are ignored
    pub fn remove_contact(&self, id: &str) -> Result<(), AlertError> {
        let mut cached = self.lock();
        let contacts = self.loaded(&mut cached);

        let updated: Vec<Contact> = contacts.iter().filter(|c| c.id != id).cloned().collect();
        if updated.len() == contacts.len() {
            info!("No contact with id {}", id);
        }

        self.persist(&updated)?;
        *contacts = updated;
        Ok(())
    }

    /// Drop every persisted key, contacts included
    pub fn reset(&self) -> Result<(), AlertError> {
        let mut cached = self.lock();
        self.kv.clear().context("Failed to clear storage")?;
        *cached = Some(Vec::new());
        info!("All stored data cleared");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Vec<Contact>>> {
        self.contacts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn loaded<'a>(&self, cached: &'a mut Option<Vec<Contact>>) -> &'a mut Vec<Contact> {
        cached.get_or_insert_with(|| self.load())
    }

    fn load(&self) -> Vec<Contact> {
        let raw = match self.kv.get(CONTACTS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read stored contacts: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Contact>>(&raw) {
            Ok(contacts) => {
                info!("Loaded {} stored contacts", contacts.len());
                contacts
            }
            Err(e) => {
                warn!("Stored contacts are malformed, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    fn persist(&self, contacts: &[Contact]) -> Result<(), AlertError> {
        let json = serde_json::to_string(contacts).context("Failed to serialize contacts")?;
        self.kv
            .set(CONTACTS_KEY, &json)
            .context("Failed to persist contacts")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::MemoryStore;

    fn store() -> ContactStore {
        ContactStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn trims_fields_on_add() {
        let store = store();
        let contact = store.add_contact("  Ana  ", " +5215550001 ").unwrap();
        assert_eq!(contact.name, "Ana");
        assert_eq!(contact.phone, "+5215550001");
        assert_eq!(contact.tel_url(), "tel:+5215550001");
    }

    #[test]
    fn malformed_value_loads_as_empty() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(CONTACTS_KEY, "{not a list").unwrap();
        let store = ContactStore::new(kv);
        assert!(store.list_contacts().is_empty());
    }

    #[test]
    fn reads_records_written_by_other_clients() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(
            CONTACTS_KEY,
            r#"[{"id":"1700000000000","name":"Luis","phone":"5550001"}]"#,
        )
        .unwrap();

        let store = ContactStore::new(kv);
        let contacts = store.list_contacts();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, "1700000000000");
        assert_eq!(contacts[0].name, "Luis");
    }

    #[test]
    fn reset_empties_list_and_storage() {
        let kv = Arc::new(MemoryStore::new());
        let store = ContactStore::new(kv.clone());
        store.add_contact("Ana", "1").unwrap();

        store.reset().unwrap();

        assert!(store.is_empty());
        assert_eq!(kv.get(CONTACTS_KEY).unwrap(), None);
    }
}
