//! Emergency contact storage
//!
//! Up to three contacts, kept in escalation order and persisted as a JSON
//! array under a single key of a [`KeyValueStore`].

mod contact;
mod kv;
mod store;

pub use contact::Contact;
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use store::{ContactStore, CONTACTS_KEY, MAX_CONTACTS};
