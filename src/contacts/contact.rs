use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A person to call during an emergency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Creation time in milliseconds since epoch, as a string
    pub id: String,
    pub name: String,
    pub phone: String,
}

impl Contact {
    /// Build a contact from already-validated fields
    ///
    /// The id is the current time in milliseconds, moved forward past any id
    /// in `taken` so two contacts added within the same millisecond differ.
    pub(crate) fn new(name: &str, phone: &str, taken: &[Contact]) -> Self {
        let mut millis = Utc::now().timestamp_millis();
        while taken.iter().any(|c| c.id == millis.to_string()) {
            millis += 1;
        }

        Self {
            id: millis.to_string(),
            name: name.to_string(),
            phone: phone.to_string(),
        }
    }

    /// `tel:` URL for this contact's phone
    pub fn tel_url(&self) -> String {
        format!("tel:{}", self.phone)
    }
}
