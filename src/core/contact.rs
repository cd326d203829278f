use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ContactId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub emblem: String,
    #[serde(default)]
    pub color: String,
    /// Letter header this contact is listed under. Recomputed by [`sort_contacts`].
    #[serde(skip)]
    pub group: String,
}

/// Form fields for creating or editing a contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Body of `POST /contacts/` and `PUT /contacts/{id}/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ContactId>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub emblem: String,
    pub color: String,
}

impl ContactDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Payload for a brand new contact: capitalized name, initials and a fresh color.
    pub fn to_new_payload(&self) -> ContactPayload {
        ContactPayload {
            id: None,
            name: capitalize_first(&self.name),
            email: self.email.clone(),
            phone: self.phone.clone(),
            emblem: emblem_for(&self.name),
            color: random_color(),
        }
    }

    /// Payload replacing `existing`. The name is taken as typed and the color is kept.
    pub fn to_edit_payload(&self, existing: &Contact) -> ContactPayload {
        ContactPayload {
            id: Some(existing.id),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            emblem: emblem_for(&self.name),
            color: existing.color.clone(),
        }
    }
}

/// Uppercases the first character and leaves the rest untouched.
pub fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Initials of the first two space-separated name parts.
pub fn emblem_for(name: &str) -> String {
    name.split(' ')
        .take(2)
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Random `#rrggbb` color.
pub fn random_color() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    format!("#{:02x}{:02x}{:02x}", bytes[0], bytes[1], bytes[2])
}

pub fn group_letter(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

fn compare_names(a: &str, b: &str) -> Ordering {
    // Lower case sorts first on otherwise equal names, as locale collation does.
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Sorts by name and refreshes every contact's group letter.
pub fn sort_contacts(contacts: &mut [Contact]) {
    contacts.sort_by(|a, b| compare_names(&a.name, &b.name).then(a.id.cmp(&b.id)));
    for contact in contacts.iter_mut() {
        contact.group = group_letter(&contact.name);
    }
}
