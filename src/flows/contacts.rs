use std::sync::Arc;

use super::FlowError;
use crate::api::ApiClient;
use crate::core::contact::{Contact, ContactDraft, ContactId, emblem_for, sort_contacts};
use crate::core::user::{Profile, ProfileUpdate, UserId};
use crate::store::Store;
use crate::view::ContactListView;

/// Contacts page: the contact list plus the logged-in user's own profile.
///
/// The cache only changes after the server accepted a write, so a failed
/// edit or delete leaves the list exactly as it was.
pub struct ContactBook {
    api: ApiClient,
    store: Arc<Store>,
    selected: Option<ContactId>,
}

impl ContactBook {
    pub fn new(api: ApiClient, store: Arc<Store>) -> Self {
        Self {
            api,
            store,
            selected: None,
        }
    }

    pub async fn init(&self) -> Result<(), FlowError> {
        self.store.reload_contacts(&self.api).await?;
        self.store.reload_profile(&self.api).await?;
        Ok(())
    }

    pub fn contacts(&self) -> Arc<Vec<Contact>> {
        self.store.contacts()
    }

    pub fn find(&self, id: ContactId) -> Option<Contact> {
        self.store.contacts().iter().find(|c| c.id == id).cloned()
    }

    /// Creates a contact and opens its details.
    pub async fn create(&mut self, draft: &ContactDraft) -> Result<Contact, FlowError> {
        if draft.name.trim().is_empty() {
            return Err(FlowError::Invalid("Name is required".to_string()));
        }
        let created = self.api.create_contact(&draft.to_new_payload()).await?;
        log::info!("Created contact {} ({})", created.name, created.id);

        let snapshot = self.store.contacts.modify(|contacts| {
            contacts.push(created.clone());
            sort_contacts(contacts);
        });
        self.selected = Some(created.id);
        Ok(find_in(&snapshot, created.id).unwrap_or(created))
    }

    pub async fn edit(&self, id: ContactId, draft: &ContactDraft) -> Result<Contact, FlowError> {
        let existing = self
            .find(id)
            .ok_or_else(|| FlowError::NotFound(format!("contact {}", id)))?;
        if draft.name.trim().is_empty() {
            return Err(FlowError::Invalid("Name is required".to_string()));
        }

        let updated = self
            .api
            .replace_contact(id, &draft.to_edit_payload(&existing))
            .await?;
        log::info!("Updated contact {}", id);

        let snapshot = self.store.contacts.modify(|contacts| {
            if let Some(slot) = contacts.iter_mut().find(|c| c.id == id) {
                *slot = updated.clone();
            }
            sort_contacts(contacts);
        });
        Ok(find_in(&snapshot, id).unwrap_or(updated))
    }

    /// Deletes a contact. `Ok(false)` when it is not in the local list, in
    /// which case the server is not contacted.
    pub async fn delete(&mut self, id: ContactId) -> Result<bool, FlowError> {
        if self.find(id).is_none() {
            log::debug!("Contact {} is not cached, nothing to delete", id);
            return Ok(false);
        }

        self.api.delete_contact(id).await?;
        log::info!("Deleted contact {}", id);

        self.store.contacts.modify(|contacts| {
            contacts.retain(|c| c.id != id);
            sort_contacts(contacts);
        });
        if self.selected == Some(id) {
            self.selected = None;
        }
        Ok(true)
    }

    /// Toggles the detail selection. Selecting the open contact again closes it.
    pub fn select(&mut self, id: ContactId) -> Option<ContactId> {
        self.selected = if self.selected == Some(id) { None } else { Some(id) };
        self.selected
    }

    pub fn selected(&self) -> Option<ContactId> {
        self.selected
    }

    pub fn profile(&self) -> Option<Profile> {
        (*self.store.profile()).clone()
    }

    pub async fn edit_profile(&self, draft: &ContactDraft) -> Result<Profile, FlowError> {
        let profile = self
            .profile()
            .ok_or_else(|| FlowError::NotFound("profile".to_string()))?;
        let update = ProfileUpdate {
            id: profile.id,
            username: draft.name.clone(),
            email: draft.email.clone(),
            phone: draft.phone.clone(),
            emblem: emblem_for(&draft.name),
        };
        self.api.update_profile(&update).await?;
        let reloaded = self.store.reload_profile(&self.api).await?;
        (*reloaded)
            .clone()
            .ok_or_else(|| FlowError::NotFound("profile".to_string()))
    }

    /// Deletes the account itself, then forgets the session. Ignored for any
    /// id other than the profile's own.
    pub async fn delete_profile(&self, id: UserId) -> Result<bool, FlowError> {
        let is_self = self.profile().is_some_and(|p| p.is_self(id));
        if !is_self {
            log::warn!("Refusing to delete user {} through the profile page", id);
            return Ok(false);
        }
        self.api.delete_profile().await?;
        log::info!("Deleted own account {}", id);
        self.api.session().logout_locally().await?;
        Ok(true)
    }

    pub fn view(&self) -> ContactListView {
        ContactListView::build(&self.store.contacts(), self.profile().as_ref(), self.selected)
    }
}

fn find_in(contacts: &[Contact], id: ContactId) -> Option<Contact> {
    contacts.iter().find(|c| c.id == id).cloned()
}
