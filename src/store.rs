//! Entity caches.
//!
//! Each cache holds an immutable snapshot. Reloads take a ticket before the
//! request goes out and only publish their result if no newer ticket has been
//! published in the meantime, so a slow reply never overwrites a fresh one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::api::{ApiClient, ApiError};
use crate::core::contact::{Contact, sort_contacts};
use crate::core::task::Task;
use crate::core::user::{Profile, User};

#[derive(Debug)]
struct Published<T> {
    ticket: u64,
    value: Arc<T>,
}

/// A value replaced wholesale, guarded by monotonic tickets.
#[derive(Debug)]
pub struct Sequenced<T> {
    issued: AtomicU64,
    current: RwLock<Published<T>>,
}

impl<T: Default> Default for Sequenced<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Sequenced<T> {
    pub fn new(value: T) -> Self {
        Self {
            issued: AtomicU64::new(0),
            current: RwLock::new(Published {
                ticket: 0,
                value: Arc::new(value),
            }),
        }
    }

    pub fn ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publishes `value` unless a newer ticket already did. Returns whether it was published.
    pub fn commit(&self, ticket: u64, value: T) -> bool {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        if ticket <= current.ticket {
            log::debug!(
                "Discarding stale result (ticket {} <= {})",
                ticket,
                current.ticket
            );
            return false;
        }
        *current = Published {
            ticket,
            value: Arc::new(value),
        };
        true
    }

    pub fn get(&self) -> Arc<T> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .value
            .clone()
    }

    pub fn published_ticket(&self) -> u64 {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .ticket
    }
}

impl<T: Clone> Sequenced<T> {
    /// Applies a local edit to a copy of the current value and publishes it.
    pub fn modify(&self, f: impl FnOnce(&mut T)) -> Arc<T> {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        // Issued under the lock so it is newer than anything already published.
        let ticket = self.ticket();
        let mut value = (*current.value).clone();
        f(&mut value);
        let value = Arc::new(value);
        *current = Published {
            ticket,
            value: value.clone(),
        };
        value
    }
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Users, tasks, contacts and the logged-in profile.
#[derive(Debug, Default)]
pub struct Store {
    pub tasks: Sequenced<Vec<Task>>,
    pub users: Sequenced<Vec<User>>,
    pub contacts: Sequenced<Vec<Contact>>,
    pub profile: Sequenced<Option<Profile>>,
    tasks_loading: AtomicBool,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> Arc<Vec<Task>> {
        self.tasks.get()
    }

    pub fn users(&self) -> Arc<Vec<User>> {
        self.users.get()
    }

    pub fn contacts(&self) -> Arc<Vec<Contact>> {
        self.contacts.get()
    }

    pub fn profile(&self) -> Arc<Option<Profile>> {
        self.profile.get()
    }

    /// Board refresh. Skipped, returning the current snapshot, while another
    /// task reload is already in flight.
    pub async fn reload_tasks(&self, api: &ApiClient) -> Result<Arc<Vec<Task>>, ApiError> {
        if self.tasks_loading.swap(true, Ordering::AcqRel) {
            log::debug!("Task reload already running, skipping");
            return Ok(self.tasks());
        }
        let _guard = LoadingGuard(&self.tasks_loading);
        self.refresh_tasks(api).await
    }

    /// Unconditional task reload, used after a write so the result reflects it.
    pub async fn refresh_tasks(&self, api: &ApiClient) -> Result<Arc<Vec<Task>>, ApiError> {
        let ticket = self.tasks.ticket();
        let tasks = api.tasks().await?;
        log::debug!("Loaded {} tasks", tasks.len());
        self.tasks.commit(ticket, tasks);
        Ok(self.tasks())
    }

    pub async fn reload_users(&self, api: &ApiClient) -> Result<Arc<Vec<User>>, ApiError> {
        let ticket = self.users.ticket();
        let users = api.users().await?;
        log::debug!("Loaded {} users", users.len());
        self.users.commit(ticket, users);
        Ok(self.users())
    }

    pub async fn reload_contacts(&self, api: &ApiClient) -> Result<Arc<Vec<Contact>>, ApiError> {
        let ticket = self.contacts.ticket();
        let mut contacts = api.contacts().await?;
        sort_contacts(&mut contacts);
        log::debug!("Loaded {} contacts", contacts.len());
        self.contacts.commit(ticket, contacts);
        Ok(self.contacts())
    }

    pub async fn reload_profile(&self, api: &ApiClient) -> Result<Arc<Option<Profile>>, ApiError> {
        let ticket = self.profile.ticket();
        let profile = api.profile().await?;
        self.profile.commit(ticket, Some(profile));
        Ok(self.profile())
    }
}
