use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ApiClient, ApiError, Auth};
use crate::core::contact::{Contact, ContactId, ContactPayload};
use crate::core::task::{CardId, NewTask, SubtaskId, Task, TaskStatus};
use crate::core::user::{Profile, ProfileUpdate, Registration, User};

#[derive(Debug, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Reply to login and guest-login.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenReply {
    #[serde(default)]
    pub token: Option<String>,
}

impl ApiClient {
    pub async fn tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.load("tasks").await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Value, ApiError> {
        self.create("tasks", task, Auth::Token).await
    }

    pub async fn update_task_status(
        &self,
        card_id: CardId,
        status: TaskStatus,
    ) -> Result<Value, ApiError> {
        self.partial_update(&format!("tasks/{}", card_id), &json!({ "status": status }))
            .await
    }

    pub async fn set_subtask_checked(
        &self,
        card_id: CardId,
        subtask_id: SubtaskId,
        checked: bool,
    ) -> Result<Value, ApiError> {
        self.partial_update(
            &format!("tasks/{}/subtasks/{}", card_id, subtask_id),
            &json!({ "checked": checked }),
        )
        .await
    }

    pub async fn delete_task(&self, card_id: CardId) -> Result<Value, ApiError> {
        self.remove(&format!("tasks/{}", card_id)).await
    }

    pub async fn users(&self) -> Result<Vec<User>, ApiError> {
        self.load("users").await
    }

    pub async fn profile(&self) -> Result<Profile, ApiError> {
        self.load("user").await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Value, ApiError> {
        self.replace("user", update).await
    }

    pub async fn delete_profile(&self) -> Result<Value, ApiError> {
        self.remove("user").await
    }

    pub async fn contacts(&self) -> Result<Vec<Contact>, ApiError> {
        self.load("contacts").await
    }

    pub async fn create_contact(&self, contact: &ContactPayload) -> Result<Contact, ApiError> {
        self.create("contacts", contact, Auth::Token).await
    }

    pub async fn replace_contact(
        &self,
        id: ContactId,
        contact: &ContactPayload,
    ) -> Result<Contact, ApiError> {
        self.replace(&format!("contacts/{}", id), contact).await
    }

    pub async fn delete_contact(&self, id: ContactId) -> Result<Value, ApiError> {
        self.remove(&format!("contacts/{}", id)).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenReply, ApiError> {
        self.create("login", &Credentials { email, password }, Auth::Anonymous)
            .await
    }

    pub async fn register(&self, registration: &Registration) -> Result<Value, ApiError> {
        self.create("registration", registration, Auth::Anonymous).await
    }

    pub async fn guest_login(&self) -> Result<TokenReply, ApiError> {
        self.create("guest-login", &json!({}), Auth::Anonymous).await
    }

    pub async fn logout(&self) -> Result<Value, ApiError> {
        self.create("logout", &json!({}), Auth::Token).await
    }

    pub async fn guest_logout(&self) -> Result<Value, ApiError> {
        self.create("guest-logout", &json!({}), Auth::Token).await
    }

    pub async fn ping_activity(&self) -> Result<Value, ApiError> {
        self.create("ping-activity", &json!({}), Auth::Token).await
    }

    pub async fn validate_token(&self) -> Result<Value, ApiError> {
        self.load("validate-token").await
    }
}
