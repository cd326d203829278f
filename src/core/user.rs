use serde::{Deserialize, Serialize};

pub type UserId = u64;

/// Reserved backend account that never shows up as an assignee.
pub const SYSTEM_USER_ID: UserId = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub emblem: String,
    #[serde(default)]
    pub color: String,
}

impl User {
    pub fn is_assignable(&self) -> bool {
        self.id != SYSTEM_USER_ID
    }
}

/// Users that may be assigned to a task, in backend order.
pub fn assignable_users(users: &[User]) -> impl Iterator<Item = &User> {
    users.iter().filter(|u| u.is_assignable())
}

/// The logged-in user's own record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub emblem: String,
    #[serde(default)]
    pub color: String,
}

impl Profile {
    pub fn is_self(&self, id: UserId) -> bool {
        self.id == id
    }
}

/// Payload for `PUT /user/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub emblem: String,
}

/// Payload for `POST /registration/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
    pub emblem: String,
    pub color: String,
}
