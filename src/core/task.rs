use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::user::{User, UserId};

pub type CardId = u64;
pub type SubtaskId = u64;

/// The four board columns a task can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "toDo")]
    ToDo,
    #[serde(rename = "inProgress", alias = "in Progress")]
    InProgress,
    #[serde(rename = "awaitFeedback")]
    AwaitFeedback,
    #[serde(rename = "done")]
    Done,
}

impl TaskStatus {
    /// Column order on the board.
    pub const ALL: [TaskStatus; 4] = [
        Self::ToDo,
        Self::InProgress,
        Self::AwaitFeedback,
        Self::Done,
    ];

    pub fn as_key(&self) -> &'static str {
        match self {
            Self::ToDo => "toDo",
            Self::InProgress => "inProgress",
            Self::AwaitFeedback => "awaitFeedback",
            Self::Done => "done",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        match s {
            "toDo" | "todo" => Some(Self::ToDo),
            "inProgress" | "in Progress" | "inprogress" => Some(Self::InProgress),
            "awaitFeedback" | "awaitfeedback" => Some(Self::AwaitFeedback),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::ToDo => "To do",
            Self::InProgress => "In progress",
            Self::AwaitFeedback => "Await feedback",
            Self::Done => "Done",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_key())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    Urgent,
}

impl Priority {
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::Urgent => "urgent",
        }
    }

    pub fn from_key(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Technical Task")]
    TechnicalTask,
    #[serde(rename = "User Story")]
    UserStory,
    #[serde(rename = "Development")]
    Development,
    #[serde(rename = "Editing")]
    Editing,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Self::TechnicalTask,
        Self::UserStory,
        Self::Development,
        Self::Editing,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::TechnicalTask => "Technical Task",
            Self::UserStory => "User Story",
            Self::Development => "Development",
            Self::Editing => "Editing",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    #[serde(alias = "subtask", alias = "title")]
    pub text: String,
    #[serde(default)]
    pub checked: bool,
}

/// One entry of a task's assignee list, as the backend nests it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "cardId")]
    pub card_id: CardId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "user", default)]
    pub assigned: Vec<Assignment>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
    pub category: Category,
    pub status: TaskStatus,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// Subtask progress, absent when the task has no subtasks.
    pub fn progress(&self) -> Option<Progress> {
        Progress::of(&self.subtasks)
    }

    pub fn matches_query(&self, lowered_query: &str) -> bool {
        self.title.to_lowercase().contains(lowered_query)
            || self.description.to_lowercase().contains(lowered_query)
    }

    pub fn assignees(&self) -> impl Iterator<Item = &User> {
        self.assigned.iter().map(|a| &a.user)
    }
}

/// Checked/total subtask counts for a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub checked: usize,
    pub total: usize,
}

impl Progress {
    pub fn of(subtasks: &[Subtask]) -> Option<Self> {
        if subtasks.is_empty() {
            return None;
        }
        Some(Self {
            checked: subtasks.iter().filter(|s| s.checked).count(),
            total: subtasks.len(),
        })
    }

    /// Rounded percentage, halves round up.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((200 * self.checked + self.total) / (2 * self.total)) as u8
    }

    pub fn label(&self) -> String {
        format!("{}/{} Subtasks", self.checked, self.total)
    }
}

/// Subtask as entered on the add-task form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubtask {
    pub subtask: String,
    #[serde(default)]
    pub checked: bool,
}

/// Payload for `POST /tasks/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub user_ids: Vec<UserId>,
    pub date: Option<NaiveDate>,
    pub priority: Priority,
    pub category: Category,
    pub subtasks: Vec<NewSubtask>,
    pub status: TaskStatus,
}

impl NewTask {
    pub fn new(title: impl Into<String>, category: Category) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            user_ids: Vec::new(),
            date: None,
            priority: Priority::Medium,
            category,
            subtasks: Vec::new(),
            status: TaskStatus::ToDo,
        }
    }

    pub fn with_subtask(mut self, text: impl Into<String>) -> Self {
        self.subtasks.push(NewSubtask {
            subtask: text.into(),
            checked: false,
        });
        self
    }
}
