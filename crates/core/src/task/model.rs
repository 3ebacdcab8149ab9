//! Task model definitions

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

/// Category label attached to every task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Work,
    Personal,
    Urgent,
    Finance,
    Learning,
    General,
}

impl Default for Category {
    fn default() -> Self {
        Self::General
    }
}

impl Category {
    /// Every category, in the order users pick from
    pub const ALL: [Category; 6] = [
        Category::Work,
        Category::Personal,
        Category::Urgent,
        Category::Finance,
        Category::Learning,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Personal => "Personal",
            Self::Urgent => "Urgent",
            Self::Finance => "Finance",
            Self::Learning => "Learning",
            Self::General => "General",
        }
    }

    /// Parse a label coming off the network, falling back to `General`
    pub fn from_label_or_default(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| Error::UnknownCategory(s.to_string()))
    }
}

/// A to-do item owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub is_user_corrected: bool,
}

impl Task {
    /// Create a new, not yet completed task for `user_id`
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            completed: false,
            user_id: user_id.into(),
            created_at: Utc::now(),
            category: Category::default(),
            is_user_corrected: false,
        }
    }

    /// Set the category
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Set the creation time
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(corrected) = patch.is_user_corrected {
            self.is_user_corrected = corrected;
        }
    }
}

/// Partial update to a task; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_user_corrected: Option<bool>,
}

impl TaskPatch {
    /// Set the completion flag
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// A category chosen by a human, which also marks the task as corrected
    pub fn corrected_category(category: Category) -> Self {
        Self {
            category: Some(category),
            is_user_corrected: Some(true),
            ..Self::default()
        }
    }
}

/// Sort tasks newest first
pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
