//! Task repository trait
//!
//! Defines the interface to the task store. The store owns persistence,
//! access rules and change fan-out; callers only see these operations.

use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

use super::model::{Task, TaskPatch};
use crate::Result;

/// Live query results: the current snapshot first, then one per change
pub type TaskStream = BoxStream<'static, Result<Vec<Task>>>;

/// Repository interface for task CRUD operations
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Create a new task
    async fn create(&self, task: Task) -> Result<Task>;

    /// Get a task by ID
    async fn get(&self, id: Uuid) -> Result<Option<Task>>;

    /// Get all tasks, newest first
    async fn list(&self) -> Result<Vec<Task>>;

    /// Find tasks owned by `user_id`
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Task>>;

    /// Apply a partial update to an existing task
    async fn update(&self, id: Uuid, patch: TaskPatch) -> Result<Task>;

    /// Delete a task by ID
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Subscribe to the tasks owned by `user_id`
    async fn watch_user(&self, user_id: &str) -> Result<TaskStream>;
}
