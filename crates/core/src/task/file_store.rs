//! File-based task storage implementation
//!
//! Stores tasks as JSON in a file on disk and notifies watchers on every
//! mutation.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::model::{sort_newest_first, Task, TaskPatch};
use super::repository::{TaskRepository, TaskStream};
use crate::{Error, Result};

type Cache = Arc<RwLock<HashMap<Uuid, Task>>>;

/// File-based task store using JSON
pub struct FileTaskStore {
    /// Path to the JSON file
    path: PathBuf,
    /// In-memory cache of tasks
    cache: Cache,
    /// Fires after every successful mutation
    changes: broadcast::Sender<()>,
}

impl FileTaskStore {
    /// Create a new FileTaskStore
    ///
    /// If the file doesn't exist, it will be created on first write.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            let tasks: Vec<Task> = serde_json::from_str(&content)?;
            tasks.into_iter().map(|t| (t.id, t)).collect()
        } else {
            HashMap::new()
        };
        let (changes, _) = broadcast::channel(64);

        Ok(Self {
            path,
            cache: Arc::new(RwLock::new(cache)),
            changes,
        })
    }

    /// Write the given tasks to disk
    ///
    /// Callers hold the cache write lock across this call so the file and
    /// the cache change together.
    async fn write_file(&self, cache: &HashMap<Uuid, Task>) -> Result<()> {
        let mut tasks: Vec<&Task> = cache.values().collect();
        tasks.sort_by_key(|t| t.created_at);
        let content = serde_json::to_string_pretty(&tasks)?;

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }

    fn notify(&self) {
        // No receivers is fine
        let _ = self.changes.send(());
    }
}

/// A user's tasks, newest first, with ties broken by id
async fn snapshot_for(cache: &Cache, user_id: &str) -> Vec<Task> {
    let cache = cache.read().await;
    let mut tasks: Vec<Task> = cache
        .values()
        .filter(|t| t.user_id == user_id)
        .cloned()
        .collect();
    tasks.sort_by_key(|t| t.id);
    sort_newest_first(&mut tasks);
    tasks
}

struct WatchState {
    cache: Cache,
    changes: broadcast::Receiver<()>,
    user_id: String,
    last: Option<Vec<Task>>,
}

#[async_trait]
impl TaskRepository for FileTaskStore {
    async fn create(&self, task: Task) -> Result<Task> {
        {
            let mut cache = self.cache.write().await;
            if cache.contains_key(&task.id) {
                return Err(Error::InvalidInput(format!(
                    "Task with ID {} already exists",
                    task.id
                )));
            }
            cache.insert(task.id, task.clone());
            if let Err(e) = self.write_file(&cache).await {
                cache.remove(&task.id);
                return Err(e);
            }
        }
        self.notify();
        Ok(task)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Task>> {
        let cache = self.cache.read().await;
        Ok(cache.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let cache = self.cache.read().await;
        let mut tasks: Vec<Task> = cache.values().cloned().collect();
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Task>> {
        Ok(snapshot_for(&self.cache, user_id).await)
    }

    async fn update(&self, id: Uuid, patch: TaskPatch) -> Result<Task> {
        let task = {
            let mut cache = self.cache.write().await;
            let task = cache
                .get_mut(&id)
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
            let previous = task.clone();
            task.apply(&patch);
            let updated = task.clone();
            if let Err(e) = self.write_file(&cache).await {
                cache.insert(id, previous);
                return Err(e);
            }
            updated
        };
        self.notify();
        Ok(task)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        {
            let mut cache = self.cache.write().await;
            let Some(removed) = cache.remove(&id) else {
                return Ok(false);
            };
            if let Err(e) = self.write_file(&cache).await {
                cache.insert(id, removed);
                return Err(e);
            }
        }
        self.notify();
        Ok(true)
    }

    async fn watch_user(&self, user_id: &str) -> Result<TaskStream> {
        // Subscribe before the first snapshot so no change slips between them
        let state = WatchState {
            cache: Arc::clone(&self.cache),
            changes: self.changes.subscribe(),
            user_id: user_id.to_string(),
            last: None,
        };

        let stream = futures::stream::unfold(state, |mut state| async move {
            loop {
                if state.last.is_some() {
                    match state.changes.recv().await {
                        Ok(()) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!("Watcher for {} lagged by {} changes", state.user_id, skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }

                let snapshot = snapshot_for(&state.cache, &state.user_id).await;
                if state.last.as_ref() == Some(&snapshot) {
                    continue;
                }
                state.last = Some(snapshot.clone());
                return Some((Ok(snapshot), state));
            }
        });

        Ok(stream.boxed())
    }
}
