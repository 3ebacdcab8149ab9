//! Signed-in to-do session
//!
//! A [`TodoSession`] mirrors the signed-in user's tasks from the store into
//! local state and exposes the handlers the front end calls. Handlers never
//! return store errors; they log them and set the session's status string.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use todo_core::task::{sort_newest_first, Category, Task, TaskPatch, TaskRepository};

use crate::auth::{AuthState, IdentityProvider, User};
use crate::categorizer::Categorizer;

pub const SIGN_IN_FAILED: &str = "Failed to sign in. Please try again.";
pub const SIGN_OUT_FAILED: &str = "Failed to sign out.";
pub const FETCH_FAILED: &str = "Could not fetch tasks.";
pub const ADD_FAILED: &str = "Failed to add task.";
pub const UPDATE_FAILED: &str = "Failed to update task.";
pub const CATEGORY_FAILED: &str = "Failed to update category.";
pub const DELETE_FAILED: &str = "Failed to delete task.";

/// What the front end should show
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Loading,
    SignedOut {
        error: Option<String>,
    },
    SignedIn {
        user: User,
        tasks: Vec<Task>,
        error: Option<String>,
    },
}

impl View {
    /// Tasks in display order; empty unless signed in
    pub fn tasks(&self) -> &[Task] {
        match self {
            Self::SignedIn { tasks, .. } => tasks,
            _ => &[],
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Loading => None,
            Self::SignedOut { error } | Self::SignedIn { error, .. } => error.as_deref(),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    loading: bool,
    user: Option<User>,
    tasks: Vec<Task>,
    error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            loading: true,
            user: None,
            tasks: Vec::new(),
            error: None,
        }
    }
}

#[derive(Default)]
struct Listeners {
    auth: Option<JoinHandle<()>>,
    tasks: Option<JoinHandle<()>>,
}

struct SessionInner {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn TaskRepository>,
    categorizer: Arc<dyn Categorizer>,
    state: RwLock<SessionState>,
    listeners: Mutex<Listeners>,
    /// Bumped on every state change
    revision: watch::Sender<u64>,
}

/// Handle to a to-do session; clones share the same state
#[derive(Clone)]
pub struct TodoSession {
    inner: Arc<SessionInner>,
}

impl TodoSession {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn TaskRepository>,
        categorizer: Arc<dyn Categorizer>,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(SessionInner {
                identity,
                store,
                categorizer,
                state: RwLock::new(SessionState::default()),
                listeners: Mutex::new(Listeners::default()),
                revision,
            }),
        }
    }

    /// Start listening for auth changes
    pub async fn start(&self) {
        let mut auth_rx = self.inner.identity.subscribe();
        let session = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                let auth = auth_rx.borrow_and_update().clone();
                session.on_auth_changed(auth).await;
                if auth_rx.changed().await.is_err() {
                    debug!("Identity provider dropped, auth listener exiting");
                    break;
                }
            }
        });

        let mut listeners = self.inner.listeners.lock().await;
        if let Some(old) = listeners.auth.replace(handle) {
            old.abort();
        }
    }

    /// Stop all listeners
    pub async fn shutdown(&self) {
        let mut listeners = self.inner.listeners.lock().await;
        for handle in [listeners.auth.take(), listeners.tasks.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }

    /// Receiver that changes whenever the view may have changed
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Snapshot of what to render
    pub async fn view(&self) -> View {
        let state = self.inner.state.read().await;
        if state.loading {
            return View::Loading;
        }
        match &state.user {
            Some(user) => View::SignedIn {
                user: user.clone(),
                tasks: state.tasks.clone(),
                error: state.error.clone(),
            },
            None => View::SignedOut {
                error: state.error.clone(),
            },
        }
    }

    pub async fn dismiss_error(&self) {
        self.set_error(None).await;
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    async fn on_auth_changed(&self, auth: AuthState) {
        // (drop the current subscription, user to subscribe for)
        let (unsubscribe, resubscribe) = {
            let mut state = self.inner.state.write().await;
            match auth {
                AuthState::Unknown => {
                    state.loading = true;
                    (false, None)
                }
                AuthState::SignedOut => {
                    state.loading = false;
                    state.user = None;
                    state.tasks.clear();
                    (true, None)
                }
                AuthState::SignedIn(user) => {
                    state.loading = false;
                    let same_user = state.user.as_ref().map(|u| &u.uid) == Some(&user.uid);
                    if !same_user {
                        state.tasks.clear();
                    }
                    let uid = user.uid.clone();
                    state.user = Some(user);
                    (!same_user, (!same_user).then_some(uid))
                }
            }
        };

        {
            let mut listeners = self.inner.listeners.lock().await;
            if unsubscribe {
                if let Some(old) = listeners.tasks.take() {
                    old.abort();
                }
            }
            if let Some(uid) = resubscribe {
                info!("Subscribing to tasks for {}", uid);
                listeners.tasks = Some(self.spawn_task_listener(uid));
            }
        }

        self.notify();
    }

    fn spawn_task_listener(&self, uid: String) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            let mut stream = match session.inner.store.watch_user(&uid).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Error fetching tasks: {}", e);
                    session.set_error(Some(FETCH_FAILED)).await;
                    return;
                }
            };

            while let Some(snapshot) = stream.next().await {
                match snapshot {
                    Ok(mut tasks) => {
                        sort_newest_first(&mut tasks);
                        {
                            let mut state = session.inner.state.write().await;
                            if state.user.as_ref().map(|u| u.uid.as_str()) != Some(uid.as_str()) {
                                debug!("Dropping snapshot for signed-out user {}", uid);
                                break;
                            }
                            state.tasks = tasks;
                        }
                        session.notify();
                    }
                    Err(e) => {
                        error!("Error fetching tasks: {}", e);
                        session.set_error(Some(FETCH_FAILED)).await;
                    }
                }
            }
        })
    }

    // ========================================================================
    // Handlers
    // ========================================================================

    pub async fn sign_in(&self) {
        if let Err(e) = self.inner.identity.sign_in().await {
            error!("Error signing in: {}", e);
            self.set_error(Some(SIGN_IN_FAILED)).await;
        }
    }

    pub async fn sign_out(&self) {
        match self.inner.identity.sign_out().await {
            Ok(()) => {
                self.inner.state.write().await.tasks.clear();
                self.notify();
            }
            Err(e) => {
                error!("Error signing out: {}", e);
                self.set_error(Some(SIGN_OUT_FAILED)).await;
            }
        }
    }

    /// Categorize and store a new task; `None` when nothing was written
    pub async fn add_task(&self, text: &str) -> Option<Task> {
        if text.trim().is_empty() {
            return None;
        }
        let user = self.current_user().await?;

        let suggestion = self.inner.categorizer.suggest(text).await;
        if let Some(notice) = &suggestion.notice {
            self.set_error(Some(notice.as_str())).await;
        }

        let task = Task::new(&user.uid, text).with_category(suggestion.category);
        match self.inner.store.create(task).await {
            Ok(task) => {
                self.set_error(None).await;
                Some(task)
            }
            Err(e) => {
                error!("Error adding task: {}", e);
                self.set_error(Some(ADD_FAILED)).await;
                None
            }
        }
    }

    pub async fn toggle_complete(&self, id: Uuid) {
        let Some(task) = self.local_task(id).await else {
            debug!("Toggle for unknown task {}", id);
            return;
        };
        let patch = TaskPatch::completed(!task.completed);
        if let Err(e) = self.inner.store.update(id, patch).await {
            error!("Error updating task: {}", e);
            self.set_error(Some(UPDATE_FAILED)).await;
        }
    }

    /// Record a human-chosen category
    pub async fn update_category(&self, id: Uuid, category: Category) {
        if self.local_task(id).await.is_none() {
            debug!("Category change for unknown task {}", id);
            return;
        }
        if let Err(e) = self
            .inner
            .store
            .update(id, TaskPatch::corrected_category(category))
            .await
        {
            error!("Error updating task category: {}", e);
            self.set_error(Some(CATEGORY_FAILED)).await;
        }
    }

    pub async fn delete_task(&self, id: Uuid) {
        if self.local_task(id).await.is_none() {
            debug!("Delete for unknown task {}", id);
            return;
        }
        if let Err(e) = self.inner.store.delete(id).await {
            error!("Error deleting task: {}", e);
            self.set_error(Some(DELETE_FAILED)).await;
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn current_user(&self) -> Option<User> {
        self.inner.state.read().await.user.clone()
    }

    /// Only tasks in the mirrored list belong to the signed-in user
    async fn local_task(&self, id: Uuid) -> Option<Task> {
        let state = self.inner.state.read().await;
        state.tasks.iter().find(|t| t.id == id).cloned()
    }

    async fn set_error(&self, error: Option<&str>) {
        self.inner.state.write().await.error = error.map(str::to_string);
        self.notify();
    }

    fn notify(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
    }
}
