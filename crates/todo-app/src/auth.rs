//! Authentication state and identity providers
//!
//! Providers publish the current [`AuthState`] on a watch channel; the
//! session listens to it the same way a browser app listens for auth state
//! changes.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{AppError, Result};

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl User {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name shown in the header: display name, then email, then uid
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

/// What the identity provider currently knows about the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Not resolved yet
    Unknown,
    SignedOut,
    SignedIn(User),
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::SignedIn(user) => Some(user),
            _ => None,
        }
    }
}

/// Third-party sign-in
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in and return the user
    async fn sign_in(&self) -> Result<User>;

    /// Sign out the current user
    async fn sign_out(&self) -> Result<()>;

    /// Listen for auth state changes; the current state is readable at once
    fn subscribe(&self) -> watch::Receiver<AuthState>;
}

// ============================================================================
// In-process provider
// ============================================================================

/// Provider with a fixed user, for offline runs and tests
pub struct StaticIdentityProvider {
    user: Option<User>,
    fail_sign_out: bool,
    state: watch::Sender<AuthState>,
}

impl StaticIdentityProvider {
    /// Signed out; `sign_in` yields `user`
    pub fn new(user: User) -> Self {
        Self::with_state(Some(user), AuthState::SignedOut)
    }

    /// Already signed in as `user`, like a restored session
    pub fn signed_in(user: User) -> Self {
        let state = AuthState::SignedIn(user.clone());
        Self::with_state(Some(user), state)
    }

    /// Every sign-in attempt fails
    pub fn rejecting() -> Self {
        Self::with_state(None, AuthState::SignedOut)
    }

    /// Starts in `initial`, for simulating an unresolved session
    pub fn with_state(user: Option<User>, initial: AuthState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            user,
            fail_sign_out: false,
            state,
        }
    }

    /// Make `sign_out` fail
    pub fn failing_sign_out(mut self) -> Self {
        self.fail_sign_out = true;
        self
    }

    /// Publish a state directly
    pub fn set_state(&self, state: AuthState) {
        self.state.send_replace(state);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn sign_in(&self) -> Result<User> {
        let user = self
            .user
            .clone()
            .ok_or_else(|| AppError::Auth("sign-in rejected".to_string()))?;
        self.state.send_replace(AuthState::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        if self.fail_sign_out {
            return Err(AppError::Auth("sign-out rejected".to_string()));
        }
        self.state.send_replace(AuthState::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }
}

// ============================================================================
// GitHub
// ============================================================================

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: u64,
    login: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<GithubUser> for User {
    fn from(user: GithubUser) -> Self {
        Self {
            uid: user.id.to_string(),
            display_name: Some(user.name.unwrap_or(user.login)),
            email: user.email,
        }
    }
}

/// Signs in with a GitHub token by resolving the token's user
pub struct GithubIdentityProvider {
    client: reqwest::Client,
    api_url: String,
    token: String,
    state: watch::Sender<AuthState>,
}

impl GithubIdentityProvider {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        let (state, _) = watch::channel(AuthState::SignedOut);
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            state,
        }
    }
}

#[async_trait]
impl IdentityProvider for GithubIdentityProvider {
    async fn sign_in(&self) -> Result<User> {
        debug!("Resolving GitHub user at {}/user", self.api_url);
        let resp = self
            .client
            .get(format!("{}/user", self.api_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "intelligent-todo")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Auth(format!("GitHub returned HTTP {}", resp.status())));
        }

        let user: User = resp.json::<GithubUser>().await?.into();
        info!("Signed in as {} ({})", user.label(), user.uid);
        self.state.send_replace(AuthState::SignedIn(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        self.state.send_replace(AuthState::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }
}
