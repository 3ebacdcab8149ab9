//! Intelligent To-Do client
//!
//! This crate wires a signed-in user to their live task list:
//! authentication state drives a per-user subscription on the task store,
//! new tasks are labelled by the categorization service, and every handler
//! reports failures through a single status string.

pub mod auth;
pub mod categorizer;
pub mod command;
pub mod config;
mod error;
pub mod render;
pub mod session;

pub use auth::{AuthState, GithubIdentityProvider, IdentityProvider, StaticIdentityProvider, User};
pub use categorizer::{Categorizer, HttpCategorizer, KeywordCategorizer, Suggestion};
pub use error::{AppError, Result};
pub use session::{TodoSession, View};
