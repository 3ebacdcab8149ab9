//! Route handlers

pub mod categorize;
pub mod health;

use axum::{middleware, Router};

use crate::rate_limit;
use crate::state::AppState;

/// All routes, rate limited per client
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(categorize::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ))
        .with_state(state)
}
