//! Categorization API for Intelligent To-Do
//!
//! Serves keyword-based task categories over HTTP, rate limited per client.

mod config;
mod rate_limit;
mod routes;
mod state;

use std::net::SocketAddr;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "categorizer_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    if !config.rate_limit_enabled {
        tracing::warn!("Rate limiting is disabled");
    }
    if config.trust_forwarded {
        tracing::info!("Identifying clients by X-Forwarded-For");
    }

    let app = routes::app(AppState::new(
        config.rate_limit_enabled,
        config.trust_forwarded,
    ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    tracing::info!("Categorization API listening on {}", config.addr());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
