// HTTP layer - JSON routes over `LedgerService`.

pub mod error;
pub mod handlers;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, routing::post, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::application::LedgerService;

pub use error::{ApiError, ApiJson, ErrorBody};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LedgerService>,
}

impl AppState {
    pub fn new(service: Arc<LedgerService>) -> Self {
        Self { service }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/customers", get(handlers::list_customers))
        .route("/customer", post(handlers::create_customer))
        .route("/customer/{id}", get(handlers::get_customer))
        .route(
            "/customer/{id}/transactions",
            get(handlers::list_customer_transactions),
        )
        .route(
            "/group",
            get(handlers::create_group_from_query).post(handlers::create_group),
        )
        .route("/group/{id}", get(handlers::get_group))
        .route("/groups", get(handlers::list_groups))
        .route("/deposit", post(handlers::deposit))
        .route("/withdraw", post(handlers::withdraw))
        .route("/balance/{id}", get(handlers::get_balance))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `bind` until Ctrl+C.
pub async fn serve(service: Arc<LedgerService>, bind: &str) -> Result<()> {
    let app = router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
