//! Router and shared state.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use speechset_core::queue::domain::task_queue::TaskQueue;
use speechset_core::submission::task_submission::TaskSubmission;

use crate::handlers;

/// Shared application state
pub struct AppState {
    pub submission: TaskSubmission,
    /// Relay interval between progress messages on a WebSocket.
    pub relay_tick: Duration,
}

impl AppState {
    pub fn new(submission: TaskSubmission, relay_tick: Duration) -> Self {
        Self {
            submission,
            relay_tick,
        }
    }

    pub fn queue(&self) -> Arc<dyn TaskQueue> {
        self.submission.queue().clone()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::files::health))
        .route("/files/csvs", get(handlers::files::list_csvs))
        .route("/tasks", post(handlers::tasks::create_task))
        .route("/tasks/scrape", post(handlers::tasks::create_scrape))
        .route("/tasks/split", post(handlers::tasks::create_split))
        .route("/tasks/transcribe", post(handlers::tasks::create_transcribe))
        .route("/tasks/{task_id}/status", get(handlers::tasks::task_status))
        .route("/ws/{task_id}", get(handlers::websocket::handler))
        .layer(cors)
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
