//! WebSocket progress channel for one task.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};

use speechset_core::queue::domain::task::TaskId;
use speechset_core::relay::progress_relay::{ProgressRelay, RelayMessage};

use crate::server::AppState;

use super::tasks::parse_task_id;

/// WebSocket upgrade handler
pub async fn handler(
    ws: WebSocketUpgrade,
    Path(task_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let task_id = match parse_task_id(&task_id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };
    ws.on_upgrade(move |socket| handle_socket(socket, state, task_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, task_id: TaskId) {
    let (mut sender, mut receiver) = socket.split();
    let relay = RelayDriver::new(ProgressRelay::new(state.queue(), task_id).with_tick(state.relay_tick));

    while let Some(message) = relay.next_message().await {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                log::error!("Failed to encode relay message for {task_id}: {e}");
                break;
            }
        };
        if sender.send(Message::Text(text.into())).await.is_err() {
            log::debug!("Client for {task_id} disconnected");
            return;
        }
        if message.is_terminal() {
            break;
        }

        tokio::select! {
            _ = relay.wait_next_tick() => {}
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    log::debug!("Client for {task_id} disconnected");
                    return;
                }
                Some(Ok(_)) => {}
            },
        }
    }
    let _ = sender.close().await;
}

/// Runs the blocking relay on the blocking thread pool.
///
/// A fault while producing a message (a panic in the blocking task) turns
/// into the relay's one terminal `error` message.
pub struct RelayDriver {
    relay: Arc<Mutex<ProgressRelay>>,
}

impl RelayDriver {
    pub fn new(relay: ProgressRelay) -> Self {
        Self {
            relay: Arc::new(Mutex::new(relay)),
        }
    }

    /// Next message to send, `None` once a terminal message went out.
    pub async fn next_message(&self) -> Option<RelayMessage> {
        let relay = self.relay.clone();
        match tokio::task::spawn_blocking(move || lock(&relay).tick()).await {
            Ok(message) => message,
            Err(e) => {
                log::error!("Progress relay failed: {e}");
                lock(&self.relay).fail(format!("Progress relay failed: {e}"))
            }
        }
    }

    pub async fn wait_next_tick(&self) {
        let relay = self.relay.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || lock(&relay).wait_next_tick()).await {
            log::warn!("Progress relay wait failed: {e}");
        }
    }
}

fn lock(relay: &Mutex<ProgressRelay>) -> MutexGuard<'_, ProgressRelay> {
    relay.lock().unwrap_or_else(PoisonError::into_inner)
}
