//! WebSocket progress streaming with backpressure.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use mp3ify_models::{JobId, StatusUpdate};

use crate::metrics;
use crate::state::AppState;

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

/// Configuration for WebSocket backpressure.
const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Send a status update with backpressure handling.
async fn send_ws_message(tx: &mpsc::Sender<Message>, update: &StatusUpdate) -> bool {
    let json = match serde_json::to_string(update) {
        Ok(j) => j,
        Err(_) => return false,
    };
    // Use try_send for non-blocking, fall back to blocking send
    match tx.try_send(Message::Text(json.clone())) {
        Ok(_) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            debug!("WebSocket send buffer full, applying backpressure");
            tx.send(Message::Text(json)).await.is_ok()
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// WebSocket progress endpoint, keyed by job id.
pub async fn ws_progress(
    ws: WebSocketUpgrade,
    Path(file_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // Track connection
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection();

    ws.on_upgrade(move |socket| async move {
        handle_progress_socket(socket, state, JobId::from_string(file_id)).await;
        // Decrement on disconnect
        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
}

/// Forward status updates for one job until it reaches a terminal state or
/// the client goes away. The client may stay completely silent; the
/// subscription is cleaned up whenever the socket closes.
async fn handle_progress_socket(socket: WebSocket, state: AppState, job_id: JobId) {
    let (ws_sender, mut receiver) = socket.split();

    // Bounded channel between the forward loop and the socket writer
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);
    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    info!(job_id = %job_id, "WebSocket observer connected");

    // Subscribe before the snapshot check so a terminal update cannot slip
    // between the two.
    let mut stream = match state.progress.subscribe(&job_id).await {
        Ok(s) => s,
        Err(e) => {
            warn!(job_id = %job_id, "Failed to subscribe to progress: {e}");
            drop(tx);
            let _ = send_task.await;
            return;
        }
    };

    // A reconnect after completion still gets one final snapshot.
    if let Ok(Some(record)) = state.store.get(&job_id).await {
        if record.status.is_terminal() {
            let _ = send_ws_message(&tx, &StatusUpdate::from_record(&record)).await;
            drop(tx);
            let _ = send_task.await;
            return;
        }
    }

    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // the first tick fires immediately

    loop {
        tokio::select! {
            // Status update from the worker
            update = stream.next() => {
                match update {
                    Some(update) => {
                        metrics::record_ws_message_sent();
                        let terminal = update.status.is_terminal();

                        if !send_ws_message(&tx, &update).await {
                            warn!(job_id = %job_id, "WebSocket send failed, client disconnected");
                            break;
                        }

                        if terminal {
                            debug!(job_id = %job_id, status = %update.status, "Job reached terminal state, closing socket");
                            break;
                        }
                    }
                    None => break, // Stream ended
                }
            }
            // Heartbeat to keep the connection alive
            _ = heartbeat.tick() => {
                if tx.send(Message::Ping(vec![])).await.is_err() {
                    warn!(job_id = %job_id, "Heartbeat failed, client disconnected");
                    break;
                }
            }
            // Client messages (pongs, keep-alives, close)
            client_msg = receiver.next() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | None => {
                        info!(job_id = %job_id, "Client closed connection");
                        break;
                    }
                    Some(Err(_)) => break,
                    // Pongs and stray text keep the connection alive
                    _ => {}
                }
            }
        }
    }

    drop(tx);
    let _ = send_task.await;
    info!(job_id = %job_id, "WebSocket observer disconnected");
}
