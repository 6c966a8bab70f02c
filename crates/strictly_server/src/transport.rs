//! WebSocket binding of the gateway, plus a health probe.

use crate::gateway::Gateway;
use crate::protocol::{ClientRequest, ServerEvent};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

/// Builds the HTTP router: `GET /ws` upgrades, `GET /health` reports counts.
pub fn router(gateway: Gateway) -> Router {
    Router::new()
        .route("/ws", get(upgrade))
        .route("/health", get(health))
        .with_state(gateway)
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    /// Always `"ok"` while serving.
    pub status: &'static str,
    /// Live sessions.
    pub sessions: usize,
    /// Identities in the wait queue.
    pub waiting: usize,
    /// Open connections.
    pub connected: usize,
}

async fn health(State(gateway): State<Gateway>) -> Json<Health> {
    let stats = gateway.registry().stats();
    Json(Health {
        status: "ok",
        sessions: stats.sessions,
        waiting: stats.waiting,
        connected: gateway.connections(),
    })
}

async fn upgrade(ws: WebSocketUpgrade, State(gateway): State<Gateway>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(gateway, socket))
}

/// Pumps one socket: JSON text frames in, events out, until it closes.
#[instrument(skip_all)]
pub async fn serve_socket(gateway: Gateway, socket: WebSocket) {
    let (mut outgoing, mut incoming) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let conn = gateway.connect(tx);
    info!(%conn, "WebSocket connected");

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    error!(%err, "Failed to encode event");
                    continue;
                }
            };
            if outgoing.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = incoming.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientRequest>(text.as_str()) {
                Ok(request) => gateway.dispatch(conn, request).await,
                Err(err) => {
                    debug!(%conn, %err, "Malformed frame");
                    gateway.reject(conn, format!("Malformed request: {err}"));
                }
            },
            Ok(Message::Binary(_)) => gateway.reject(conn, "Binary frames are not supported"),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(%conn, %err, "Socket error");
                break;
            }
        }
    }

    gateway.disconnect(conn).await;
    writer.abort();
    info!(%conn, "WebSocket closed");
}
