//! WebSocket call event streaming handler

use crate::application::CallOrchestratorHandle;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// WebSocket handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(handle): State<CallOrchestratorHandle>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, handle))
}

/// Forward every call event to the client as JSON
async fn handle_socket(socket: WebSocket, handle: CallOrchestratorHandle) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = handle.subscribe();

    info!("WebSocket client connected");

    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket client lagged, {} event(s) dropped", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        debug!("Failed to send event to WebSocket client");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                }
            }
        }
    });

    // Only a close frame matters; axum answers pings itself
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                debug!("Received close message");
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    info!("WebSocket client disconnected");
}
