//! WebSocket endpoint: registers a connection in the hub and forwards pushes.

use crate::error::GatewayError;
use crate::state::GatewayState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    profile_id: String,
}

/// Upgrade handler for `GET /ws?profile_id=...`.
pub async fn chat_websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<WebSocketQuery>,
) -> Result<Response, GatewayError> {
    let profile = state
        .profiles
        .find_by_id(&query.profile_id)
        .await
        .map_err(GatewayError::from)?
        .ok_or_else(|| {
            GatewayError::AuthenticationFailed(format!("unknown profile {}", query.profile_id))
        })?;

    Ok(ws.on_upgrade(move |socket| handle_chat_socket(socket, state, profile.id)))
}

async fn handle_chat_socket(socket: WebSocket, state: Arc<GatewayState>, profile_id: String) {
    debug!(%profile_id, "profile connected to chat hub");

    let (mut sink, mut stream) = socket.split();
    let mut events = state.hub.subscribe(&profile_id);

    let push_profile_id = profile_id.clone();
    let send_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // The unread store covers whatever this slow connection
                    // missed.
                    warn!(profile_id = %push_profile_id, skipped, "connection lagging, pushes dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let receive_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            if let Message::Close(_) = message {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = receive_task => {},
    }

    state.hub.disconnect(&profile_id);
    debug!(%profile_id, "profile disconnected from chat hub");
}
