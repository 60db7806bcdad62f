//! # Jordnaer Gateway Crate
//!
//! The boundary of the chat messaging core: a websocket hub that delivers
//! real-time pushes to connected profiles, and a thin REST surface that
//! validates producer requests and enqueues them on the command bus.
//!
//! ## Architecture
//!
//! - **Hub**: per-profile connection registry; implements the core's
//!   `ChatNotifier` seam and is invoked only after commands commit.
//! - **WebSocket**: `GET /ws` registers a connection and forwards hub events
//!   as JSON frames.
//! - **REST**: command producers and the read side (chat list, message pages,
//!   unread counts).

pub mod error;
pub mod hub;
pub mod rest;
pub mod state;
pub mod websocket;

pub use error::{GatewayError, GatewayResult};
pub use hub::{ChatHub, ServerEvent};
pub use state::GatewayState;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let arc_state = Arc::new(state);

    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/healthz", get(health))
        .route("/ws", get(websocket::chat_websocket_handler))
        .nest("/api", rest::create_rest_routes())
        .with_state(arc_state)
        .layer(cors)
}

async fn health() -> &'static str {
    "ok"
}
