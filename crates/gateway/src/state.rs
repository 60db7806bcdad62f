//! Shared application state for the gateway

use crate::hub::ChatHub;
use jordnaer_chats::{ChatService, CommandBus, UnreadService};
use jordnaer_database::ProfileRepository;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Everything the gateway handlers need: the command bus towards the router,
/// the read-side services, and the hub for websocket subscriptions.
#[derive(Clone)]
pub struct GatewayState {
    pub pool: SqlitePool,
    pub bus: CommandBus,
    pub hub: Arc<ChatHub>,
    pub chat_service: Arc<ChatService>,
    pub unread_service: Arc<UnreadService>,
    pub profiles: Arc<ProfileRepository>,
}

impl GatewayState {
    pub fn new(pool: SqlitePool, bus: CommandBus, hub: Arc<ChatHub>) -> Self {
        Self {
            chat_service: Arc::new(ChatService::new(pool.clone())),
            unread_service: Arc::new(UnreadService::new(pool.clone())),
            profiles: Arc::new(ProfileRepository::new(pool.clone())),
            pool,
            bus,
            hub,
        }
    }
}
