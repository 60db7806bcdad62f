//! The real-time delivery hub: per-profile connection registry and
//! best-effort push fan-out.
//!
//! Pushes are invoked by the command router only after the store commit. A
//! profile without live connections simply misses the push; the unread store
//! catches them up on the next fetch.

use jordnaer_chats::{ChatMessageDto, ChatNotifier, StartChat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::debug;

const CONNECTION_EVENT_BUFFER: usize = 100;

/// Events pushed to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A message was appended to a chat the client participates in.
    ReceiveChatMessage { message: ChatMessageDto },
    /// A chat the client participates in was created.
    StartChat { chat: StartChat },
}

/// Connection registry addressed by profile id.
#[derive(Default)]
pub struct ChatHub {
    connections: Mutex<HashMap<String, broadcast::Sender<ServerEvent>>>,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for a profile. Every active connection of the
    /// same profile receives every push once.
    pub fn subscribe(&self, profile_id: &str) -> broadcast::Receiver<ServerEvent> {
        let mut connections = self.lock();
        connections
            .entry(profile_id.to_string())
            .or_insert_with(|| broadcast::channel(CONNECTION_EVENT_BUFFER).0)
            .subscribe()
    }

    /// Drop the registry entry once the last connection of a profile is gone.
    pub fn disconnect(&self, profile_id: &str) {
        let mut connections = self.lock();
        if let Some(sender) = connections.get(profile_id) {
            if sender.receiver_count() == 0 {
                connections.remove(profile_id);
            }
        }
    }

    pub fn connected_profiles(&self) -> usize {
        self.lock().len()
    }

    fn push_to_profiles(&self, recipient_ids: &[String], event: ServerEvent) {
        let connections = self.lock();
        for recipient_id in recipient_ids {
            let Some(sender) = connections.get(recipient_id) else {
                continue;
            };

            // A failed send means the last receiver vanished mid-push; the
            // unread store already covers the miss.
            if sender.send(event.clone()).is_err() {
                debug!(%recipient_id, "push skipped, no live connections");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, broadcast::Sender<ServerEvent>>> {
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ChatNotifier for ChatHub {
    fn receive_chat_message(&self, recipient_ids: &[String], message: &ChatMessageDto) {
        self.push_to_profiles(
            recipient_ids,
            ServerEvent::ReceiveChatMessage {
                message: message.clone(),
            },
        );
    }

    fn start_chat(&self, recipient_ids: &[String], chat: &StartChat) {
        self.push_to_profiles(recipient_ids, ServerEvent::StartChat { chat: chat.clone() });
    }
}
