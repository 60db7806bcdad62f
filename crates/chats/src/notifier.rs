//! The real-time delivery seam between the command router and the hub.

use crate::types::{ChatMessageDto, StartChat};

/// Push contract towards connected clients.
///
/// Implementations are fire-and-forget: they must not block, must swallow
/// per-connection failures, and are invoked only after the originating
/// command has been durably committed. The unread store is the fallback for
/// anything a disconnected client misses.
pub trait ChatNotifier: Send + Sync {
    /// Push a freshly persisted message to each recipient's active connections.
    fn receive_chat_message(&self, recipient_ids: &[String], message: &ChatMessageDto);

    /// Push a freshly created chat to each recipient's active connections.
    fn start_chat(&self, recipient_ids: &[String], chat: &StartChat);
}

/// Notifier for contexts without connected clients (tools, tests, migrations).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl ChatNotifier for NullNotifier {
    fn receive_chat_message(&self, _recipient_ids: &[String], _message: &ChatMessageDto) {}

    fn start_chat(&self, _recipient_ids: &[String], _chat: &StartChat) {}
}
