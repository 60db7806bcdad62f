//! Jordnaer Chats Crate
//!
//! The chat messaging core: command contracts over named queues, the command
//! router that applies them to the chat store, per-chat serialization, unread
//! tracking, display-name resolution, and the seam towards the real-time
//! delivery hub.
//!
//! Control flow: a producer publishes a [`ChatCommand`] on the [`CommandBus`];
//! the topic worker hands it to the [`CommandRouter`], which persists the
//! mutation transactionally under the chat's lock, updates unread tracking,
//! and then pushes a notification through the [`ChatNotifier`] to each
//! recipient's active connections.

pub mod bus;
pub mod locks;
pub mod notifier;
pub mod router;
pub mod services;
pub mod types;

pub use bus::CommandBus;
pub use locks::ChatLockMap;
pub use notifier::{ChatNotifier, NullNotifier};
pub use router::CommandRouter;
pub use services::{ChatService, UnreadService};
pub use types::{
    resolve_display_name, topics, ChatCommand, ChatDto, ChatError, ChatMessageDto, ChatResult,
    SendMessage, SetChatName, StartChat, UserSlim,
};
