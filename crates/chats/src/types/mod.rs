//! Shared types for the chat messaging core.

pub mod commands;
pub mod errors;
pub mod responses;

pub use commands::{
    topics, ChatCommand, ChatMessageDto, SendMessage, SetChatName, StartChat, UserSlim,
};
pub use errors::{ChatError, ChatResult};
pub use responses::{resolve_display_name, ChatDto};
