//! Services over the chat store.

pub mod chat_service;
pub mod unread_service;

pub use chat_service::ChatService;
pub use unread_service::UnreadService;
