//! Chat domain entities.

pub mod chat;
pub mod message;
pub mod profile;
pub mod unread;

pub use chat::Chat;
pub use message::{ChatMessage, MAX_MESSAGE_LENGTH};
pub use profile::UserProfile;
pub use unread::UnreadMessage;
