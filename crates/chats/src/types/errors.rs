//! Error types for the chat messaging core.

use jordnaer_database::DatabaseError;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

/// Main error type for the chat messaging core
#[derive(Debug, Error)]
pub enum ChatError {
    /// A `StartChat` replay: the chat id is already taken. The router treats
    /// this as a no-op success; it only surfaces as an error at the producer
    /// boundary.
    #[error("chat already exists: {id}")]
    DuplicateChat { id: Uuid },

    #[error("chat not found: {id}")]
    ChatNotFound { id: Uuid },

    #[error("profile {profile_id} is not a participant of chat {chat_id}")]
    NotAParticipant { chat_id: Uuid, profile_id: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("command queue closed: {topic}")]
    QueueClosed { topic: &'static str },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ChatError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_a_participant(chat_id: Uuid, profile_id: impl Into<String>) -> Self {
        Self::NotAParticipant {
            chat_id,
            profile_id: profile_id.into(),
        }
    }

    /// Whether the message bus should redeliver the failed command.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database(error) if error.is_transient())
    }
}

impl From<sqlx::Error> for ChatError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DatabaseError::Query(err))
    }
}
