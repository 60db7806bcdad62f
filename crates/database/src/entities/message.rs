use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// A single message within a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Caller-assigned identity, used for replay detection.
    pub id: Uuid,
    pub chat_id: Uuid,
    /// Must be a roster member of the owning chat.
    pub sender_id: String,
    pub text: String,
    pub attachment_url: Option<String>,
    /// Soft delete: the row is kept for ordering and audit, hidden from display.
    pub is_deleted: bool,
    pub sent_utc: DateTime<Utc>,
}

impl ChatMessage {
    /// Validate message data before persisting.
    pub fn validate(&self) -> Result<(), String> {
        if self.sender_id.trim().is_empty() {
            return Err("message sender cannot be empty".to_string());
        }

        if self.text.trim().is_empty() {
            return Err("message text cannot be empty".to_string());
        }

        if self.text.len() > MAX_MESSAGE_LENGTH {
            return Err(format!(
                "message text too long (max {MAX_MESSAGE_LENGTH} characters)"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            chat_id: Uuid::new_v4(),
            sender_id: "sender".to_string(),
            text: text.to_string(),
            attachment_url: None,
            is_deleted: false,
            sent_utc: Utc::now(),
        }
    }

    #[test]
    fn validates_text_bounds() {
        assert!(message("hej").validate().is_ok());
        assert!(message("").validate().is_err());
        assert!(message("   ").validate().is_err());
        assert!(message(&"a".repeat(MAX_MESSAGE_LENGTH + 1)).validate().is_err());
    }

    #[test]
    fn rejects_empty_sender() {
        let mut msg = message("hej");
        msg.sender_id = String::new();
        assert!(msg.validate().is_err());
    }
}
