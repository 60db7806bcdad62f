use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chat conversation: an ordered message history plus a participant roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    /// Caller-assigned, stable identity.
    pub id: Uuid,
    /// Explicit display name. `None` means the name is derived from the roster.
    pub display_name: Option<String>,
    /// Monotonic watermark: never below the `sent_utc` of any message in the chat.
    pub last_message_sent_utc: DateTime<Utc>,
    pub started_utc: DateTime<Utc>,
    /// Timestamp of the last applied name override. Latest wins on redelivery.
    pub name_set_utc: Option<DateTime<Utc>>,
}

impl Chat {
    pub fn new(id: Uuid, display_name: Option<String>, started_utc: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name,
            last_message_sent_utc: started_utc,
            started_utc,
            name_set_utc: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chat_starts_with_watermark_at_started_utc() {
        let started = Utc::now();
        let chat = Chat::new(Uuid::new_v4(), None, started);

        assert_eq!(chat.last_message_sent_utc, started);
        assert_eq!(chat.started_utc, started);
        assert!(chat.display_name.is_none());
        assert!(chat.name_set_utc.is_none());
    }
}
