use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A durable marker that one recipient has not yet read one message.
///
/// Rows exist only for recipients other than the sender and are deleted when
/// the recipient acknowledges reading up to a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnreadMessage {
    /// Database-generated surrogate key.
    pub id: i64,
    pub chat_id: Uuid,
    pub sender_id: String,
    pub recipient_id: String,
    pub message_sent_utc: DateTime<Utc>,
}
