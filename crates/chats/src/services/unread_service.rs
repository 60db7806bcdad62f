//! Unread tracking: the durable fallback for clients that missed a hub push.

use crate::types::ChatResult;
use chrono::{DateTime, Utc};
use jordnaer_database::UnreadRepository;
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

pub struct UnreadService {
    unread: UnreadRepository,
}

impl UnreadService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            unread: UnreadRepository::new(pool),
        }
    }

    /// Unacknowledged messages for one recipient in one chat.
    pub async fn get_unread_count(&self, chat_id: Uuid, recipient_id: &str) -> ChatResult<i64> {
        Ok(self.unread.count(chat_id, recipient_id).await?)
    }

    /// Unacknowledged messages for one recipient across all chats.
    pub async fn total_unread_count(&self, recipient_id: &str) -> ChatResult<i64> {
        Ok(self.unread.total_for_recipient(recipient_id).await?)
    }

    /// Acknowledge everything in the chat sent up to `upto_utc`.
    ///
    /// The bound keeps a concurrently arriving message unread: its row has a
    /// later timestamp and survives the delete. Returns the number of rows
    /// acknowledged.
    pub async fn mark_read(
        &self,
        chat_id: Uuid,
        recipient_id: &str,
        upto_utc: DateTime<Utc>,
    ) -> ChatResult<u64> {
        let acknowledged = self
            .unread
            .delete_up_to(chat_id, recipient_id, upto_utc)
            .await?;

        if acknowledged == 0 {
            warn!(%chat_id, %recipient_id, "no messages were marked as read");
        }

        Ok(acknowledged)
    }
}
