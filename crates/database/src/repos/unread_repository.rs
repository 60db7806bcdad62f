//! Repository for unread-message tracking.

use crate::entities::UnreadMessage;
use crate::repos::chat_repository::parse_uuid;
use crate::types::DatabaseResult;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

pub struct UnreadRepository {
    pool: SqlitePool,
}

impl UnreadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record one unread marker. Runs inside the same transaction as the
    /// message insert so no message is ever visible without its unread rows.
    pub async fn insert(
        conn: &mut SqliteConnection,
        chat_id: Uuid,
        sender_id: &str,
        recipient_id: &str,
        message_sent_utc: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        sqlx::query(
            "INSERT INTO unread_messages (chat_id, sender_id, recipient_id, message_sent_utc)
             VALUES (?, ?, ?, ?)",
        )
        .bind(chat_id.to_string())
        .bind(sender_id)
        .bind(recipient_id)
        .bind(message_sent_utc)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn count(&self, chat_id: Uuid, recipient_id: &str) -> DatabaseResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM unread_messages
             WHERE chat_id = ? AND recipient_id = ?",
        )
        .bind(chat_id.to_string())
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("count")?)
    }

    pub async fn total_for_recipient(&self, recipient_id: &str) -> DatabaseResult<i64> {
        let row =
            sqlx::query("SELECT COUNT(*) AS count FROM unread_messages WHERE recipient_id = ?")
                .bind(recipient_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(row.try_get("count")?)
    }

    /// Unread counts per chat for one recipient, for hydrating the chat list.
    pub async fn counts_by_chat(&self, recipient_id: &str) -> DatabaseResult<HashMap<Uuid, i64>> {
        let rows = sqlx::query(
            "SELECT chat_id, COUNT(*) AS count FROM unread_messages
             WHERE recipient_id = ?
             GROUP BY chat_id",
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let chat_id = parse_uuid(row.try_get::<String, _>("chat_id")?)?;
            counts.insert(chat_id, row.try_get::<i64, _>("count")?);
        }
        Ok(counts)
    }

    /// Acknowledge everything sent up to (and including) `upto_utc`.
    ///
    /// The timestamp bound means a concurrent send with a later `sent_utc`
    /// keeps its unread row. Returns the number of acknowledged rows.
    pub async fn delete_up_to(
        &self,
        chat_id: Uuid,
        recipient_id: &str,
        upto_utc: DateTime<Utc>,
    ) -> DatabaseResult<u64> {
        let result = sqlx::query(
            "DELETE FROM unread_messages
             WHERE chat_id = ? AND recipient_id = ? AND message_sent_utc <= ?",
        )
        .bind(chat_id.to_string())
        .bind(recipient_id)
        .bind(upto_utc)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn list_for_recipient(
        &self,
        recipient_id: &str,
    ) -> DatabaseResult<Vec<UnreadMessage>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, sender_id, recipient_id, message_sent_utc
             FROM unread_messages
             WHERE recipient_id = ?
             ORDER BY message_sent_utc DESC",
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(UnreadMessage {
                    id: row.try_get("id")?,
                    chat_id: parse_uuid(row.try_get::<String, _>("chat_id")?)?,
                    sender_id: row.try_get("sender_id")?,
                    recipient_id: row.try_get("recipient_id")?,
                    message_sent_utc: row.try_get("message_sent_utc")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Chat, UserProfile};
    use crate::repos::test_support::create_test_pool;
    use crate::repos::{ChatRepository, ProfileRepository};
    use chrono::Duration;

    async fn seed_chat(pool: &SqlitePool, recipients: &[&str]) -> Uuid {
        let mut conn = pool.acquire().await.unwrap();
        for recipient in recipients {
            ProfileRepository::upsert(
                &mut conn,
                &UserProfile {
                    id: recipient.to_string(),
                    first_name: recipient.to_string(),
                    last_name: "Testsen".to_string(),
                },
            )
            .await
            .unwrap();
        }

        let chat = Chat::new(Uuid::new_v4(), None, Utc::now());
        ChatRepository::insert(&mut conn, &chat).await.unwrap();
        for recipient in recipients {
            ChatRepository::add_recipient(&mut conn, chat.id, recipient)
                .await
                .unwrap();
        }
        chat.id
    }

    #[tokio::test]
    async fn counts_track_inserted_rows() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = UnreadRepository::new(pool.clone());

        let chat_id = seed_chat(&pool, &["anna", "bo"]).await;

        let mut conn = pool.acquire().await.unwrap();
        for _ in 0..3 {
            UnreadRepository::insert(&mut conn, chat_id, "anna", "bo", Utc::now())
                .await
                .unwrap();
        }
        drop(conn);

        assert_eq!(repo.count(chat_id, "bo").await.unwrap(), 3);
        assert_eq!(repo.count(chat_id, "anna").await.unwrap(), 0);
        assert_eq!(repo.total_for_recipient("bo").await.unwrap(), 3);

        let by_chat = repo.counts_by_chat("bo").await.unwrap();
        assert_eq!(by_chat.get(&chat_id), Some(&3));
    }

    #[tokio::test]
    async fn delete_up_to_is_timestamp_bounded() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = UnreadRepository::new(pool.clone());

        let chat_id = seed_chat(&pool, &["anna", "bo"]).await;
        let now = Utc::now();

        let mut conn = pool.acquire().await.unwrap();
        UnreadRepository::insert(&mut conn, chat_id, "anna", "bo", now - Duration::minutes(2))
            .await
            .unwrap();
        UnreadRepository::insert(&mut conn, chat_id, "anna", "bo", now - Duration::minutes(1))
            .await
            .unwrap();
        // Arrives "after" the acknowledgement cut-off.
        UnreadRepository::insert(&mut conn, chat_id, "anna", "bo", now + Duration::minutes(1))
            .await
            .unwrap();
        drop(conn);

        let acknowledged = repo.delete_up_to(chat_id, "bo", now).await.unwrap();
        assert_eq!(acknowledged, 2);
        assert_eq!(repo.count(chat_id, "bo").await.unwrap(), 1);

        let remaining = repo.list_for_recipient("bo").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].message_sent_utc > now);
    }
}
