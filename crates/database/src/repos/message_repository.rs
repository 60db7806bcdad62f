//! Repository for chat message data access.

use crate::entities::ChatMessage;
use crate::repos::chat_repository::parse_uuid;
use crate::types::DatabaseResult;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Replay detection: has a message with this id already been persisted?
    pub async fn exists(&self, message_id: Uuid) -> DatabaseResult<bool> {
        let row = sqlx::query("SELECT 1 FROM chat_messages WHERE id = ?")
            .bind(message_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    pub async fn insert(conn: &mut SqliteConnection, message: &ChatMessage) -> DatabaseResult<()> {
        sqlx::query(
            "INSERT INTO chat_messages (id, chat_id, sender_id, text, attachment_url, is_deleted, sent_utc)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(message.chat_id.to_string())
        .bind(&message.sender_id)
        .bind(&message.text)
        .bind(&message.attachment_url)
        .bind(message.is_deleted)
        .bind(message.sent_utc)
        .execute(conn)
        .await?;

        info!(
            message_id = %message.id,
            chat_id = %message.chat_id,
            sender_id = %message.sender_id,
            "persisted chat message"
        );
        Ok(())
    }

    /// Messages of one chat for display: soft-deleted rows excluded, oldest
    /// first, paginated.
    pub async fn list_for_chat(
        &self,
        chat_id: Uuid,
        skip: i64,
        take: i64,
    ) -> DatabaseResult<Vec<ChatMessage>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, sender_id, text, attachment_url, is_deleted, sent_utc
             FROM chat_messages
             WHERE chat_id = ? AND is_deleted = 0
             ORDER BY sent_utc ASC
             LIMIT ? OFFSET ?",
        )
        .bind(chat_id.to_string())
        .bind(take)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_message).collect()
    }

    /// Every message of a chat, deleted ones included. Audit/invariant checks.
    pub async fn list_all_for_chat(&self, chat_id: Uuid) -> DatabaseResult<Vec<ChatMessage>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, sender_id, text, attachment_url, is_deleted, sent_utc
             FROM chat_messages
             WHERE chat_id = ?
             ORDER BY sent_utc ASC",
        )
        .bind(chat_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_message).collect()
    }

    /// Soft delete: keep the row for ordering and audit, hide it from display.
    pub async fn mark_deleted(&self, message_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("UPDATE chat_messages SET is_deleted = 1 WHERE id = ?")
            .bind(message_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_message(row: SqliteRow) -> DatabaseResult<ChatMessage> {
    Ok(ChatMessage {
        id: parse_uuid(row.try_get::<String, _>("id")?)?,
        chat_id: parse_uuid(row.try_get::<String, _>("chat_id")?)?,
        sender_id: row.try_get("sender_id")?,
        text: row.try_get("text")?,
        attachment_url: row.try_get("attachment_url")?,
        is_deleted: row.try_get("is_deleted")?,
        sent_utc: row.try_get("sent_utc")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Chat, UserProfile};
    use crate::repos::test_support::create_test_pool;
    use crate::repos::{ChatRepository, ProfileRepository};
    use chrono::{Duration, Utc};

    async fn seed_chat_with_sender(pool: &SqlitePool, sender: &str) -> Uuid {
        let mut conn = pool.acquire().await.unwrap();
        ProfileRepository::upsert(
            &mut conn,
            &UserProfile {
                id: sender.to_string(),
                first_name: sender.to_string(),
                last_name: "Testsen".to_string(),
            },
        )
        .await
        .unwrap();

        let chat = Chat::new(Uuid::new_v4(), None, Utc::now());
        ChatRepository::insert(&mut conn, &chat).await.unwrap();
        ChatRepository::add_recipient(&mut conn, chat.id, sender)
            .await
            .unwrap();
        chat.id
    }

    fn message(chat_id: Uuid, sender: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            chat_id,
            sender_id: sender.to_string(),
            text: text.to_string(),
            attachment_url: None,
            is_deleted: false,
            sent_utc: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_and_exists_round_trip() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MessageRepository::new(pool.clone());

        let chat_id = seed_chat_with_sender(&pool, "anna").await;
        let msg = message(chat_id, "anna", "hej");

        let mut conn = pool.acquire().await.unwrap();
        MessageRepository::insert(&mut conn, &msg).await.unwrap();
        drop(conn);

        assert!(repo.exists(msg.id).await.unwrap());
        assert!(!repo.exists(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn listing_excludes_soft_deleted_and_orders_ascending() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MessageRepository::new(pool.clone());

        let chat_id = seed_chat_with_sender(&pool, "anna").await;

        let mut first = message(chat_id, "anna", "først");
        first.sent_utc = Utc::now() - Duration::minutes(2);
        let mut second = message(chat_id, "anna", "så");
        second.sent_utc = Utc::now() - Duration::minutes(1);
        let mut hidden = message(chat_id, "anna", "skjult");
        hidden.is_deleted = true;

        let mut conn = pool.acquire().await.unwrap();
        for msg in [&second, &hidden, &first] {
            MessageRepository::insert(&mut conn, msg).await.unwrap();
        }
        drop(conn);

        let visible = repo.list_for_chat(chat_id, 0, 10).await.unwrap();
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].text, "først");
        assert_eq!(visible[1].text, "så");

        let all = repo.list_all_for_chat(chat_id).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn mark_deleted_hides_message_from_display() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MessageRepository::new(pool.clone());

        let chat_id = seed_chat_with_sender(&pool, "anna").await;
        let msg = message(chat_id, "anna", "fortryd");

        let mut conn = pool.acquire().await.unwrap();
        MessageRepository::insert(&mut conn, &msg).await.unwrap();
        drop(conn);

        assert!(repo.mark_deleted(msg.id).await.unwrap());
        assert!(repo.list_for_chat(chat_id, 0, 10).await.unwrap().is_empty());
        // The row itself is retained.
        assert!(repo.exists(msg.id).await.unwrap());
    }
}
