//! Repository for chat and roster data access.

use crate::entities::Chat;
use crate::types::{DatabaseError, DatabaseResult};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use sqlx::sqlite::SqliteRow;
use tracing::info;
use uuid::Uuid;

/// Repository for chat database operations.
///
/// Reads go through the pool; mutations take an explicit connection so the
/// command consumers can run them inside one transaction.
pub struct ChatRepository {
    pool: SqlitePool,
}

impl ChatRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn exists(&self, chat_id: Uuid) -> DatabaseResult<bool> {
        let row = sqlx::query("SELECT 1 FROM chats WHERE id = ?")
            .bind(chat_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    pub async fn find_by_id(&self, chat_id: Uuid) -> DatabaseResult<Option<Chat>> {
        let row = sqlx::query(
            "SELECT id, display_name, last_message_sent_utc, started_utc, name_set_utc
             FROM chats WHERE id = ?",
        )
        .bind(chat_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_chat).transpose()
    }

    /// Chats the profile participates in, newest activity first.
    pub async fn list_for_profile(
        &self,
        profile_id: &str,
        skip: i64,
        take: i64,
    ) -> DatabaseResult<Vec<Chat>> {
        let rows = sqlx::query(
            "SELECT c.id, c.display_name, c.last_message_sent_utc, c.started_utc, c.name_set_utc
             FROM chats c
             JOIN chat_recipients r ON r.chat_id = c.id
             WHERE r.profile_id = ?
             ORDER BY c.last_message_sent_utc DESC
             LIMIT ? OFFSET ?",
        )
        .bind(profile_id)
        .bind(take)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_chat).collect()
    }

    /// Find the chat whose roster is exactly the given set of profiles.
    pub async fn find_by_exact_recipients(
        &self,
        recipient_ids: &[String],
    ) -> DatabaseResult<Option<Uuid>> {
        if recipient_ids.is_empty() {
            return Ok(None);
        }

        let placeholders = vec!["?"; recipient_ids.len()].join(", ");
        let sql = format!(
            "SELECT c.id FROM chats c
             WHERE (SELECT COUNT(*) FROM chat_recipients r WHERE r.chat_id = c.id) = ?
               AND NOT EXISTS (
                   SELECT 1 FROM chat_recipients r
                   WHERE r.chat_id = c.id AND r.profile_id NOT IN ({placeholders}))
             LIMIT 1"
        );

        let mut query = sqlx::query(&sql).bind(recipient_ids.len() as i64);
        for id in recipient_ids {
            query = query.bind(id);
        }

        let row = query.fetch_optional(&self.pool).await?;
        row.map(|row| parse_uuid(row.try_get::<String, _>("id")?))
            .transpose()
    }

    pub async fn insert(conn: &mut SqliteConnection, chat: &Chat) -> DatabaseResult<()> {
        sqlx::query(
            "INSERT INTO chats (id, display_name, last_message_sent_utc, started_utc, name_set_utc)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(chat.id.to_string())
        .bind(&chat.display_name)
        .bind(chat.last_message_sent_utc)
        .bind(chat.started_utc)
        .bind(chat.name_set_utc)
        .execute(conn)
        .await?;

        info!(chat_id = %chat.id, "created new chat");
        Ok(())
    }

    pub async fn add_recipient(
        conn: &mut SqliteConnection,
        chat_id: Uuid,
        profile_id: &str,
    ) -> DatabaseResult<()> {
        sqlx::query("INSERT INTO chat_recipients (chat_id, profile_id) VALUES (?, ?)")
            .bind(chat_id.to_string())
            .bind(profile_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Roster profile ids in insertion order.
    pub async fn roster_ids(&self, chat_id: Uuid) -> DatabaseResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT profile_id FROM chat_recipients WHERE chat_id = ? ORDER BY rowid",
        )
        .bind(chat_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok(row.try_get::<String, _>("profile_id")?))
            .collect()
    }

    pub async fn is_recipient(&self, chat_id: Uuid, profile_id: &str) -> DatabaseResult<bool> {
        let row =
            sqlx::query("SELECT 1 FROM chat_recipients WHERE chat_id = ? AND profile_id = ?")
                .bind(chat_id.to_string())
                .bind(profile_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }

    /// Advance the watermark, never letting it regress on out-of-order delivery.
    pub async fn advance_watermark(
        conn: &mut SqliteConnection,
        chat_id: Uuid,
        sent_utc: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        sqlx::query(
            "UPDATE chats SET last_message_sent_utc = ?
             WHERE id = ? AND last_message_sent_utc < ?",
        )
        .bind(sent_utc)
        .bind(chat_id.to_string())
        .bind(sent_utc)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Apply a display-name override. Returns `false` when a newer override is
    /// already in place (latest `set_utc` wins across redeliveries).
    pub async fn set_display_name(
        conn: &mut SqliteConnection,
        chat_id: Uuid,
        display_name: Option<&str>,
        set_utc: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE chats SET display_name = ?, name_set_utc = ?
             WHERE id = ? AND (name_set_utc IS NULL OR name_set_utc < ?)",
        )
        .bind(display_name)
        .bind(set_utc)
        .bind(chat_id.to_string())
        .bind(set_utc)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_chat(row: SqliteRow) -> DatabaseResult<Chat> {
    Ok(Chat {
        id: parse_uuid(row.try_get::<String, _>("id")?)?,
        display_name: row.try_get("display_name")?,
        last_message_sent_utc: row.try_get("last_message_sent_utc")?,
        started_utc: row.try_get("started_utc")?,
        name_set_utc: row.try_get("name_set_utc")?,
    })
}

pub(crate) fn parse_uuid(value: String) -> DatabaseResult<Uuid> {
    Uuid::parse_str(&value)
        .map_err(|_| DatabaseError::corrupt_row(format!("invalid uuid '{value}'")))
}
