//! Repository for user profile lookups.
//!
//! Profiles are owned by the identity stack; the chat core only needs a
//! stable id and the names used for display-name derivation.

use crate::entities::UserProfile;
use crate::types::DatabaseResult;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

pub struct ProfileRepository {
    pool: SqlitePool,
}

impl ProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, profile_id: &str) -> DatabaseResult<Option<UserProfile>> {
        let row = sqlx::query("SELECT id, first_name, last_name FROM user_profiles WHERE id = ?")
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(map_profile).transpose()
    }

    pub async fn exists(&self, profile_id: &str) -> DatabaseResult<bool> {
        let row = sqlx::query("SELECT 1 FROM user_profiles WHERE id = ?")
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Insert or refresh a profile snapshot.
    pub async fn upsert(conn: &mut SqliteConnection, profile: &UserProfile) -> DatabaseResult<()> {
        sqlx::query(
            "INSERT INTO user_profiles (id, first_name, last_name)
             VALUES (?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET first_name = excluded.first_name,
                                            last_name = excluded.last_name",
        )
        .bind(&profile.id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Roster profiles of a chat, in roster insertion order.
    pub async fn roster_profiles(&self, chat_id: Uuid) -> DatabaseResult<Vec<UserProfile>> {
        let rows = sqlx::query(
            "SELECT p.id, p.first_name, p.last_name
             FROM chat_recipients r
             JOIN user_profiles p ON p.id = r.profile_id
             WHERE r.chat_id = ?
             ORDER BY r.rowid",
        )
        .bind(chat_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_profile).collect()
    }
}

fn map_profile(row: SqliteRow) -> DatabaseResult<UserProfile> {
    Ok(UserProfile {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
    })
}
