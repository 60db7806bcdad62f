//! Repository implementations for the chat domain.

pub mod chat_repository;
pub mod message_repository;
pub mod profile_repository;
pub mod unread_repository;

pub use chat_repository::ChatRepository;
pub use message_repository::MessageRepository;
pub use profile_repository::ProfileRepository;
pub use unread_repository::UnreadRepository;

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    /// A migrated throwaway database for repository tests.
    pub async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();

        crate::migrations::MIGRATOR.run(&pool).await.unwrap();

        (pool, temp_dir)
    }
}
