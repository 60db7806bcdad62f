//! Jordnaer Database Crate
//!
//! Persistence for the chat messaging core: connection management, embedded
//! migrations, chat-domain entities, and repository implementations.

use sqlx::SqlitePool;

use jordnaer_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

// Re-export repositories
pub use repos::{ChatRepository, MessageRepository, ProfileRepository, UnreadRepository};

// Re-export entities
pub use entities::{Chat, ChatMessage, UnreadMessage, UserProfile, MAX_MESSAGE_LENGTH};

// Re-export types
pub use types::{DatabaseError, DatabaseResult};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;

    Ok(pool)
}
