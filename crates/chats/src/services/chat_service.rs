//! Read side of the chat store: chat lists, message pages, roster lookups.

use crate::types::{ChatDto, ChatError, ChatMessageDto, ChatResult, UserSlim};
use jordnaer_database::{ChatRepository, MessageRepository, ProfileRepository, UnreadRepository};
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

pub struct ChatService {
    chats: ChatRepository,
    messages: MessageRepository,
    profiles: ProfileRepository,
    unread: UnreadRepository,
}

impl ChatService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            chats: ChatRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool.clone()),
            unread: UnreadRepository::new(pool),
        }
    }

    /// The viewer's chat list: newest activity first, with roster and the
    /// viewer's unread count per chat.
    pub async fn get_chats(
        &self,
        profile_id: &str,
        skip: i64,
        take: i64,
    ) -> ChatResult<Vec<ChatDto>> {
        let chats = self.chats.list_for_profile(profile_id, skip, take).await?;
        let unread_counts = self.unread.counts_by_chat(profile_id).await?;

        let mut result = Vec::with_capacity(chats.len());
        for chat in chats {
            let roster = self.profiles.roster_profiles(chat.id).await?;
            result.push(ChatDto {
                id: chat.id,
                display_name: chat.display_name,
                recipients: roster.into_iter().map(UserSlim::from).collect(),
                last_message_sent_utc: chat.last_message_sent_utc,
                started_utc: chat.started_utc,
                unread_message_count: unread_counts.get(&chat.id).copied().unwrap_or(0),
            });
        }

        Ok(result)
    }

    /// One page of a chat's visible messages, oldest first. Only participants
    /// may read.
    pub async fn get_chat_messages(
        &self,
        chat_id: Uuid,
        profile_id: &str,
        skip: i64,
        take: i64,
    ) -> ChatResult<Vec<ChatMessageDto>> {
        if !self.chats.exists(chat_id).await? {
            return Err(ChatError::ChatNotFound { id: chat_id });
        }

        if !self.chats.is_recipient(chat_id, profile_id).await? {
            warn!(
                %chat_id,
                %profile_id,
                "message page requested by a profile outside the chat, access denied"
            );
            return Err(ChatError::not_a_participant(chat_id, profile_id));
        }

        let messages = self.messages.list_for_chat(chat_id, skip, take).await?;
        Ok(messages.into_iter().map(ChatMessageDto::from).collect())
    }

    /// Find the chat whose roster is exactly the given profiles, if one exists.
    pub async fn find_chat_by_recipients(
        &self,
        recipient_ids: &[String],
    ) -> ChatResult<Option<Uuid>> {
        Ok(self.chats.find_by_exact_recipients(recipient_ids).await?)
    }
}
