//! The command router: applies queued commands to the chat store and emits
//! delivery events.
//!
//! Every mutation runs inside the owning chat's lock and a single
//! transaction; hub pushes happen strictly after the commit. Re-processing an
//! already-applied command is a no-op, which makes at-least-once redelivery
//! safe.

use crate::locks::ChatLockMap;
use crate::notifier::ChatNotifier;
use crate::types::{ChatCommand, ChatError, ChatResult, SendMessage, SetChatName, StartChat};
use jordnaer_database::{
    Chat, ChatRepository, MessageRepository, ProfileRepository, UnreadRepository,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MAX_DISPLAY_NAME_LENGTH: usize = 255;

pub struct CommandRouter<N: ChatNotifier> {
    pool: SqlitePool,
    locks: ChatLockMap,
    notifier: Arc<N>,
    chats: ChatRepository,
    messages: MessageRepository,
}

impl<N: ChatNotifier> CommandRouter<N> {
    pub fn new(pool: SqlitePool, notifier: Arc<N>) -> Self {
        Self {
            chats: ChatRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            pool,
            locks: ChatLockMap::new(),
            notifier,
        }
    }

    /// Apply one command. `Ok` covers both first delivery and detected
    /// replays; `Err` is either a rejection or a transient store failure the
    /// bus may redeliver.
    pub async fn dispatch(&self, command: ChatCommand) -> ChatResult<()> {
        match command {
            ChatCommand::StartChat(cmd) => self.apply_start_chat(cmd).await,
            ChatCommand::SendMessage(cmd) => self.apply_send_message(cmd).await,
            ChatCommand::SetChatName(cmd) => self.apply_set_chat_name(cmd).await,
        }
    }

    async fn apply_start_chat(&self, cmd: StartChat) -> ChatResult<()> {
        info!(chat_id = %cmd.id, "consuming start-chat command");

        let _guard = self.locks.lock(cmd.id).await;

        if self.chats.exists(cmd.id).await? {
            // Replay of an already-created chat: the existing roster and
            // messages stay untouched.
            info!(chat_id = %cmd.id, "chat already exists, replay ignored");
            return Ok(());
        }

        let display_name = normalize_display_name(cmd.display_name.as_deref())?;

        // The watermark is the newest seed message, not whatever the producer
        // claims; it must cover every message in the chat.
        let watermark = cmd
            .messages
            .iter()
            .map(|message| message.sent_utc)
            .max()
            .unwrap_or(cmd.last_message_sent_utc);

        let chat = Chat {
            id: cmd.id,
            display_name: display_name.map(str::to_string),
            last_message_sent_utc: watermark,
            started_utc: cmd.started_utc,
            name_set_utc: None,
        };

        let mut tx = self.pool.begin().await?;

        ChatRepository::insert(&mut tx, &chat).await?;

        for recipient in &cmd.recipients {
            ProfileRepository::upsert(&mut tx, &recipient.to_profile()).await?;
            ChatRepository::add_recipient(&mut tx, cmd.id, &recipient.id).await?;
        }

        for message in &cmd.messages {
            MessageRepository::insert(&mut tx, &message.to_chat_message()).await?;

            for recipient in cmd
                .recipients
                .iter()
                .filter(|recipient| recipient.id != cmd.initiator_id)
            {
                UnreadRepository::insert(
                    &mut tx,
                    cmd.id,
                    &message.sender_id,
                    &recipient.id,
                    message.sent_utc,
                )
                .await?;
            }
        }

        tx.commit().await?;

        let recipient_ids: Vec<String> = cmd
            .recipients
            .iter()
            .map(|recipient| recipient.id.clone())
            .collect();
        self.notifier.start_chat(&recipient_ids, &cmd);

        info!(
            chat_id = %cmd.id,
            recipients = recipient_ids.len(),
            seed_messages = cmd.messages.len(),
            "chat started"
        );
        Ok(())
    }

    async fn apply_send_message(&self, cmd: SendMessage) -> ChatResult<()> {
        debug!(chat_id = %cmd.chat_id, message_id = %cmd.id, "consuming send-message command");

        let _guard = self.locks.lock(cmd.chat_id).await;

        if !self.chats.exists(cmd.chat_id).await? {
            warn!(chat_id = %cmd.chat_id, "send-message rejected: chat not found");
            return Err(ChatError::ChatNotFound { id: cmd.chat_id });
        }

        let roster = self.chats.roster_ids(cmd.chat_id).await?;
        if !roster.iter().any(|id| id == &cmd.sender_id) {
            warn!(
                chat_id = %cmd.chat_id,
                sender_id = %cmd.sender_id,
                "send-message rejected: sender not in roster"
            );
            return Err(ChatError::not_a_participant(cmd.chat_id, &cmd.sender_id));
        }

        if self.messages.exists(cmd.id).await? {
            debug!(message_id = %cmd.id, "message already persisted, replay ignored");
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        MessageRepository::insert(&mut tx, &cmd.to_chat_message()).await?;
        ChatRepository::advance_watermark(&mut tx, cmd.chat_id, cmd.sent_utc).await?;

        for recipient in roster.iter().filter(|id| **id != cmd.sender_id) {
            UnreadRepository::insert(&mut tx, cmd.chat_id, &cmd.sender_id, recipient, cmd.sent_utc)
                .await?;
        }

        tx.commit().await?;

        let message = crate::types::ChatMessageDto {
            id: cmd.id,
            chat_id: cmd.chat_id,
            sender_id: cmd.sender_id.clone(),
            text: cmd.text.clone(),
            attachment_url: cmd.attachment_url.clone(),
            sent_utc: cmd.sent_utc,
        };
        self.notifier.receive_chat_message(&roster, &message);

        Ok(())
    }

    async fn apply_set_chat_name(&self, cmd: SetChatName) -> ChatResult<()> {
        debug!(chat_id = %cmd.chat_id, "consuming set-chat-name command");

        let _guard = self.locks.lock(cmd.chat_id).await;

        if !self.chats.exists(cmd.chat_id).await? {
            warn!(chat_id = %cmd.chat_id, "set-chat-name rejected: chat not found");
            return Err(ChatError::ChatNotFound { id: cmd.chat_id });
        }

        let name = normalize_display_name(cmd.name.as_deref())?;

        let mut conn = self.pool.acquire().await?;
        let applied = ChatRepository::set_display_name(
            &mut conn,
            cmd.chat_id,
            name,
            cmd.timestamp_utc,
        )
        .await?;

        if applied {
            info!(chat_id = %cmd.chat_id, cleared = name.is_none(), "chat name updated");
        } else {
            debug!(chat_id = %cmd.chat_id, "stale set-chat-name ignored, newer override in place");
        }
        Ok(())
    }
}

/// Empty and whitespace-only names clear the override.
fn normalize_display_name(name: Option<&str>) -> ChatResult<Option<&str>> {
    let trimmed = name.map(str::trim).filter(|name| !name.is_empty());

    if let Some(name) = trimmed {
        if name.len() > MAX_DISPLAY_NAME_LENGTH {
            return Err(ChatError::validation(format!(
                "chat name too long (max {MAX_DISPLAY_NAME_LENGTH} characters)"
            )));
        }
    }

    Ok(trimmed)
}
