//! Command contracts accepted from producers.
//!
//! Every command carries a caller-assigned identity so that at-least-once
//! redelivery can be detected and replays applied as no-ops.

use chrono::{DateTime, Utc};
use jordnaer_database::{ChatMessage, UserProfile, MAX_MESSAGE_LENGTH};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue topic names, one per command kind.
pub mod topics {
    pub const START_CHAT: &str = "start-chat";
    pub const SEND_MESSAGE: &str = "send-message";
    pub const SET_CHAT_NAME: &str = "set-chat-name";
}

/// Wire shape of a single chat message, used both in commands and hub pushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageDto {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: String,
    pub text: String,
    pub attachment_url: Option<String>,
    pub sent_utc: DateTime<Utc>,
}

impl ChatMessageDto {
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            id: self.id,
            chat_id: self.chat_id,
            sender_id: self.sender_id.clone(),
            text: self.text.clone(),
            attachment_url: self.attachment_url.clone(),
            is_deleted: false,
            sent_utc: self.sent_utc,
        }
    }
}

impl From<ChatMessage> for ChatMessageDto {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            text: message.text,
            attachment_url: message.attachment_url,
            sent_utc: message.sent_utc,
        }
    }
}

/// Roster entry carried by commands and read models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSlim {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserSlim {
    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

impl From<UserProfile> for UserSlim {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            first_name: profile.first_name,
            last_name: profile.last_name,
        }
    }
}

/// Create a chat, its roster, and its seed messages in one unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartChat {
    pub id: Uuid,
    pub initiator_id: String,
    pub display_name: Option<String>,
    pub messages: Vec<ChatMessageDto>,
    pub recipients: Vec<UserSlim>,
    pub last_message_sent_utc: DateTime<Utc>,
    pub started_utc: DateTime<Utc>,
}

impl StartChat {
    /// Boundary validation, applied before the command is queued.
    pub fn validate(&self) -> Result<(), String> {
        if self.recipients.is_empty() {
            return Err("a chat needs at least one recipient".to_string());
        }

        if !self
            .recipients
            .iter()
            .any(|recipient| recipient.id == self.initiator_id)
        {
            return Err("the initiator must be among the recipients".to_string());
        }

        for (i, message) in self.messages.iter().enumerate() {
            if let Err(e) = message.to_chat_message().validate() {
                return Err(format!("invalid message at index {i}: {e}"));
            }
        }

        Ok(())
    }
}

/// Append one message to an existing chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: String,
    pub text: String,
    pub sent_utc: DateTime<Utc>,
    pub attachment_url: Option<String>,
}

impl SendMessage {
    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage {
            id: self.id,
            chat_id: self.chat_id,
            sender_id: self.sender_id.clone(),
            text: self.text.clone(),
            attachment_url: self.attachment_url.clone(),
            is_deleted: false,
            sent_utc: self.sent_utc,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("message text cannot be empty".to_string());
        }

        if self.text.len() > MAX_MESSAGE_LENGTH {
            return Err(format!(
                "message text too long (max {MAX_MESSAGE_LENGTH} characters)"
            ));
        }

        Ok(())
    }
}

/// Override the computed display name. An empty or absent name clears the
/// override. Redeliveries resolve by latest `timestamp_utc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetChatName {
    pub chat_id: Uuid,
    pub name: Option<String>,
    pub timestamp_utc: DateTime<Utc>,
}

/// The tagged union of everything the router accepts, dispatched through a
/// single typed handler match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChatCommand {
    StartChat(StartChat),
    SendMessage(SendMessage),
    SetChatName(SetChatName),
}

impl ChatCommand {
    /// The queue topic this command travels on.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::StartChat(_) => topics::START_CHAT,
            Self::SendMessage(_) => topics::SEND_MESSAGE,
            Self::SetChatName(_) => topics::SET_CHAT_NAME,
        }
    }

    /// The chat the command mutates; processing is serialized per chat.
    pub fn chat_id(&self) -> Uuid {
        match self {
            Self::StartChat(cmd) => cmd.id,
            Self::SendMessage(cmd) => cmd.chat_id,
            Self::SetChatName(cmd) => cmd.chat_id,
        }
    }
}
