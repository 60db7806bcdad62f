//! Read models returned to clients.

use crate::types::commands::UserSlim;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chat as shown in the chat list: roster, watermark, and the viewer's
/// unread count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatDto {
    pub id: Uuid,
    /// Explicit name override, if any. Clients fall back to
    /// [`ChatDto::display_name_for`].
    pub display_name: Option<String>,
    pub recipients: Vec<UserSlim>,
    pub last_message_sent_utc: DateTime<Utc>,
    pub started_utc: DateTime<Utc>,
    pub unread_message_count: i64,
}

impl ChatDto {
    /// The label shown for this chat to the given viewer.
    pub fn display_name_for(&self, viewer_id: &str) -> String {
        resolve_display_name(self.display_name.as_deref(), &self.recipients, viewer_id)
    }
}

/// Derive the human-readable chat label from the roster.
///
/// The branch order and the full-roster join in the middle branch are
/// long-standing client behaviour and must not change: existing clients
/// render exactly these strings.
pub fn resolve_display_name(
    explicit: Option<&str>,
    roster: &[UserSlim],
    viewer_id: &str,
) -> String {
    if let Some(name) = explicit {
        return name.to_string();
    }

    let others: Vec<&UserSlim> = roster
        .iter()
        .filter(|recipient| recipient.id != viewer_id)
        .collect();

    if others.len() > 3 {
        let named = others
            .iter()
            .take(3)
            .map(|recipient| recipient.first_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return format!("{named} og {} andre", roster.len().saturating_sub(3));
    }

    if others.len() > 1 {
        // Joins the whole roster here, viewer included.
        return roster
            .iter()
            .map(|recipient| recipient.first_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
    }

    match others.as_slice() {
        [other] => format!("{} {}", other.first_name, other.last_name),
        _ => String::new(),
    }
}
