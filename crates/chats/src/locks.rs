//! Per-chat mutual exclusion.
//!
//! Commands touching the same chat must not interleave between the duplicate
//! check, the message insert, the watermark advance, and the unread fan-out.
//! Contention is scoped to one chat: different chats proceed in parallel and
//! there is no global lock.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct ChatLockMap {
    inner: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl ChatLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one chat, creating it on first use.
    pub async fn lock(&self, chat_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        lock.lock_owned().await
    }
}
