//! In-process command queues: one named topic per command kind.
//!
//! Delivery is at-least-once: a command that fails with a transient store
//! error is redelivered up to the configured limit, relying on the router's
//! replay detection to keep retries safe. Rejected commands are logged and
//! dropped, never retried.

use crate::notifier::ChatNotifier;
use crate::router::CommandRouter;
use crate::types::{topics, ChatCommand, ChatError, ChatResult};
use jordnaer_config::MessagingConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Producer handle for the command queues. Cloneable and cheap to share.
#[derive(Clone)]
pub struct CommandBus {
    start_chat: mpsc::Sender<ChatCommand>,
    send_message: mpsc::Sender<ChatCommand>,
    set_chat_name: mpsc::Sender<ChatCommand>,
}

impl CommandBus {
    /// Create the queues and spawn one consumer worker per topic.
    ///
    /// Workers run until every producer handle has been dropped, then drain
    /// and exit.
    pub fn start<N: ChatNotifier + 'static>(
        config: &MessagingConfig,
        router: Arc<CommandRouter<N>>,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let (start_chat_tx, start_chat_rx) = mpsc::channel(config.queue_capacity);
        let (send_message_tx, send_message_rx) = mpsc::channel(config.queue_capacity);
        let (set_chat_name_tx, set_chat_name_rx) = mpsc::channel(config.queue_capacity);

        let workers = vec![
            spawn_topic_worker(
                topics::START_CHAT,
                start_chat_rx,
                router.clone(),
                config.redelivery_limit,
            ),
            spawn_topic_worker(
                topics::SEND_MESSAGE,
                send_message_rx,
                router.clone(),
                config.redelivery_limit,
            ),
            spawn_topic_worker(
                topics::SET_CHAT_NAME,
                set_chat_name_rx,
                router,
                config.redelivery_limit,
            ),
        ];

        let bus = Self {
            start_chat: start_chat_tx,
            send_message: send_message_tx,
            set_chat_name: set_chat_name_tx,
        };

        (bus, workers)
    }

    /// Enqueue a command on its topic.
    pub async fn publish(&self, command: ChatCommand) -> ChatResult<()> {
        let topic = command.topic();
        let sender = match topic {
            topics::START_CHAT => &self.start_chat,
            topics::SEND_MESSAGE => &self.send_message,
            _ => &self.set_chat_name,
        };

        debug!(topic, chat_id = %command.chat_id(), "publishing command");

        sender
            .send(command)
            .await
            .map_err(|_| ChatError::QueueClosed { topic })
    }
}

fn spawn_topic_worker<N: ChatNotifier + 'static>(
    topic: &'static str,
    mut queue: mpsc::Receiver<ChatCommand>,
    router: Arc<CommandRouter<N>>,
    redelivery_limit: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(topic, "command queue worker started");

        while let Some(command) = queue.recv().await {
            consume_with_redelivery(topic, command, &router, redelivery_limit).await;
        }

        debug!(topic, "command queue worker stopped");
    })
}

async fn consume_with_redelivery<N: ChatNotifier>(
    topic: &'static str,
    command: ChatCommand,
    router: &CommandRouter<N>,
    redelivery_limit: u32,
) {
    let chat_id = command.chat_id();
    let mut attempt: u32 = 0;

    loop {
        match router.dispatch(command.clone()).await {
            Ok(()) => return,
            Err(error) if error.is_transient() && attempt < redelivery_limit => {
                attempt += 1;
                warn!(
                    topic,
                    %chat_id,
                    attempt,
                    %error,
                    "transient failure, redelivering command"
                );
                tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
            }
            Err(error) if error.is_transient() => {
                error!(
                    topic,
                    %chat_id,
                    attempts = attempt + 1,
                    %error,
                    "redelivery limit reached, dropping command"
                );
                return;
            }
            Err(error) => {
                warn!(topic, %chat_id, %error, "command rejected");
                return;
            }
        }
    }
}
