//! End-to-end tests for the messaging core: bus -> router -> store -> hub seam.

use chrono::{Duration, Utc};
use jordnaer_chats::{
    ChatCommand, ChatMessageDto, ChatNotifier, ChatService, CommandBus, CommandRouter,
    NullNotifier, SendMessage, SetChatName, StartChat, UnreadService, UserSlim,
};
use jordnaer_config::MessagingConfig;
use jordnaer_database::{ChatRepository, MessageRepository};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

async fn create_test_pool() -> (SqlitePool, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("chats.db");

    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .unwrap();

    jordnaer_database::migrations::MIGRATOR
        .run(&pool)
        .await
        .unwrap();

    (pool, temp_dir)
}

/// Captures hub pushes so tests can assert the delivery contract.
#[derive(Default)]
struct RecordingNotifier {
    message_pushes: Mutex<Vec<(Vec<String>, ChatMessageDto)>>,
    chat_pushes: Mutex<Vec<(Vec<String>, StartChat)>>,
}

impl ChatNotifier for RecordingNotifier {
    fn receive_chat_message(&self, recipient_ids: &[String], message: &ChatMessageDto) {
        self.message_pushes
            .lock()
            .unwrap()
            .push((recipient_ids.to_vec(), message.clone()));
    }

    fn start_chat(&self, recipient_ids: &[String], chat: &StartChat) {
        self.chat_pushes
            .lock()
            .unwrap()
            .push((recipient_ids.to_vec(), chat.clone()));
    }
}

fn slim(id: &str) -> UserSlim {
    UserSlim {
        id: id.to_string(),
        first_name: uppercase_first(id),
        last_name: "Testsen".to_string(),
    }
}

fn uppercase_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn start_chat_command(initiator: &str, recipients: &[&str]) -> StartChat {
    let id = Uuid::new_v4();
    let now = Utc::now();
    StartChat {
        id,
        initiator_id: initiator.to_string(),
        display_name: None,
        messages: vec![ChatMessageDto {
            id: Uuid::new_v4(),
            chat_id: id,
            sender_id: initiator.to_string(),
            text: "hej med jer".to_string(),
            attachment_url: None,
            sent_utc: now,
        }],
        recipients: recipients.iter().map(|id| slim(id)).collect(),
        last_message_sent_utc: now,
        started_utc: now,
    }
}

fn send_message_command(chat_id: Uuid, sender: &str, text: &str) -> SendMessage {
    SendMessage {
        id: Uuid::new_v4(),
        chat_id,
        sender_id: sender.to_string(),
        text: text.to_string(),
        sent_utc: Utc::now(),
        attachment_url: None,
    }
}

#[tokio::test]
async fn start_chat_persists_everything_and_pushes_after_commit() {
    let (pool, _temp_dir) = create_test_pool().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let router = CommandRouter::new(pool.clone(), notifier.clone());

    let command = start_chat_command("anna", &["anna", "bo", "clara"]);
    router
        .dispatch(ChatCommand::StartChat(command.clone()))
        .await
        .unwrap();

    let chats = ChatRepository::new(pool.clone());
    let chat = chats.find_by_id(command.id).await.unwrap().unwrap();
    assert_eq!(chat.started_utc, command.started_utc);
    assert_eq!(chat.last_message_sent_utc, command.last_message_sent_utc);

    let roster = chats.roster_ids(command.id).await.unwrap();
    assert_eq!(roster, vec!["anna", "bo", "clara"]);

    let unread = UnreadService::new(pool.clone());
    // One seed message, unread for everyone but the initiator.
    assert_eq!(unread.get_unread_count(command.id, "bo").await.unwrap(), 1);
    assert_eq!(unread.get_unread_count(command.id, "clara").await.unwrap(), 1);
    assert_eq!(unread.get_unread_count(command.id, "anna").await.unwrap(), 0);

    let pushes = notifier.chat_pushes.lock().unwrap();
    assert_eq!(pushes.len(), 1);
    let (recipient_ids, pushed) = &pushes[0];
    assert_eq!(recipient_ids, &["anna", "bo", "clara"]);
    assert_eq!(pushed.id, command.id);
}

#[tokio::test]
async fn send_message_updates_unread_watermark_and_pushes() {
    let (pool, _temp_dir) = create_test_pool().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let router = CommandRouter::new(pool.clone(), notifier.clone());

    let chat = start_chat_command("anna", &["anna", "bo"]);
    router
        .dispatch(ChatCommand::StartChat(chat.clone()))
        .await
        .unwrap();

    for text in ["en", "to", "tre"] {
        router
            .dispatch(ChatCommand::SendMessage(send_message_command(
                chat.id, "bo", text,
            )))
            .await
            .unwrap();
    }

    let unread = UnreadService::new(pool.clone());
    assert_eq!(unread.get_unread_count(chat.id, "anna").await.unwrap(), 3);
    assert_eq!(unread.get_unread_count(chat.id, "bo").await.unwrap(), 1);
    assert_eq!(unread.total_unread_count("anna").await.unwrap(), 3);

    // The watermark covers every message in the chat.
    let chats = ChatRepository::new(pool.clone());
    let stored = chats.find_by_id(chat.id).await.unwrap().unwrap();
    let messages = MessageRepository::new(pool.clone())
        .list_all_for_chat(chat.id)
        .await
        .unwrap();
    assert_eq!(messages.len(), 4);
    assert!(messages
        .iter()
        .all(|message| stored.last_message_sent_utc >= message.sent_utc));

    // One push per send, addressed to the whole roster.
    let pushes = notifier.message_pushes.lock().unwrap();
    assert_eq!(pushes.len(), 3);
    assert!(pushes
        .iter()
        .all(|(recipients, _)| recipients == &["anna", "bo"]));
}

#[tokio::test]
async fn replayed_send_message_is_applied_exactly_once() {
    let (pool, _temp_dir) = create_test_pool().await;
    let router = CommandRouter::new(pool.clone(), Arc::new(NullNotifier));

    let chat = start_chat_command("anna", &["anna", "bo"]);
    router
        .dispatch(ChatCommand::StartChat(chat.clone()))
        .await
        .unwrap();

    let message = send_message_command(chat.id, "anna", "kun en gang");
    router
        .dispatch(ChatCommand::SendMessage(message.clone()))
        .await
        .unwrap();
    router
        .dispatch(ChatCommand::SendMessage(message.clone()))
        .await
        .unwrap();

    let messages = MessageRepository::new(pool.clone())
        .list_all_for_chat(chat.id)
        .await
        .unwrap();
    let persisted: Vec<_> = messages
        .iter()
        .filter(|stored| stored.id == message.id)
        .collect();
    assert_eq!(persisted.len(), 1);

    // The seed message plus one replayed send: bo has exactly two unread rows.
    let unread = UnreadService::new(pool);
    assert_eq!(unread.get_unread_count(chat.id, "bo").await.unwrap(), 2);
}

#[tokio::test]
async fn mark_read_clears_acknowledged_rows_only() {
    let (pool, _temp_dir) = create_test_pool().await;
    let router = CommandRouter::new(pool.clone(), Arc::new(NullNotifier));

    let chat = start_chat_command("anna", &["anna", "bo"]);
    router
        .dispatch(ChatCommand::StartChat(chat.clone()))
        .await
        .unwrap();

    router
        .dispatch(ChatCommand::SendMessage(send_message_command(
            chat.id, "anna", "læs mig",
        )))
        .await
        .unwrap();

    let unread = UnreadService::new(pool.clone());
    assert_eq!(unread.get_unread_count(chat.id, "bo").await.unwrap(), 2);

    let acknowledged = unread.mark_read(chat.id, "bo", Utc::now()).await.unwrap();
    assert_eq!(acknowledged, 2);
    assert_eq!(unread.get_unread_count(chat.id, "bo").await.unwrap(), 0);

    // A message racing the acknowledgement with a later timestamp stays unread.
    let mut late = send_message_command(chat.id, "anna", "for sent");
    late.sent_utc = Utc::now() + Duration::minutes(1);
    router
        .dispatch(ChatCommand::SendMessage(late))
        .await
        .unwrap();
    let still_unread = unread
        .mark_read(chat.id, "bo", Utc::now() - Duration::seconds(30))
        .await;
    assert_eq!(still_unread.unwrap(), 0);
    assert_eq!(unread.get_unread_count(chat.id, "bo").await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_sends_on_one_chat_keep_the_watermark_monotonic() {
    let (pool, _temp_dir) = create_test_pool().await;
    let router = Arc::new(CommandRouter::new(pool.clone(), Arc::new(NullNotifier)));

    let chat = start_chat_command("anna", &["anna", "bo"]);
    router
        .dispatch(ChatCommand::StartChat(chat.clone()))
        .await
        .unwrap();

    let base = Utc::now();
    let mut earlier = send_message_command(chat.id, "anna", "tidlig");
    earlier.sent_utc = base + Duration::seconds(1);
    let mut later = send_message_command(chat.id, "bo", "sen");
    later.sent_utc = base + Duration::seconds(2);

    let mut handles = Vec::new();
    for command in [later.clone(), earlier.clone()] {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            router
                .dispatch(ChatCommand::SendMessage(command))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stored = ChatRepository::new(pool.clone())
        .find_by_id(chat.id)
        .await
        .unwrap()
        .unwrap();
    // Whatever the arrival order, the watermark ends at the later send.
    assert_eq!(stored.last_message_sent_utc, later.sent_utc);

    let unread = UnreadService::new(pool);
    assert_eq!(unread.get_unread_count(chat.id, "anna").await.unwrap(), 1);
    assert_eq!(unread.get_unread_count(chat.id, "bo").await.unwrap(), 2);
}

#[tokio::test]
async fn set_chat_name_overrides_and_empty_clears() {
    let (pool, _temp_dir) = create_test_pool().await;
    let router = CommandRouter::new(pool.clone(), Arc::new(NullNotifier));

    let chat = start_chat_command("anna", &["anna", "bo"]);
    router
        .dispatch(ChatCommand::StartChat(chat.clone()))
        .await
        .unwrap();

    router
        .dispatch(ChatCommand::SetChatName(SetChatName {
            chat_id: chat.id,
            name: Some("Legegruppen".to_string()),
            timestamp_utc: Utc::now(),
        }))
        .await
        .unwrap();

    let service = ChatService::new(pool.clone());
    let chats = service.get_chats("bo", 0, 10).await.unwrap();
    assert_eq!(chats[0].display_name.as_deref(), Some("Legegruppen"));
    assert_eq!(chats[0].display_name_for("bo"), "Legegruppen");

    // Clearing the override reverts to the computed name, not an empty label.
    router
        .dispatch(ChatCommand::SetChatName(SetChatName {
            chat_id: chat.id,
            name: Some(String::new()),
            timestamp_utc: Utc::now() + Duration::seconds(1),
        }))
        .await
        .unwrap();

    let chats = service.get_chats("bo", 0, 10).await.unwrap();
    assert_eq!(chats[0].display_name, None);
    assert_eq!(chats[0].display_name_for("bo"), "Anna Testsen");
}

#[tokio::test]
async fn chat_list_is_sorted_by_latest_activity() {
    let (pool, _temp_dir) = create_test_pool().await;
    let router = CommandRouter::new(pool.clone(), Arc::new(NullNotifier));

    let first = start_chat_command("anna", &["anna", "bo"]);
    router
        .dispatch(ChatCommand::StartChat(first.clone()))
        .await
        .unwrap();

    let mut second = start_chat_command("anna", &["anna", "clara"]);
    second.started_utc = Utc::now() + Duration::seconds(1);
    second.last_message_sent_utc = second.started_utc;
    second.messages[0].sent_utc = second.started_utc;
    router
        .dispatch(ChatCommand::StartChat(second.clone()))
        .await
        .unwrap();

    let service = ChatService::new(pool.clone());
    let chats = service.get_chats("anna", 0, 10).await.unwrap();
    assert_eq!(chats[0].id, second.id);
    assert_eq!(chats[1].id, first.id);

    // New activity in the first chat moves it back to the top.
    let mut bump = send_message_command(first.id, "bo", "hallo igen");
    bump.sent_utc = Utc::now() + Duration::minutes(1);
    router
        .dispatch(ChatCommand::SendMessage(bump))
        .await
        .unwrap();

    let chats = service.get_chats("anna", 0, 10).await.unwrap();
    assert_eq!(chats[0].id, first.id);
    assert_eq!(chats[0].unread_message_count, 1);
}

#[tokio::test]
async fn message_page_requires_participation() {
    let (pool, _temp_dir) = create_test_pool().await;
    let router = CommandRouter::new(pool.clone(), Arc::new(NullNotifier));

    let chat = start_chat_command("anna", &["anna", "bo"]);
    router
        .dispatch(ChatCommand::StartChat(chat.clone()))
        .await
        .unwrap();

    let service = ChatService::new(pool.clone());
    let page = service
        .get_chat_messages(chat.id, "anna", 0, 10)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].text, "hej med jer");

    let denied = service.get_chat_messages(chat.id, "mallory", 0, 10).await;
    assert!(denied.is_err());
}

#[tokio::test]
async fn find_chat_by_recipients_matches_exact_roster() {
    let (pool, _temp_dir) = create_test_pool().await;
    let router = CommandRouter::new(pool.clone(), Arc::new(NullNotifier));

    let pair = start_chat_command("anna", &["anna", "bo"]);
    router
        .dispatch(ChatCommand::StartChat(pair.clone()))
        .await
        .unwrap();
    let trio = start_chat_command("anna", &["anna", "bo", "clara"]);
    router
        .dispatch(ChatCommand::StartChat(trio.clone()))
        .await
        .unwrap();

    let service = ChatService::new(pool);
    let found = service
        .find_chat_by_recipients(&["bo".to_string(), "anna".to_string()])
        .await
        .unwrap();
    assert_eq!(found, Some(pair.id));
}

#[tokio::test]
async fn bus_delivers_published_commands_to_the_store() {
    let (pool, _temp_dir) = create_test_pool().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let router = Arc::new(CommandRouter::new(pool.clone(), notifier.clone()));

    let config = MessagingConfig::default();
    let (bus, workers) = CommandBus::start(&config, router);

    let chat = start_chat_command("anna", &["anna", "bo"]);
    bus.publish(ChatCommand::StartChat(chat.clone()))
        .await
        .unwrap();

    // The topics are independent queues: wait for the chat to exist before
    // producing into it, as the API boundary does.
    let chats = ChatRepository::new(pool.clone());
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !chats.exists(chat.id).await.unwrap() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("start-chat command should be consumed");

    bus.publish(ChatCommand::SendMessage(send_message_command(
        chat.id, "anna", "over køen",
    )))
    .await
    .unwrap();

    // Dropping the producer lets the workers drain and stop.
    drop(bus);
    for worker in workers {
        worker.await.unwrap();
    }

    let unread = UnreadService::new(pool.clone());
    assert_eq!(unread.get_unread_count(chat.id, "bo").await.unwrap(), 2);

    assert_eq!(notifier.chat_pushes.lock().unwrap().len(), 1);
    assert_eq!(notifier.message_pushes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn start_chat_watermark_covers_stale_producer_values() {
    let (pool, _temp_dir) = create_test_pool().await;
    let router = CommandRouter::new(pool.clone(), Arc::new(NullNotifier));

    let mut chat = start_chat_command("anna", &["anna", "bo"]);
    // Producer claims an older watermark than its own seed message.
    chat.last_message_sent_utc = chat.messages[0].sent_utc - Duration::minutes(5);
    router
        .dispatch(ChatCommand::StartChat(chat.clone()))
        .await
        .unwrap();

    let stored = ChatRepository::new(pool)
        .find_by_id(chat.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.last_message_sent_utc, chat.messages[0].sent_utc);
}
