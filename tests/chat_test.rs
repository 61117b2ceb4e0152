mod common;

use std::sync::Arc;

use common::FakeClient;
use tubemagic::chat::{APOLOGY, EMPTY_REPLY};
use tubemagic::{ChatController, ChatError, ChatRole};

#[tokio::test]
async fn test_reply_is_appended_after_user_turn() {
    let client = Arc::new(FakeClient::new());
    let mut chat = ChatController::new(client.clone());

    let reply = chat.send("help me improve this title").await.unwrap();

    assert_eq!(reply.unwrap().text, "Try a question in the title.");
    let transcript = chat.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, ChatRole::User);
    assert_eq!(transcript[0].text, "help me improve this title");
    assert_eq!(transcript[1].role, ChatRole::Model);
    assert!(client.chat_histories.lock()[0].is_empty());
}

#[tokio::test]
async fn test_failure_appends_apology() {
    let client = Arc::new(FakeClient::new());
    *client.chat_reply.lock() = None;
    let mut chat = ChatController::new(client);

    let err = chat.send("help me improve this title").await.unwrap_err();

    assert!(matches!(err, ChatError::Remote(_)));
    let transcript = chat.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[1].role, ChatRole::Model);
    assert_eq!(transcript[1].text, APOLOGY);
}

/// The conversation stays usable after a failed turn
#[tokio::test]
async fn test_history_is_sent_with_each_turn() {
    let client = Arc::new(FakeClient::new());
    *client.chat_reply.lock() = None;
    let mut chat = ChatController::new(client.clone());

    let _ = chat.send("first").await;
    *client.chat_reply.lock() = Some("second answer".into());
    chat.send("second").await.unwrap();

    let histories = client.chat_histories.lock();
    assert_eq!(histories.len(), 2);
    assert_eq!(histories[1].len(), 2);
    assert_eq!(histories[1][1].text, APOLOGY);
    assert_eq!(chat.transcript().len(), 4);
}

#[tokio::test]
async fn test_blank_message_is_ignored() {
    let client = Arc::new(FakeClient::new());
    let mut chat = ChatController::new(client.clone());

    assert!(chat.send("   ").await.unwrap().is_none());
    assert!(chat.transcript().is_empty());
    assert!(client.chat_histories.lock().is_empty());
}

#[tokio::test]
async fn test_empty_reply_uses_fallback_text() {
    let client = Arc::new(FakeClient::new());
    *client.chat_reply.lock() = Some(String::new());
    let mut chat = ChatController::new(client);

    let reply = chat.send("hello").await.unwrap().unwrap();

    assert_eq!(reply.text, EMPTY_REPLY);
}
