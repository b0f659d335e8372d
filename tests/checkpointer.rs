//! SQLite checkpoint store tests against a temporary database file.

use ragloom::document::DocumentChunk;
use ragloom::message::Message;
use ragloom::runtimes::{Checkpointer, SqliteCheckpointer};
use ragloom::state::ConversationState;
use tempfile::TempDir;

async fn store() -> (TempDir, SqliteCheckpointer) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}/checkpoints.db", dir.path().display());
    let store = SqliteCheckpointer::connect(&url).await.unwrap();
    (dir, store)
}

fn sample_state() -> ConversationState {
    ConversationState {
        messages: vec![
            Message::human("what is a checkpoint?"),
            Message::ai("a durable snapshot"),
        ],
        question: "what is a checkpoint?".into(),
        documents: vec![DocumentChunk::new("checkpoint docs", 0.7)
            .with_metadata("source", serde_json::json!("handbook.md"))],
        answer: "a durable snapshot".into(),
        retries: 1,
        needs_retry: false,
    }
}

#[tokio::test]
async fn connect_creates_a_fresh_database() {
    let (_dir, store) = store().await;
    assert!(store.latest("t1").await.unwrap().is_none());
    assert!(store.history("t1").await.unwrap().is_empty());
    assert!(store.list_threads().await.unwrap().is_empty());
}

#[tokio::test]
async fn append_then_latest_round_trips_the_state() {
    let (_dir, store) = store().await;
    let state = sample_state();

    let id = store.append("t1", &state).await.unwrap();
    let latest = store.latest("t1").await.unwrap().unwrap();

    assert_eq!(latest.id, id);
    assert_eq!(latest.thread_id, "t1");
    assert_eq!(latest.step, 0);
    assert_eq!(latest.parent_id, None);
    assert_eq!(latest.state, state);
}

#[tokio::test]
async fn history_is_ordered_and_linked() {
    let (_dir, store) = store().await;

    let mut state = ConversationState::new();
    state.messages.push(Message::human("one"));
    let first = store.append("t1", &state).await.unwrap();

    state.messages.push(Message::ai("two"));
    let second = store.append("t1", &state).await.unwrap();

    state.messages.push(Message::human("three"));
    store.append("t1", &state).await.unwrap();

    let history = store.history("t1").await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].step, 0);
    assert_eq!(history[0].parent_id, None);
    assert_eq!(history[1].parent_id, Some(first));
    assert_eq!(history[2].parent_id, Some(second));
    assert_eq!(history[2].state.messages.len(), 3);
}

#[tokio::test]
async fn threads_are_isolated() {
    let (_dir, store) = store().await;

    let mut a = ConversationState::new();
    a.question = "thread a".into();
    store.append("a", &a).await.unwrap();

    let mut b = ConversationState::new();
    b.question = "thread b".into();
    store.append("b", &b).await.unwrap();
    store.append("b", &b).await.unwrap();

    assert_eq!(store.history("a").await.unwrap().len(), 1);
    assert_eq!(store.history("b").await.unwrap().len(), 2);
    assert_eq!(
        store.latest("a").await.unwrap().unwrap().state.question,
        "thread a"
    );
}

#[tokio::test]
async fn list_threads_orders_by_recent_activity() {
    let (_dir, store) = store().await;
    let state = ConversationState::new();

    store.append("older", &state).await.unwrap();
    // Recency ordering compares timestamps, so the writes need distinct instants.
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    store.append("newer", &state).await.unwrap();

    let threads = store.list_threads().await.unwrap();
    assert_eq!(threads, vec!["newer".to_string(), "older".to_string()]);
}

#[tokio::test]
async fn reopening_the_database_preserves_history() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}/checkpoints.db", dir.path().display());

    {
        let store = SqliteCheckpointer::connect(&url).await.unwrap();
        store.append("t1", &sample_state()).await.unwrap();
    }

    let reopened = SqliteCheckpointer::connect(&url).await.unwrap();
    let latest = reopened.latest("t1").await.unwrap().unwrap();
    assert_eq!(latest.state, sample_state());
}
