//! The checkpoint store contract and the in-memory backend.
//!
//! Every node execution ends with an `append`, so a crash mid-pass loses at
//! most one node's worth of work. Threads are created implicitly on first
//! write and are never deleted by this crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::state::ConversationState;

/// An immutable, timestamped snapshot of conversation state linked to its
/// immediate predecessor within a thread.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    /// Unique checkpoint identifier.
    pub id: String,
    /// The thread this checkpoint belongs to.
    pub thread_id: String,
    /// The previous checkpoint in the chain, `None` for a thread's root.
    pub parent_id: Option<String>,
    /// Per-thread monotonically increasing sequence number, 0 for the root.
    pub step: u64,
    /// The full conversation state at this point.
    pub state: ConversationState,
    /// When the checkpoint was persisted.
    pub created_at: DateTime<Utc>,
}

/// Checkpoint store failures.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    /// The storage backend failed.
    #[error("checkpoint backend error: {message}")]
    #[diagnostic(
        code(ragloom::checkpointer::backend),
        help("Check that the persistence location is reachable and writable.")
    )]
    Backend { message: String },

    /// A persisted state could not be encoded or decoded.
    #[error("checkpoint serialization error: {message}")]
    #[diagnostic(code(ragloom::checkpointer::serde))]
    Serde { message: String },
}

pub type Result<T> = std::result::Result<T, CheckpointerError>;

/// Durable, thread-id-keyed log of conversation states.
///
/// `append` must be atomic: a reader never observes a partially written
/// checkpoint. An `append` failure is fatal to the current pass; a `latest`
/// failure is handled by the session façade (warn and start fresh).
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Durably persists a full snapshot, linked to the previous latest
    /// checkpoint for the thread (or as a root). Returns the checkpoint id.
    async fn append(&self, thread_id: &str, state: &ConversationState) -> Result<String>;

    /// Returns the most recent checkpoint for the thread, if any.
    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// Returns all checkpoints for the thread, oldest to newest.
    ///
    /// Inspection/debugging surface, not on the hot path.
    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>>;

    /// Returns all known thread identifiers, most recently written first.
    async fn list_threads(&self) -> Result<Vec<String>>;
}

/// Volatile checkpoint store for tests and development.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    // Insertion order of keys doubles as thread recency via the Vec below.
    inner: Mutex<Store>,
}

#[derive(Debug, Default)]
struct Store {
    chains: FxHashMap<String, Vec<Checkpoint>>,
    recency: Vec<String>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Store>> {
        self.inner.lock().map_err(|_| CheckpointerError::Backend {
            message: "checkpoint store mutex poisoned".into(),
        })
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn append(&self, thread_id: &str, state: &ConversationState) -> Result<String> {
        let mut store = self.lock()?;
        let chain = store.chains.entry(thread_id.to_string()).or_default();
        let parent_id = chain.last().map(|cp| cp.id.clone());
        let step = chain.len() as u64;
        let checkpoint = Checkpoint {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            parent_id,
            step,
            state: state.clone(),
            created_at: Utc::now(),
        };
        let id = checkpoint.id.clone();
        chain.push(checkpoint);

        store.recency.retain(|t| t != thread_id);
        store.recency.push(thread_id.to_string());
        Ok(id)
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let store = self.lock()?;
        Ok(store
            .chains
            .get(thread_id)
            .and_then(|chain| chain.last().cloned()))
    }

    async fn history(&self, thread_id: &str) -> Result<Vec<Checkpoint>> {
        let store = self.lock()?;
        Ok(store.chains.get(thread_id).cloned().unwrap_or_default())
    }

    async fn list_threads(&self) -> Result<Vec<String>> {
        let store = self.lock()?;
        Ok(store.recency.iter().rev().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn state_with(messages: Vec<Message>) -> ConversationState {
        ConversationState {
            messages,
            ..ConversationState::default()
        }
    }

    #[tokio::test]
    async fn append_links_checkpoints_and_numbers_steps() {
        let store = InMemoryCheckpointer::new();
        let first = store
            .append("t1", &state_with(vec![Message::human("a")]))
            .await
            .unwrap();
        let _second = store
            .append("t1", &state_with(vec![Message::human("a"), Message::ai("b")]))
            .await
            .unwrap();

        let history = store.history("t1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].step, 0);
        assert_eq!(history[0].parent_id, None);
        assert_eq!(history[1].step, 1);
        assert_eq!(history[1].parent_id, Some(first));
    }

    #[tokio::test]
    async fn latest_returns_none_for_unknown_thread() {
        let store = InMemoryCheckpointer::new();
        assert!(store.latest("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn threads_are_isolated() {
        let store = InMemoryCheckpointer::new();
        store
            .append("a", &state_with(vec![Message::human("for a")]))
            .await
            .unwrap();
        store
            .append("b", &state_with(vec![Message::human("for b")]))
            .await
            .unwrap();

        let a = store.latest("a").await.unwrap().unwrap();
        assert_eq!(a.state.messages[0].content, "for a");
        assert_eq!(store.history("a").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_threads_is_most_recent_first() {
        let store = InMemoryCheckpointer::new();
        store.append("a", &ConversationState::new()).await.unwrap();
        store.append("b", &ConversationState::new()).await.unwrap();
        store.append("a", &ConversationState::new()).await.unwrap();
        assert_eq!(store.list_threads().await.unwrap(), vec!["a", "b"]);
    }
}
