//! Conversation state threaded through every step of a workflow pass.
//!
//! [`ConversationState`] is both the unit of work (nodes receive a snapshot of
//! it) and the unit of persistence (the checkpoint store serializes it after
//! every node). It is a plain data record: merge semantics live in
//! [`crate::reducer::merge`], and the persisted wire shape lives in
//! [`crate::runtimes::persistence`], so the data shape, the merge policy, and
//! the storage schema can each change independently.

use crate::document::DocumentChunk;
use crate::message::Message;

/// The full per-conversation state for one workflow pass.
///
/// Field semantics under merge:
/// - `messages` is append-only and grows monotonically across passes;
/// - every other field is replace-on-write within a pass;
/// - `documents` and `answer` describe only the most recent pass;
/// - `retries` is reset to 0 when a new pass is seeded and incremented only by
///   the rewrite node. The retry cap is enforced by engine routing, not here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversationState {
    /// Ordered conversation history, one human and one AI record per
    /// successful pass.
    pub messages: Vec<Message>,
    /// The question currently being processed; may be rewritten mid-pass.
    pub question: String,
    /// Chunks returned by the latest retrieval, ranked best-first.
    pub documents: Vec<DocumentChunk>,
    /// The most recently generated answer.
    pub answer: String,
    /// Number of rewrite attempts performed in the current pass.
    pub retries: u32,
    /// Set by evaluation, consumed by routing; meaningless across passes.
    pub needs_retry: bool,
}

impl ConversationState {
    /// An empty state, used when a thread has no checkpoints yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// The subset of state fields a node changed.
///
/// Nodes never mutate their input snapshot; they return a `StateUpdate`
/// carrying only the fields they produced, and the reducer folds it into the
/// full state. Absent fields are carried over unchanged.
///
/// # Examples
///
/// ```
/// use ragloom::message::Message;
/// use ragloom::state::StateUpdate;
///
/// let update = StateUpdate::new()
///     .with_answer("It depends.")
///     .with_messages(vec![Message::ai("It depends.")]);
///
/// assert!(update.question.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct StateUpdate {
    /// Messages to append to the conversation history.
    pub messages: Option<Vec<Message>>,
    /// Replacement for the current question.
    pub question: Option<String>,
    /// Replacement for the retrieved document set.
    pub documents: Option<Vec<DocumentChunk>>,
    /// Replacement for the generated answer.
    pub answer: Option<String>,
    /// Replacement for the rewrite counter.
    pub retries: Option<u32>,
    /// Replacement for the evaluation verdict.
    pub needs_retry: Option<bool>,
}

impl StateUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    #[must_use]
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    #[must_use]
    pub fn with_documents(mut self, documents: Vec<DocumentChunk>) -> Self {
        self.documents = Some(documents);
        self
    }

    #[must_use]
    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = Some(answer.into());
        self
    }

    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    #[must_use]
    pub fn with_needs_retry(mut self, needs_retry: bool) -> Self {
        self.needs_retry = Some(needs_retry);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_empty() {
        let state = ConversationState::new();
        assert!(state.messages.is_empty());
        assert!(state.question.is_empty());
        assert!(state.documents.is_empty());
        assert!(state.answer.is_empty());
        assert_eq!(state.retries, 0);
        assert!(!state.needs_retry);
    }

    #[test]
    fn update_builder_sets_only_named_fields() {
        let update = StateUpdate::new().with_question("rewritten").with_retries(1);
        assert_eq!(update.question.as_deref(), Some("rewritten"));
        assert_eq!(update.retries, Some(1));
        assert!(update.messages.is_none());
        assert!(update.documents.is_none());
        assert!(update.answer.is_none());
        assert!(update.needs_retry.is_none());
    }
}
