//! The state merge function applied after every node execution.
//!
//! Merge policy is deliberately a standalone pure function rather than an
//! annotation baked into the state type: it is visible, testable, and
//! swappable without touching the data shape.

use crate::state::{ConversationState, StateUpdate};

/// Folds a node's partial update into the full conversation state.
///
/// - `messages` are appended: existing records are never replaced or
///   reordered, which keeps conversation history monotonically growing across
///   passes for a given thread.
/// - Every other field present in the update replaces the old value (last
///   writer wins within a pass).
/// - Fields absent from the update carry over unchanged.
///
/// The engine calls this exactly once per node execution, immediately before
/// checkpointing the merged result.
#[must_use]
pub fn merge(mut state: ConversationState, update: StateUpdate) -> ConversationState {
    if let Some(new_messages) = update.messages {
        state.messages.extend(new_messages);
    }
    if let Some(question) = update.question {
        state.question = question;
    }
    if let Some(documents) = update.documents {
        state.documents = documents;
    }
    if let Some(answer) = update.answer {
        state.answer = answer;
    }
    if let Some(retries) = update.retries {
        state.retries = retries;
    }
    if let Some(needs_retry) = update.needs_retry {
        state.needs_retry = needs_retry;
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentChunk;
    use crate::message::Message;

    fn state_with_history() -> ConversationState {
        ConversationState {
            messages: vec![Message::human("hi"), Message::ai("hello")],
            question: "hi".into(),
            documents: vec![DocumentChunk::new("old chunk", 0.3)],
            answer: "hello".into(),
            retries: 1,
            needs_retry: true,
        }
    }

    #[test]
    fn messages_append_never_replace() {
        let old = state_with_history();
        let update = StateUpdate::new().with_messages(vec![Message::human("who am i")]);

        let merged = merge(old.clone(), update);
        assert_eq!(merged.messages.len(), 3);
        assert_eq!(&merged.messages[..2], &old.messages[..]);
        assert_eq!(merged.messages[2], Message::human("who am i"));
    }

    #[test]
    fn scalar_fields_are_replaced_wholesale() {
        let old = state_with_history();
        let update = StateUpdate::new()
            .with_question("better question")
            .with_documents(vec![DocumentChunk::new("new chunk", 0.9)])
            .with_answer("new answer")
            .with_retries(0)
            .with_needs_retry(false);

        let merged = merge(old, update);
        assert_eq!(merged.question, "better question");
        assert_eq!(merged.documents.len(), 1);
        assert_eq!(merged.documents[0].content, "new chunk");
        assert_eq!(merged.answer, "new answer");
        assert_eq!(merged.retries, 0);
        assert!(!merged.needs_retry);
    }

    #[test]
    fn absent_fields_carry_over() {
        let old = state_with_history();
        let merged = merge(old.clone(), StateUpdate::new());
        assert_eq!(merged, old);
    }

    #[test]
    fn empty_message_update_appends_nothing() {
        let old = state_with_history();
        let merged = merge(old.clone(), StateUpdate::new().with_messages(vec![]));
        assert_eq!(merged.messages, old.messages);
    }
}
