use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::ChatClient;
use crate::config::DEFAULT_COLLABORATOR_TIMEOUT;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError};
use crate::state::{ConversationState, StateUpdate};

const REWRITE_INSTRUCTION: &str =
    "Rewrite the user's search query to improve document retrieval. \
     Reply with the rewritten query only.";

/// Reformulates the question after an unsatisfying retrieval.
///
/// The retry counter is incremented on every execution, including when the
/// completion call fails or returns something unusable. The counter is what
/// bounds the retrieval loop, so a broken collaborator must still advance it.
pub struct RewriteNode {
    chat: Arc<dyn ChatClient>,
    timeout: Duration,
}

impl RewriteNode {
    #[must_use]
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self {
            chat,
            timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Node for RewriteNode {
    async fn run(
        &self,
        snapshot: ConversationState,
        ctx: NodeContext,
    ) -> Result<StateUpdate, NodeError> {
        if snapshot.question.is_empty() {
            return Err(NodeError::MissingInput { what: "question" });
        }

        let prompt = vec![
            Message::system(REWRITE_INSTRUCTION),
            Message::human(&snapshot.question),
        ];

        let rewritten = match tokio::time::timeout(self.timeout, self.chat.complete(&prompt)).await
        {
            Ok(Ok(response)) => match response.into_text() {
                Some(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
                _ => {
                    warn!(
                        thread_id = %ctx.thread_id,
                        "rewrite produced no usable text, keeping original question"
                    );
                    None
                }
            },
            Ok(Err(err)) => {
                warn!(
                    thread_id = %ctx.thread_id,
                    error = %err,
                    "rewrite call failed, keeping original question"
                );
                None
            }
            Err(_) => {
                warn!(
                    thread_id = %ctx.thread_id,
                    timeout = ?self.timeout,
                    "rewrite call timed out, keeping original question"
                );
                None
            }
        };

        let question = rewritten.unwrap_or_else(|| snapshot.question.clone());
        debug!(thread_id = %ctx.thread_id, retries = snapshot.retries + 1, %question, "rewrote query");

        Ok(StateUpdate::new()
            .with_question(question)
            .with_retries(snapshot.retries + 1))
    }
}
