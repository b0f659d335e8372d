use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::ChatClient;
use crate::config::DEFAULT_COLLABORATOR_TIMEOUT;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError};
use crate::state::{ConversationState, StateUpdate};

/// Answer recorded when the completion service fails or returns nothing
/// usable. Deliberately not appended to the conversation history, so a later
/// retry of the same question is not polluted by an apology.
pub const FALLBACK_ANSWER: &str =
    "I ran into a problem generating a response. Please try again.";

const GENERATE_INSTRUCTION: &str =
    "Answer the user's question using the provided context when it is \
     relevant. If the context does not contain the answer, say so and answer \
     from general knowledge.";

/// Produces the final answer from the conversation history plus whatever
/// context retrieval assembled.
pub struct GenerateNode {
    chat: Arc<dyn ChatClient>,
    timeout: Duration,
}

impl GenerateNode {
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

    fn build_prompt(snapshot: &ConversationState) -> Vec<Message> {
        let mut prompt = vec![Message::system(GENERATE_INSTRUCTION)];
        if !snapshot.documents.is_empty() {
            let context = snapshot
                .documents
                .iter()
                .map(|d| d.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            prompt.push(Message::system(format!("Context:\n{context}")));
        }
        prompt.extend(snapshot.messages.iter().cloned());
        prompt
    }
}

#[async_trait]
impl Node for GenerateNode {
    async fn run(
        &self,
        snapshot: ConversationState,
        ctx: NodeContext,
    ) -> Result<StateUpdate, NodeError> {
        if snapshot.messages.is_empty() {
            return Err(NodeError::MissingInput { what: "messages" });
        }

        let prompt = Self::build_prompt(&snapshot);

        let answer = match tokio::time::timeout(self.timeout, self.chat.complete(&prompt)).await {
            Ok(Ok(response)) => response.into_text().filter(|t| !t.trim().is_empty()),
            Ok(Err(err)) => {
                warn!(
                    thread_id = %ctx.thread_id,
                    error = %err,
                    "generation call failed, recording fallback answer"
                );
                None
            }
            Err(_) => {
                warn!(
                    thread_id = %ctx.thread_id,
                    timeout = ?self.timeout,
                    "generation call timed out, recording fallback answer"
                );
                None
            }
        };

        match answer {
            Some(answer) => {
                let answer = answer.trim().to_string();
                debug!(thread_id = %ctx.thread_id, chars = answer.len(), "generated answer");
                Ok(StateUpdate::new()
                    .with_messages(vec![Message::ai(&answer)])
                    .with_answer(answer))
            }
            None => Ok(StateUpdate::new().with_answer(FALLBACK_ANSWER)),
        }
    }
}
