//! The conversational façade over the workflow engine.
//!
//! A [`Session`] turns "question in, answer out" into a full workflow pass:
//! it restores the thread's latest checkpoint, seeds the pass, runs the
//! engine, and returns the generated answer. Conversation history accumulates
//! across calls with the same thread id.

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tracing::{info, warn};

use crate::engine::{EngineError, WorkflowEngine};
use crate::message::Message;
use crate::reducer::merge;
use crate::state::{ConversationState, StateUpdate};

/// Errors surfaced by [`Session::ask`].
#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

/// One conversational entry point per engine.
///
/// `ask` calls for the same thread must be serialized by the caller; the
/// checkpoint store rejects concurrent writers on a thread rather than
/// interleave their histories. Distinct threads may run concurrently.
#[derive(Clone)]
pub struct Session {
    engine: Arc<WorkflowEngine>,
}

impl Session {
    #[must_use]
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self { engine }
    }

    /// Asks a question on the given thread and returns the generated answer.
    ///
    /// Restores prior history from the latest checkpoint when one exists. A
    /// failed restore is logged and treated as a fresh conversation; a failed
    /// checkpoint append during the pass is fatal and propagates.
    pub async fn ask(&self, question: &str, thread_id: &str) -> Result<String, SessionError> {
        let prior = match self.engine.checkpointer().latest(thread_id).await {
            Ok(Some(checkpoint)) => {
                info!(
                    thread_id,
                    step = checkpoint.step,
                    messages = checkpoint.state.messages.len(),
                    "resuming thread from latest checkpoint"
                );
                checkpoint.state
            }
            Ok(None) => ConversationState::new(),
            Err(err) => {
                warn!(
                    thread_id,
                    error = %err,
                    "could not load latest checkpoint, starting fresh"
                );
                ConversationState::new()
            }
        };

        let seed = StateUpdate::new()
            .with_messages(vec![Message::human(question)])
            .with_question(question)
            .with_retries(0)
            .with_needs_retry(false);

        let state = merge(prior, seed);
        let final_state = self.engine.run_pass(thread_id, state).await?;
        Ok(final_state.answer)
    }
}
