//! The node execution contract for workflow steps.
//!
//! A node consumes a snapshot of the conversation state plus its execution
//! context, and returns only the fields it changed. Collaborator failures
//! (search, completion, timeouts) are absorbed inside the node per the
//! degradation policy of each step; [`NodeError`] is reserved for contract
//! violations that should abort the pass.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::state::{ConversationState, StateUpdate};

/// A single unit of work in the workflow graph.
///
/// Implementations must not mutate the input snapshot; they return a
/// [`StateUpdate`] carrying only the fields they produced. The engine merges
/// the update and checkpoints the result before routing onwards.
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(
        &self,
        snapshot: ConversationState,
        ctx: NodeContext,
    ) -> Result<StateUpdate, NodeError>;
}

/// Execution metadata handed to a node for tracing and diagnostics.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// Name of the node being executed.
    pub node: &'static str,
    /// Zero-based index of this node execution within the current pass.
    pub step: u64,
    /// The conversation thread this pass belongs to.
    pub thread_id: String,
}

/// Fatal node failures that abort the current pass.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the state snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(ragloom::node::missing_input),
        help("Check that the pass was seeded and previous nodes produced the required data.")
    )]
    MissingInput { what: &'static str },

    /// An external collaborator failed in a way the node cannot degrade from.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(ragloom::node::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(ragloom::node::serde_json))]
    Serde(#[from] serde_json::Error),
}
