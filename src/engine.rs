//! The fixed corrective-RAG state machine.
//!
//! Topology is deliberately not configurable: retrieve, evaluate, then either
//! rewrite (looping back to retrieve) or generate. The only tunable routing
//! input is the retry cap. Each node execution is followed by a merge and a
//! checkpoint append before routing continues, so every intermediate state is
//! durable.

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::clients::{ChatClient, Retriever};
use crate::config::EngineConfig;
use crate::node::{Node, NodeContext, NodeError};
use crate::nodes::{EvaluateNode, GenerateNode, RetrieveNode, RewriteNode, ScoreThreshold};
use crate::reducer::merge;
use crate::runtimes::{Checkpointer, CheckpointerError};
use crate::state::ConversationState;

/// The nodes of the workflow, plus the terminal marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Retrieve,
    Evaluate,
    Rewrite,
    Generate,
    Done,
}

impl NodeKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Retrieve => "retrieve",
            NodeKind::Evaluate => "evaluate",
            NodeKind::Rewrite => "rewrite",
            NodeKind::Generate => "generate",
            NodeKind::Done => "done",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a workflow pass.
///
/// Node degradation (failed retrieval, failed rewrite, failed generation) is
/// absorbed inside the nodes; what reaches this enum is either a contract
/// violation or a checkpoint append failure, both of which must surface.
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("node '{node}' failed")]
    #[diagnostic(code(ragloom::engine::node))]
    Node {
        node: &'static str,
        #[source]
        #[diagnostic_source]
        source: NodeError,
    },

    /// A checkpoint append failed. The pass stops here: continuing would
    /// leave durable history behind the in-memory state.
    #[error("checkpoint append failed after node '{node}'")]
    #[diagnostic(
        code(ragloom::engine::checkpoint),
        help("The persisted history is intact up to the previous checkpoint.")
    )]
    Checkpoint {
        node: &'static str,
        #[source]
        #[diagnostic_source]
        source: CheckpointerError,
    },

    /// The builder was missing a required component.
    #[error("engine is missing a required component: {what}")]
    #[diagnostic(code(ragloom::engine::incomplete))]
    Incomplete { what: &'static str },
}

/// Executes workflow passes over the fixed corrective-RAG topology.
///
/// Holds its collaborators behind trait objects so tests can substitute stub
/// nodes and stores. Construct with [`WorkflowEngine::builder`] or, for the
/// standard wiring, [`corrective_rag`].
pub struct WorkflowEngine {
    retrieve: Arc<dyn Node>,
    evaluate: Arc<dyn Node>,
    rewrite: Arc<dyn Node>,
    generate: Arc<dyn Node>,
    checkpointer: Arc<dyn Checkpointer>,
    max_retries: u32,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl WorkflowEngine {
    #[must_use]
    pub fn builder() -> WorkflowEngineBuilder {
        WorkflowEngineBuilder::default()
    }

    /// The retry cap consumed by routing.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The checkpoint store this engine appends to.
    #[must_use]
    pub fn checkpointer(&self) -> Arc<dyn Checkpointer> {
        Arc::clone(&self.checkpointer)
    }

    fn node(&self, kind: NodeKind) -> &Arc<dyn Node> {
        match kind {
            NodeKind::Retrieve => &self.retrieve,
            NodeKind::Evaluate => &self.evaluate,
            NodeKind::Rewrite => &self.rewrite,
            NodeKind::Generate => &self.generate,
            NodeKind::Done => unreachable!("terminal marker is never executed"),
        }
    }

    /// Routing after `kind` has executed and its update has been merged.
    fn next(&self, kind: NodeKind, state: &ConversationState) -> NodeKind {
        match kind {
            NodeKind::Retrieve => NodeKind::Evaluate,
            NodeKind::Evaluate => {
                if state.needs_retry && state.retries < self.max_retries {
                    NodeKind::Rewrite
                } else {
                    NodeKind::Generate
                }
            }
            NodeKind::Rewrite => NodeKind::Retrieve,
            NodeKind::Generate | NodeKind::Done => NodeKind::Done,
        }
    }

    /// Runs one full pass from an already-seeded state to completion.
    ///
    /// The state must carry a non-empty question (the session layer seeds it).
    /// Every node execution is checkpointed; an append failure aborts the
    /// pass with [`EngineError::Checkpoint`].
    #[instrument(skip(self, state), err)]
    pub async fn run_pass(
        &self,
        thread_id: &str,
        mut state: ConversationState,
    ) -> Result<ConversationState, EngineError> {
        let mut kind = NodeKind::Retrieve;
        let mut step: u64 = 0;

        while kind != NodeKind::Done {
            let ctx = NodeContext {
                node: kind.as_str(),
                step,
                thread_id: thread_id.to_string(),
            };

            let update = self
                .node(kind)
                .run(state.clone(), ctx)
                .await
                .map_err(|source| EngineError::Node {
                    node: kind.as_str(),
                    source,
                })?;

            state = merge(state, update);

            self.checkpointer
                .append(thread_id, &state)
                .await
                .map_err(|source| EngineError::Checkpoint {
                    node: kind.as_str(),
                    source,
                })?;

            let next = self.next(kind, &state);
            debug!(thread_id, step, from = %kind, to = %next, "routed");
            kind = next;
            step += 1;
        }

        Ok(state)
    }
}

/// Step-by-step construction of a [`WorkflowEngine`].
#[derive(Default)]
pub struct WorkflowEngineBuilder {
    retrieve: Option<Arc<dyn Node>>,
    evaluate: Option<Arc<dyn Node>>,
    rewrite: Option<Arc<dyn Node>>,
    generate: Option<Arc<dyn Node>>,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    max_retries: Option<u32>,
}

impl WorkflowEngineBuilder {
    #[must_use]
    pub fn with_retrieve(mut self, node: Arc<dyn Node>) -> Self {
        self.retrieve = Some(node);
        self
    }

    #[must_use]
    pub fn with_evaluate(mut self, node: Arc<dyn Node>) -> Self {
        self.evaluate = Some(node);
        self
    }

    #[must_use]
    pub fn with_rewrite(mut self, node: Arc<dyn Node>) -> Self {
        self.rewrite = Some(node);
        self
    }

    #[must_use]
    pub fn with_generate(mut self, node: Arc<dyn Node>) -> Self {
        self.generate = Some(node);
        self
    }

    #[must_use]
    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn build(self) -> Result<WorkflowEngine, EngineError> {
        Ok(WorkflowEngine {
            retrieve: self
                .retrieve
                .ok_or(EngineError::Incomplete { what: "retrieve" })?,
            evaluate: self
                .evaluate
                .ok_or(EngineError::Incomplete { what: "evaluate" })?,
            rewrite: self
                .rewrite
                .ok_or(EngineError::Incomplete { what: "rewrite" })?,
            generate: self
                .generate
                .ok_or(EngineError::Incomplete { what: "generate" })?,
            checkpointer: self.checkpointer.ok_or(EngineError::Incomplete {
                what: "checkpointer",
            })?,
            max_retries: self
                .max_retries
                .unwrap_or(crate::config::DEFAULT_MAX_RETRIES),
        })
    }
}

/// Standard wiring: the four production nodes around the given collaborators.
pub fn corrective_rag(
    chat: Arc<dyn ChatClient>,
    retriever: Arc<dyn Retriever>,
    checkpointer: Arc<dyn Checkpointer>,
    config: &EngineConfig,
) -> Result<WorkflowEngine, EngineError> {
    let policy = ScoreThreshold {
        min_score: config.min_score,
        min_useful: 1,
    };

    WorkflowEngine::builder()
        .with_retrieve(Arc::new(
            RetrieveNode::new(retriever, config.top_k)
                .with_timeout(config.collaborator_timeout),
        ))
        .with_evaluate(Arc::new(EvaluateNode::new(Arc::new(policy))))
        .with_rewrite(Arc::new(
            RewriteNode::new(Arc::clone(&chat)).with_timeout(config.collaborator_timeout),
        ))
        .with_generate(Arc::new(
            GenerateNode::new(chat).with_timeout(config.collaborator_timeout),
        ))
        .with_checkpointer(checkpointer)
        .with_max_retries(config.max_retries)
        .build()
}
