use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::node::{Node, NodeContext, NodeError};
use crate::state::{ConversationState, StateUpdate};

use crate::document::DocumentChunk;

/// Decides whether a retrieved document set is good enough to answer from.
///
/// Kept as a trait so the scoring rule can be swapped (model-graded relevance,
/// embedding distance cutoffs) without touching the node.
pub trait RelevancePolicy: Send + Sync {
    fn needs_retry(&self, documents: &[DocumentChunk]) -> bool;
}

/// Default policy: retry unless at least `min_useful` chunks score at or
/// above `min_score`.
#[derive(Clone, Copy, Debug)]
pub struct ScoreThreshold {
    pub min_score: f32,
    pub min_useful: usize,
}

impl Default for ScoreThreshold {
    fn default() -> Self {
        Self {
            min_score: 0.0,
            min_useful: 1,
        }
    }
}

impl RelevancePolicy for ScoreThreshold {
    fn needs_retry(&self, documents: &[DocumentChunk]) -> bool {
        let useful = documents
            .iter()
            .filter(|d| d.score >= self.min_score)
            .count();
        useful < self.min_useful
    }
}

/// Pure evaluation step: grades the current document set and records the
/// verdict. No collaborator calls, so this node cannot degrade or fail.
pub struct EvaluateNode {
    policy: Arc<dyn RelevancePolicy>,
}

impl EvaluateNode {
    #[must_use]
    pub fn new(policy: Arc<dyn RelevancePolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Node for EvaluateNode {
    async fn run(
        &self,
        snapshot: ConversationState,
        ctx: NodeContext,
    ) -> Result<StateUpdate, NodeError> {
        let needs_retry = self.policy.needs_retry(&snapshot.documents);
        debug!(
            thread_id = %ctx.thread_id,
            documents = snapshot.documents.len(),
            needs_retry,
            "evaluated retrieval quality"
        );
        Ok(StateUpdate::new().with_needs_retry(needs_retry))
    }
}
