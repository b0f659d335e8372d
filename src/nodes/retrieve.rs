use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::Retriever;
use crate::config::DEFAULT_COLLABORATOR_TIMEOUT;
use crate::node::{Node, NodeContext, NodeError};
use crate::state::{ConversationState, StateUpdate};

/// Fetches the top-k chunks for the current question.
///
/// Retrieval failures (backend errors, timeouts) degrade to an empty document
/// set: the pass continues and generation proceeds unaugmented. The documents
/// field is replaced wholesale on every execution.
pub struct RetrieveNode {
    retriever: Arc<dyn Retriever>,
    top_k: usize,
    timeout: Duration,
}

impl RetrieveNode {
    #[must_use]
    pub fn new(retriever: Arc<dyn Retriever>, top_k: usize) -> Self {
        Self {
            retriever,
            top_k,
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
impl Node for RetrieveNode {
    async fn run(
        &self,
        snapshot: ConversationState,
        ctx: NodeContext,
    ) -> Result<StateUpdate, NodeError> {
        if snapshot.question.is_empty() {
            return Err(NodeError::MissingInput { what: "question" });
        }

        let search = self.retriever.search(&snapshot.question, self.top_k);
        let documents = match tokio::time::timeout(self.timeout, search).await {
            Ok(Ok(documents)) => {
                debug!(
                    thread_id = %ctx.thread_id,
                    count = documents.len(),
                    "retrieved document chunks"
                );
                documents
            }
            Ok(Err(err)) => {
                warn!(
                    thread_id = %ctx.thread_id,
                    error = %err,
                    "retrieval failed, continuing without context"
                );
                Vec::new()
            }
            Err(_) => {
                warn!(
                    thread_id = %ctx.thread_id,
                    timeout = ?self.timeout,
                    "retrieval timed out, continuing without context"
                );
                Vec::new()
            }
        };

        Ok(StateUpdate::new().with_documents(documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::RetrieverError;
    use crate::document::DocumentChunk;

    struct FailingRetriever;

    #[async_trait]
    impl Retriever for FailingRetriever {
        async fn search(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<DocumentChunk>, RetrieverError> {
            Err(RetrieverError::Backend {
                message: "index offline".into(),
            })
        }
    }

    struct SlowRetriever;

    #[async_trait]
    impl Retriever for SlowRetriever {
        async fn search(
            &self,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<DocumentChunk>, RetrieverError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }
    }

    fn ctx() -> NodeContext {
        NodeContext {
            node: "retrieve",
            step: 0,
            thread_id: "t".into(),
        }
    }

    fn snapshot(question: &str) -> ConversationState {
        ConversationState {
            question: question.into(),
            ..ConversationState::default()
        }
    }

    #[tokio::test]
    async fn backend_failure_degrades_to_empty_documents() {
        let node = RetrieveNode::new(Arc::new(FailingRetriever), 4);
        let update = node.run(snapshot("q"), ctx()).await.unwrap();
        assert_eq!(update.documents, Some(vec![]));
    }

    #[tokio::test]
    async fn timeout_degrades_to_empty_documents() {
        let node =
            RetrieveNode::new(Arc::new(SlowRetriever), 4).with_timeout(Duration::from_millis(10));
        let update = node.run(snapshot("q"), ctx()).await.unwrap();
        assert_eq!(update.documents, Some(vec![]));
    }

    #[tokio::test]
    async fn empty_question_is_a_contract_violation() {
        let node = RetrieveNode::new(Arc::new(FailingRetriever), 4);
        let err = node.run(snapshot(""), ctx()).await.unwrap_err();
        assert!(matches!(err, NodeError::MissingInput { what: "question" }));
    }
}
