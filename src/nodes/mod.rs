//! The four step functions of the corrective-RAG workflow.
//!
//! Each node consumes a state snapshot plus one collaborator and returns only
//! the fields it changed. Collaborator failures degrade inside the node per
//! the workflow's failure policy; they never abort a pass.

pub mod evaluate;
pub mod generate;
pub mod retrieve;
pub mod rewrite;

pub use evaluate::{EvaluateNode, RelevancePolicy, ScoreThreshold};
pub use generate::{GenerateNode, FALLBACK_ANSWER};
pub use retrieve::RetrieveNode;
pub use rewrite::RewriteNode;
