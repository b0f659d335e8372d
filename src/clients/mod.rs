//! External collaborator interfaces consumed by the workflow nodes.
//!
//! The engine only ever talks to the completion service and the
//! vector-search service through the narrow [`ChatClient`] and [`Retriever`]
//! traits defined here, so tests can substitute stubs and production code can
//! swap providers without touching node logic.

pub mod chat;
pub mod retriever;

pub use chat::{ChatClient, ChatError, ChatResponse, OpenAiChatClient, ToolCallRequest};
pub use retriever::{Retriever, RetrieverError, StaticRetriever};
