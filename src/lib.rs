#![doc = r#"
Ragloom: a corrective-RAG workflow engine with durable conversational memory.

A question enters through a [`session::Session`], which restores the thread's
history from its latest checkpoint and runs one pass of a fixed state machine:

```text
retrieve -> evaluate -+-> generate -> done
     ^                |
     |                v
     +--- rewrite <---+   (while retrieval is unsatisfying, capped)
```

Each node returns a [`state::StateUpdate`] carrying only the fields it
changed; [`reducer::merge`] folds it into the conversation state, and the
result is checkpointed before routing continues. Collaborator failures
degrade inside the nodes; a checkpoint append failure is the one error that
aborts a pass.

## Quick start

```no_run
use std::sync::Arc;
use ragloom::clients::{OpenAiChatClient, StaticRetriever};
use ragloom::config::EngineConfig;
use ragloom::engine::corrective_rag;
use ragloom::runtimes::InMemoryCheckpointer;
use ragloom::session::Session;

# async fn run() -> miette::Result<()> {
let config = EngineConfig::default();
let chat = Arc::new(OpenAiChatClient::from_env()?);
let retriever = Arc::new(StaticRetriever::new(vec![]));
let checkpointer = Arc::new(InMemoryCheckpointer::new());

let engine = corrective_rag(chat, retriever, checkpointer, &config)?;
let session = Session::new(Arc::new(engine));

let answer = session.ask("What is a checkpoint?", "thread-1").await?;
println!("{answer}");
# Ok(())
# }
```
"#]

pub mod clients;
pub mod config;
pub mod document;
pub mod engine;
pub mod message;
pub mod node;
pub mod nodes;
pub mod reducer;
pub mod runtimes;
pub mod session;
pub mod state;
pub mod telemetry;
