//! Interactive terminal chat over the corrective-RAG workflow.
//!
//! Conversations persist across restarts: the active thread id is kept in
//! `data/.current_session` and every workflow step is checkpointed to the
//! configured SQLite database. Commands: `new` starts a fresh thread, `exit`
//! quits.

use std::path::Path;
use std::sync::Arc;

use miette::{IntoDiagnostic, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use ragloom::clients::{OpenAiChatClient, StaticRetriever};
use ragloom::config::EngineConfig;
use ragloom::document::DocumentChunk;
use ragloom::engine::corrective_rag;
use ragloom::runtimes::SqliteCheckpointer;
use ragloom::session::Session;
use ragloom::telemetry;

const SESSION_FILE: &str = "data/.current_session";
const DEFAULT_CHUNKS_PATH: &str = "data/chunks.json";

fn load_corpus() -> Result<Vec<DocumentChunk>> {
    let path = std::env::var("CHUNKS_PATH").unwrap_or_else(|_| DEFAULT_CHUNKS_PATH.to_string());
    if !Path::new(&path).exists() {
        warn!(path, "no corpus file found, retrieval will return nothing");
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(&path).into_diagnostic()?;
    serde_json::from_str(&raw).into_diagnostic()
}

fn load_or_create_thread_id() -> Result<String> {
    if let Ok(existing) = std::fs::read_to_string(SESSION_FILE) {
        let existing = existing.trim();
        if !existing.is_empty() {
            return Ok(existing.to_string());
        }
    }
    let id = uuid::Uuid::new_v4().to_string();
    std::fs::write(SESSION_FILE, &id).into_diagnostic()?;
    Ok(id)
}

fn save_thread_id(id: &str) -> Result<()> {
    std::fs::write(SESSION_FILE, id).into_diagnostic()
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let config = EngineConfig::from_env();
    std::fs::create_dir_all("data").into_diagnostic()?;

    let chat = Arc::new(OpenAiChatClient::from_env()?);
    let retriever = Arc::new(StaticRetriever::new(load_corpus()?));
    let checkpointer = Arc::new(SqliteCheckpointer::connect(&config.database_url).await?);

    let engine = corrective_rag(chat, retriever, checkpointer, &config)?;
    let session = Session::new(Arc::new(engine));

    let mut thread_id = load_or_create_thread_id()?;
    println!("Thread {thread_id}. Type a question, `new` for a fresh thread, `exit` to quit.");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await.into_diagnostic()?;
        stdout.flush().await.into_diagnostic()?;

        let Some(line) = lines.next_line().await.into_diagnostic()? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "exit" => break,
            "new" => {
                thread_id = uuid::Uuid::new_v4().to_string();
                save_thread_id(&thread_id)?;
                println!("Started thread {thread_id}.");
            }
            question => match session.ask(question, &thread_id).await {
                Ok(answer) => println!("\n{answer}\n"),
                Err(err) => eprintln!("{:?}", miette::Report::new(err)),
            },
        }
    }

    Ok(())
}
