//! Inspects persisted conversation threads.
//!
//! Without arguments, lists all threads (most recently active first) with
//! their message counts. With a thread id, prints the full transcript from
//! the thread's latest checkpoint.

use miette::{miette, Result};

use ragloom::config::EngineConfig;
use ragloom::runtimes::{Checkpointer, SqliteCheckpointer};
use ragloom::telemetry;

async fn list_threads(store: &SqliteCheckpointer) -> Result<()> {
    let threads = store.list_threads().await?;
    if threads.is_empty() {
        println!("No threads recorded yet.");
        return Ok(());
    }

    println!("{} thread(s), most recent first:\n", threads.len());
    for thread_id in threads {
        let messages = match store.latest(&thread_id).await? {
            Some(checkpoint) => checkpoint.state.messages.len(),
            None => 0,
        };
        println!("  {thread_id}  ({messages} messages)");
    }
    Ok(())
}

async fn show_thread(store: &SqliteCheckpointer, thread_id: &str) -> Result<()> {
    let checkpoint = store
        .latest(thread_id)
        .await?
        .ok_or_else(|| miette!("no checkpoints found for thread '{thread_id}'"))?;

    println!(
        "Thread {thread_id} (step {}, updated {})\n",
        checkpoint.step,
        checkpoint.created_at.to_rfc3339()
    );
    for message in &checkpoint.state.messages {
        println!("[{}] {}\n", message.role, message.content);
    }

    println!("Last question: {}", checkpoint.state.question);
    println!("Last answer:   {}", checkpoint.state.answer);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    let config = EngineConfig::from_env();
    let store = SqliteCheckpointer::connect(&config.database_url).await?;

    match std::env::args().nth(1) {
        Some(thread_id) => show_thread(&store, &thread_id).await,
        None => list_threads(&store).await,
    }
}
