use anyhow::{Context, Result};
use cartpilot_core_types::ThreadId;
use channel_client::{Backend, HttpBackend};
use clap::Args;

use super::render::render_entry;
use crate::config::AppConfig;
use crate::session::history_entries;

#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Thread id
    pub thread: String,

    /// Print the entries as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn cmd_history(args: HistoryArgs, config: &AppConfig) -> Result<()> {
    let backend = HttpBackend::from_config(&config.channel)?;
    let thread_id = ThreadId::from(args.thread);
    let messages = backend
        .fetch_history(&thread_id)
        .await
        .with_context(|| format!("Failed to load history of thread {thread_id}"))?;
    let entries = history_entries(messages);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("Thread {thread_id} has no messages");
    }
    for entry in &entries {
        println!("{}", render_entry(entry));
    }
    Ok(())
}
