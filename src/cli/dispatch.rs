use super::capture::cmd_capture;
use super::chat::cmd_chat;
use super::config::cmd_config;
use super::env::CliArgs;
use super::history::cmd_history;
use super::info::cmd_info;
use super::send::cmd_send;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Chat(args) => cmd_chat(args, ctx).await,
        Commands::Send(args) => cmd_send(args, ctx.config()).await,
        Commands::History(args) => cmd_history(args, ctx.config()).await,
        Commands::Capture(args) => cmd_capture(args, ctx.config()).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
        Commands::Info => cmd_info(ctx),
    }
}
