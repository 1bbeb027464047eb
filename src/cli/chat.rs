use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cartpilot_core_types::ThreadId;
use channel_client::HttpBackend;
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use super::context::CliContext;
use super::render::TranscriptPrinter;
use super::send::load_image;
use crate::app_context::AppContext;
use crate::session::Delivery;

#[derive(Args, Debug, Clone)]
pub struct ChatArgs {
    /// Resume a stored thread instead of starting a new one
    #[arg(long, value_name = "ID")]
    pub thread: Option<String>,

    /// Send every turn through the HTTP backend; tool calls are unavailable
    #[arg(long)]
    pub http_only: bool,
}

/// One line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatInput {
    Message {
        text: String,
        image: Option<PathBuf>,
    },
    NewChat,
    Thread(String),
    Websocket(bool),
    Connect,
    Help,
    Quit,
    Empty,
}

pub fn parse_input(line: &str) -> Result<ChatInput, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ChatInput::Empty);
    }
    let Some(command) = line.strip_prefix('/') else {
        return Ok(ChatInput::Message {
            text: line.to_string(),
            image: None,
        });
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((command, ""));
    match name {
        "quit" | "exit" => Ok(ChatInput::Quit),
        "help" => Ok(ChatInput::Help),
        "new" => Ok(ChatInput::NewChat),
        "connect" => Ok(ChatInput::Connect),
        "thread" if !rest.is_empty() => Ok(ChatInput::Thread(rest.to_string())),
        "thread" => Err("usage: /thread <id>".to_string()),
        "ws" => match rest {
            "on" => Ok(ChatInput::Websocket(true)),
            "off" => Ok(ChatInput::Websocket(false)),
            _ => Err("usage: /ws on|off".to_string()),
        },
        "image" => {
            let (path, text) = rest
                .split_once(char::is_whitespace)
                .map(|(path, text)| (path, text.trim()))
                .unwrap_or((rest, ""));
            if path.is_empty() {
                return Err("usage: /image <file> [message]".to_string());
            }
            Ok(ChatInput::Message {
                text: text.to_string(),
                image: Some(PathBuf::from(path)),
            })
        }
        other => Err(format!("unknown command /{other}; try /help")),
    }
}

const HELP: &str = "\
Type a message and press enter.
  /image <file> [message]  attach an image
  /new                     start a new chat
  /thread <id>             switch to a stored thread
  /ws on|off               use or bypass the websocket
  /connect                 reconnect the websocket
  /quit                    leave";

pub async fn cmd_chat(args: ChatArgs, ctx: &CliContext) -> Result<()> {
    let config = ctx.config().clone();
    config.validate().context("invalid configuration")?;

    let page = cdp_adapter::attach(&config.browser.devtools)
        .await
        .context("Failed to attach to the browser")?;
    let backend = Arc::new(HttpBackend::from_config(&config.channel)?);
    let app = AppContext::assemble(config, page.clone(), page, backend);

    app.session().set_websocket_mode(!args.http_only);
    if !args.http_only {
        if let Err(err) = app.channel().connect().await {
            warn!(%err, "Channel unavailable; turns will use the HTTP backend");
        }
    }
    if let Some(thread) = args.thread {
        app.session().switch_thread(ThreadId::from(thread)).await;
    }

    println!("{HELP}");
    println!("thread: {}", app.session().thread_id());
    let outcome = chat_loop(&app).await;
    app.shutdown().await;
    outcome
}

async fn chat_loop(app: &AppContext) -> Result<()> {
    let session = Arc::clone(app.session());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut version = app.transcript().view().subscribe();
    let mut typing = app.typing();
    let mut connection = app.channel().subscribe_state();
    let mut printer = TranscriptPrinter::new();

    for line in printer.update(&app.transcript().snapshot()) {
        println!("{line}");
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                let input = match parse_input(&line) {
                    Ok(input) => input,
                    Err(usage) => {
                        println!("{usage}");
                        continue;
                    }
                };
                match input {
                    ChatInput::Quit => break,
                    ChatInput::Empty => {}
                    ChatInput::Help => println!("{HELP}"),
                    ChatInput::NewChat => {
                        let thread_id = session.new_chat().await;
                        println!("thread: {thread_id}");
                    }
                    ChatInput::Thread(id) => {
                        let loaded = session.switch_thread(ThreadId::from(id)).await;
                        println!("thread: {} ({loaded} messages)", session.thread_id());
                    }
                    ChatInput::Websocket(enabled) => session.set_websocket_mode(enabled),
                    ChatInput::Connect => {
                        if let Err(err) = app.channel().connect().await {
                            println!("[channel] {err}");
                        }
                    }
                    ChatInput::Message { text, image } => {
                        let image = match image {
                            Some(path) => match load_image(&path).await {
                                Ok(image) => Some(image),
                                Err(err) => {
                                    println!("{err:#}");
                                    continue;
                                }
                            },
                            None => None,
                        };
                        match session.send_message(&text, image).await {
                            Ok(Delivery::Channel) => info!("Turn sent over the channel"),
                            Ok(delivery) => info!(?delivery, "Turn answered over HTTP"),
                            Err(err) => println!("{err}"),
                        }
                    }
                }
            }
            Ok(()) = version.changed() => {
                for line in printer.update(&app.transcript().snapshot()) {
                    println!("{line}");
                }
            }
            Ok(()) = typing.changed() => {
                if *typing.borrow_and_update() {
                    println!("... assistant is typing");
                }
            }
            Ok(()) = connection.changed() => {
                let state = connection.borrow_and_update().clone();
                match (state.connected, state.last_error) {
                    (true, _) => println!("[channel] connected"),
                    (false, Some(err)) => println!("[channel] offline: {err}"),
                    (false, None) => println!("[channel] offline"),
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_messages() {
        assert_eq!(
            parse_input("  find a coffee mug "),
            Ok(ChatInput::Message {
                text: "find a coffee mug".to_string(),
                image: None
            })
        );
        assert_eq!(parse_input("   "), Ok(ChatInput::Empty));
    }

    #[test]
    fn commands_are_parsed() {
        assert_eq!(parse_input("/quit"), Ok(ChatInput::Quit));
        assert_eq!(parse_input("/thread 42"), Ok(ChatInput::Thread("42".to_string())));
        assert_eq!(parse_input("/ws off"), Ok(ChatInput::Websocket(false)));
        assert_eq!(
            parse_input("/image shelf.png is this in stock?"),
            Ok(ChatInput::Message {
                text: "is this in stock?".to_string(),
                image: Some(PathBuf::from("shelf.png")),
            })
        );
    }

    #[test]
    fn bad_commands_report_usage() {
        assert!(parse_input("/thread").is_err());
        assert!(parse_input("/ws maybe").is_err());
        assert!(parse_input("/dance").is_err());
    }
}
