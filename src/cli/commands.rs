use clap::Subcommand;

use super::capture::CaptureArgs;
use super::chat::ChatArgs;
use super::config::ConfigArgs;
use super::history::HistoryArgs;
use super::send::SendArgs;

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start an interactive agent session driving the attached browser
    Chat(ChatArgs),

    /// Send one turn through the HTTP backend and print the reply
    Send(SendArgs),

    /// Print the stored history of a thread
    History(HistoryArgs),

    /// Save a screenshot of the attached page
    Capture(CaptureArgs),

    /// Manage CartPilot configuration
    Config(ConfigArgs),

    /// Show version and build information
    Info,
}
