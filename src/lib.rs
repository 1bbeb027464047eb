//! CartPilot - browser-resident shopping agent
//!
//! The binary attaches to a running browser over DevTools, opens the channel to
//! the assistant and executes the browser tool calls the assistant streams back.

pub mod app_context;
pub mod cli;
pub mod config;
pub mod session;

pub use app_context::{bridge_events, AppContext, ChannelResultSink};
pub use config::{AppConfig, BrowserConfig, ConfigError};
pub use session::{ChatSession, CurrentThread, Delivery, TurnChannel};
