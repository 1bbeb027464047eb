//! Channel Client
//!
//! Owns the persistent websocket to the assistant. Inbound frames are
//! `{"event", "data"}` envelopes dispatched to per-name handlers; outbound user
//! turns may travel as binary frames carrying the raw image. When the channel is
//! down a turn can go through the one-shot HTTP backend instead.

pub mod client;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod fallback;
pub mod handlers;

pub use client::{ChannelClient, ConnectionState};
pub use config::ChannelConfig;
pub use envelope::{Envelope, OutboundFrame, TurnMessage, CHAT_STREAM_EVENT};
pub use errors::ChannelError;
pub use fallback::{Backend, HistoryMessage, HttpBackend, HISTORY_IMAGE_NAME, NO_VALID_RESPONSE};
pub use handlers::{EventHandler, HandlerId, HandlerRegistry};
