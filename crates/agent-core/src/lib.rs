//! Event Reconciler
//!
//! Consumes the assistant's event stream for one chat, drops duplicates, keeps the
//! transcript consistent and hands tool calls to the action executor without
//! blocking the stream. Every accepted tool call produces exactly one result.

pub mod classify;
pub mod errors;
pub mod events;
pub mod inflight;
pub mod ledger;
pub mod messages;
pub mod reconciler;

pub use classify::{classify, looks_like_tool_status, FragmentClass};
pub use errors::ReconcileError;
pub use events::{EventKind, Fragment, FragmentKind, StreamEvent, INBOUND_EVENT_NAMES};
pub use inflight::{Admission, InFlightTable};
pub use ledger::{fingerprint, DedupLedger, FragmentKey};
pub use reconciler::{
    Completion, Reconciler, ReconcilerConfig, ReconcilerInput, ResultSink, TurnState,
};
