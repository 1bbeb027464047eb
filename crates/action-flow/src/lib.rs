//! Action Executor
//!
//! Turns a browser tool call into DOM automation. Every tool follows the same
//! protocol: locate, highlight, act, settle, report. Screen capture skips the
//! DOM entirely and returns the image as evidence.
//!
//! `execute` never fails: argument errors, locate failures and even panics inside
//! an action come back as a `ToolCallResult` with `success = false`.

pub mod errors;
pub mod executor;
pub mod pending;
pub mod types;

mod actions;

pub use errors::FlowError;
pub use executor::{ActionExecutor, DefaultActionExecutor};
pub use pending::{PendingCart, PendingGuard};
pub use types::{ActionOutcome, ExecutorConfig, ToolAction};
