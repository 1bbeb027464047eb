//! Tool calls currently executing, and the ones already answered.
//!
//! Admission is a single check-then-insert under one lock, so two concurrent
//! deliveries of the same tool id can never both be accepted.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use cartpilot_core_types::{ThreadId, ToolCallRequest, ToolId};
use parking_lot::Mutex;

pub const DEFAULT_COMPLETED_CAPACITY: usize = 1_024;

type CallKey = (ThreadId, ToolId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// Same call is still executing
    InFlight,
    /// Same call already produced its result
    Completed,
}

#[derive(Debug)]
struct InFlightCall {
    tool_name: String,
    started: Instant,
}

#[derive(Debug)]
struct TableInner {
    in_flight: HashMap<CallKey, InFlightCall>,
    completed: HashSet<CallKey>,
    completed_order: VecDeque<CallKey>,
    capacity: usize,
}

#[derive(Debug)]
pub struct InFlightTable {
    inner: Mutex<TableInner>,
}

impl Default for InFlightTable {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_COMPLETED_CAPACITY)
    }
}

impl InFlightTable {
    /// `capacity` bounds how many answered calls are remembered.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(TableInner {
                in_flight: HashMap::new(),
                completed: HashSet::new(),
                completed_order: VecDeque::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn try_begin(&self, request: &ToolCallRequest) -> Admission {
        let key = (request.thread_id.clone(), request.tool_id.clone());
        let mut inner = self.inner.lock();
        if inner.in_flight.contains_key(&key) {
            return Admission::InFlight;
        }
        if inner.completed.contains(&key) {
            return Admission::Completed;
        }
        inner.in_flight.insert(
            key,
            InFlightCall {
                tool_name: request.tool_name.clone(),
                started: Instant::now(),
            },
        );
        Admission::Accepted
    }

    /// Move a call from in flight to completed. Returns how long it ran, or
    /// `None` if it was not in flight.
    pub fn complete(&self, thread_id: &ThreadId, tool_id: &ToolId) -> Option<Duration> {
        let key = (thread_id.clone(), tool_id.clone());
        let mut inner = self.inner.lock();
        let call = inner.in_flight.remove(&key)?;
        if inner.completed.insert(key.clone()) {
            inner.completed_order.push_back(key);
            while inner.completed_order.len() > inner.capacity {
                if let Some(old) = inner.completed_order.pop_front() {
                    inner.completed.remove(&old);
                }
            }
        }
        Some(call.started.elapsed())
    }

    pub fn is_in_flight(&self, thread_id: &ThreadId, tool_id: &ToolId) -> bool {
        self.inner
            .lock()
            .in_flight
            .contains_key(&(thread_id.clone(), tool_id.clone()))
    }

    pub fn is_completed(&self, thread_id: &ThreadId, tool_id: &ToolId) -> bool {
        self.inner
            .lock()
            .completed
            .contains(&(thread_id.clone(), tool_id.clone()))
    }

    pub fn in_flight_len(&self) -> usize {
        self.inner.lock().in_flight.len()
    }

    pub fn completed_len(&self) -> usize {
        self.inner.lock().completed.len()
    }

    /// `(tool_id, tool_name)` of every executing call, oldest first.
    pub fn executing(&self) -> Vec<(ToolId, String)> {
        let inner = self.inner.lock();
        let mut calls: Vec<_> = inner.in_flight.iter().collect();
        calls.sort_by_key(|(_, call)| call.started);
        calls
            .into_iter()
            .map(|((_, tool_id), call)| (tool_id.clone(), call.tool_name.clone()))
            .collect()
    }
}
