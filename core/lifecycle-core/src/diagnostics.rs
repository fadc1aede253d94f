//! Sinks for rejected lifecycle events.
//!
//! The transition function only describes a rejection; whoever owns the
//! current state hands it to a [`DiagnosticsSink`]. Sinks are fire-and-forget:
//! they return nothing and must not block the lifecycle callback that
//! produced the event.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

use crate::transition::InvalidTransition;

pub trait DiagnosticsSink: Send + Sync {
    /// Called once per rejected event, with the time it was rejected.
    fn record_invalid_transition(&self, rejected: &InvalidTransition, at: DateTime<Utc>);
}

impl<T: DiagnosticsSink + ?Sized> DiagnosticsSink for Arc<T> {
    fn record_invalid_transition(&self, rejected: &InvalidTransition, at: DateTime<Utc>) {
        (**self).record_invalid_transition(rejected, at);
    }
}

impl<T: DiagnosticsSink + ?Sized> DiagnosticsSink for Box<T> {
    fn record_invalid_transition(&self, rejected: &InvalidTransition, at: DateTime<Utc>) {
        (**self).record_invalid_transition(rejected, at);
    }
}

/// Writes one error-level log line per rejected event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record_invalid_transition(&self, rejected: &InvalidTransition, _at: DateTime<Utc>) {
        tracing::error!(
            event = rejected.event_name(),
            state = rejected.state_type_name(),
            "Invalid transition ({}) for state ({})",
            rejected.event_name(),
            rejected.state_type_name()
        );
    }
}

/// Keeps every rejection in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(InvalidTransition, DateTime<Utc>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(InvalidTransition, DateTime<Utc>)> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticsSink for MemorySink {
    fn record_invalid_transition(&self, rejected: &InvalidTransition, at: DateTime<Utc>) {
        if let Ok(mut records) = self.records.lock() {
            records.push((*rejected, at));
        }
    }
}

/// Forwards each rejection to every inner sink, in order.
#[derive(Default)]
pub struct FanOutSink {
    sinks: Vec<Arc<dyn DiagnosticsSink>>,
}

impl FanOutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Arc<dyn DiagnosticsSink>) {
        self.sinks.push(sink);
    }
}

impl DiagnosticsSink for FanOutSink {
    fn record_invalid_transition(&self, rejected: &InvalidTransition, at: DateTime<Utc>) {
        for sink in &self.sinks {
            sink.record_invalid_transition(rejected, at);
        }
    }
}
