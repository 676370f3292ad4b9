//! Event sinks: best-effort, synchronous delivery of game events to
//! audio/UI subscribers.
//!
//! A sink that errors or panics is logged and skipped; it never stops the
//! frame that produced the events.

use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;
use tracing::warn;

use citadel_core::events::GameEvent;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

pub trait EventSink: Send {
    /// Label used in logs.
    fn name(&self) -> &str;

    fn deliver(&mut self, event: &GameEvent) -> Result<(), SinkError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    sinks: Vec<Box<dyn EventSink>>,
}

impl EventDispatcher {
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Deliver every event to every sink, in order.
    pub fn dispatch(&mut self, events: &[GameEvent]) {
        if events.is_empty() {
            return;
        }
        for sink in &mut self.sinks {
            for event in events {
                match panic::catch_unwind(AssertUnwindSafe(|| sink.deliver(event))) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => warn!(sink = sink.name(), error = %err, "event sink failed"),
                    Err(_) => warn!(sink = sink.name(), "event sink panicked"),
                }
            }
        }
    }
}
