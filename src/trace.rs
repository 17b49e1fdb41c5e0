//! Shared per-call trace.
//!
//! A [`Trace`] is an append-only record of diagnostic events accumulated
//! while a call moves between threads. It is shared behind an `Arc`: the
//! call holds one handle, the originating connection another, so events
//! stay correlated end to end even after the call object is gone.

use std::fmt::Write as _;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One recorded trace event, stamped relative to trace creation.
#[derive(Debug, Clone)]
pub struct TraceEntry {
    /// Offset from trace creation.
    pub at: Duration,
    /// Event description.
    pub message: String,
}

/// Append-only diagnostic event record for one call.
///
/// Appends take a `&self`; interior locking makes the shared handle safe
/// to use from whichever thread currently owns the call.
#[derive(Debug)]
pub struct Trace {
    start: Instant,
    entries: Mutex<Vec<TraceEntry>>,
}

impl Trace {
    /// New empty trace; the clock starts now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append an event.
    pub fn record(&self, message: impl Into<String>) {
        let entry = TraceEntry {
            at: self.start.elapsed(),
            message: message.into(),
        };
        self.entries.lock().expect("trace lock poisoned").push(entry);
    }

    /// Time elapsed since the trace was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Snapshot of all recorded events, in append order.
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.lock().expect("trace lock poisoned").clone()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("trace lock poisoned").len()
    }

    /// Whether no events were recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render the trace as one line per event, oldest first.
    pub fn dump(&self) -> String {
        let entries = self.entries();
        let mut out = String::with_capacity(entries.len() * 48);
        for entry in entries {
            let _ = writeln!(out, "{:>8}us] {}", entry.at.as_micros(), entry.message);
        }
        out
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}
