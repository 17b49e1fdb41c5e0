//! Per-call timing record.
//!
//! Three monotonic timestamps cover the call's life: accepted off the
//! wire, handler kicked off, handler finished. Each is set exactly once,
//! by whichever thread owns the call at that moment. There is no locking;
//! the single-owner handoff discipline is the synchronization.

use std::time::{Duration, Instant};

/// Timing information for one inbound call.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallTiming {
    /// When the call was first accepted.
    pub time_received: Option<Instant>,
    /// When the call handler was kicked off.
    pub time_handled: Option<Instant>,
    /// When the call handler completed.
    pub time_completed: Option<Instant>,
}

impl CallTiming {
    /// New record with no timestamps set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Elapsed time between acceptance and handler start (queue time).
    ///
    /// `None` until both timestamps are recorded.
    pub fn queue_time(&self) -> Option<Duration> {
        match (self.time_received, self.time_handled) {
            (Some(received), Some(handled)) => Some(handled.duration_since(received)),
            _ => None,
        }
    }

    /// Elapsed time spent inside the handler.
    ///
    /// `None` until both timestamps are recorded.
    pub fn handler_time(&self) -> Option<Duration> {
        match (self.time_handled, self.time_completed) {
            (Some(handled), Some(completed)) => Some(completed.duration_since(handled)),
            _ => None,
        }
    }

    /// Total elapsed time from acceptance to handler completion.
    pub fn total_time(&self) -> Option<Duration> {
        match (self.time_received, self.time_completed) {
            (Some(received), Some(completed)) => Some(completed.duration_since(received)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record_has_no_intervals() {
        let timing = CallTiming::new();
        assert!(timing.queue_time().is_none());
        assert!(timing.handler_time().is_none());
        assert!(timing.total_time().is_none());
    }

    #[test]
    fn test_intervals_are_ordered_and_non_negative() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(5);
        let t2 = t1 + Duration::from_millis(12);

        let timing = CallTiming {
            time_received: Some(t0),
            time_handled: Some(t1),
            time_completed: Some(t2),
        };

        assert_eq!(timing.queue_time(), Some(Duration::from_millis(5)));
        assert_eq!(timing.handler_time(), Some(Duration::from_millis(12)));
        assert_eq!(timing.total_time(), Some(Duration::from_millis(17)));
    }
}
