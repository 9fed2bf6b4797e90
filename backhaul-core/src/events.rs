//! Event types and the time-ordered scheduler driving simulated causality.
//!
//! All simulation time is in seconds, carried as `f64` exactly as the model
//! defines it. The scheduler owns the simulated clock: popping an event
//! advances the clock to that event's time, so time only ever moves forward.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::registry::FileId;

/// Stages of the per-file request lifecycle, dispatched exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A client requests a file, perpetuating the arrival process.
    NewRequest,
    /// A cache miss reaches the tail of the shared access link.
    ArriveQueue,
    /// The head of the access link finishes transfer and hits the cache.
    DepartQueue,
    /// The file is fully received; its latency sample is complete.
    FileReceived,
}

impl EventKind {
    /// Returns string representation of event kind for metrics and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NewRequest => "NewRequest",
            EventKind::ArriveQueue => "ArriveQueue",
            EventKind::DepartQueue => "DepartQueue",
            EventKind::FileReceived => "FileReceived",
        }
    }
}

/// A scheduled lifecycle transition for one file.
#[derive(Debug, Clone, Copy)]
pub struct Event {
    /// Simulated time at which the event fires, in seconds.
    pub time: f64,
    /// Lifecycle stage to dispatch.
    pub kind: EventKind,
    /// File the event concerns.
    pub file: FileId,
    /// Monotonic sequence number; breaks ties among equal-time events.
    seq: u64,
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Earlier time first; equal times resolve by insertion order so a
        // fixed seed always replays the same trajectory.
        match self.time.total_cmp(&other.time) {
            Ordering::Equal => other.seq.cmp(&self.seq),
            ord => ord.reverse(), // Reverse for min-heap behavior
        }
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Strict-time-ordered queue of pending events plus the simulated clock.
///
/// Events, once scheduled, always eventually fire; there is no cancellation.
#[derive(Debug, Default)]
pub struct EventScheduler {
    events: BinaryHeap<Event>,
    clock: f64,
    next_seq: u64,
}

impl EventScheduler {
    /// Creates an empty scheduler with the clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current simulated time in seconds.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Schedules `kind` for `file` at `clock + delay`.
    ///
    /// `delay` must be non-negative and finite; every delay in the model is
    /// a size divided by a positive rate or a draw from a positive-support
    /// distribution.
    pub fn schedule(&mut self, kind: EventKind, file: FileId, delay: f64) {
        debug_assert!(delay >= 0.0 && delay.is_finite(), "bad delay: {delay}");

        let event = Event {
            time: self.clock + delay,
            kind,
            file,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.events.push(event);
    }

    /// Removes and returns the minimum-time event, advancing the clock to
    /// that event's time. Returns `None` when the scheduler is empty; the
    /// simulation loop treats that as a broken arrival chain, never as a
    /// normal stop.
    pub fn next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        debug_assert!(event.time >= self.clock, "clock moved backwards");
        self.clock = event.time;
        Some(event)
    }

    /// Returns true when no events are pending.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }
}
