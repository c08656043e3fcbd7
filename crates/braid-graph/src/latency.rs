//! Audio-to-control latency notifications.
//!
//! Hosted modules may change their latency while processing. The audio thread
//! cannot resize delay lines, so it pushes a [`LatencyEvent`] into a
//! fixed-capacity SPSC ring and moves on. The control thread drains the ring
//! and recomputes latency for the whole splitter. Recomputation reads live
//! module latencies, so a dropped event (ring full) is harmless as long as
//! one event from the burst arrives.

use rtrb::{Consumer, Producer, RingBuffer};

/// A module reported a new latency during processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyEvent {
    /// Index of the chain that owns the module.
    pub chain: usize,
    /// Position of the slot in the chain.
    pub slot: usize,
    /// Latency the module now reports, in samples.
    pub latency_samples: usize,
}

/// Audio-thread end of the latency queue.
pub type LatencyProducer = Producer<LatencyEvent>;

/// Control-thread end of the latency queue.
pub type LatencyConsumer = Consumer<LatencyEvent>;

/// Creates a latency queue holding at most `capacity` pending events.
pub fn latency_queue(capacity: usize) -> (LatencyProducer, LatencyConsumer) {
    RingBuffer::new(capacity.max(1))
}
