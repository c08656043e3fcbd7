//! Per-block processing context handed down the graph.

use crate::latency::{LatencyEvent, LatencyProducer};
use crate::modulation::ModulationSourceSet;

/// What a chain needs from its surroundings while processing a block.
///
/// Carries the current modulation source outputs (read before each plugin
/// runs) and the producer end of the latency queue.
pub struct ProcessContext<'a> {
    sources: &'a ModulationSourceSet,
    events: Option<&'a mut LatencyProducer>,
    chain: usize,
}

impl<'a> ProcessContext<'a> {
    /// Creates a context. Without a producer, latency changes go unreported
    /// until the next explicit recompute.
    pub fn new(sources: &'a ModulationSourceSet, events: Option<&'a mut LatencyProducer>) -> Self {
        Self {
            sources,
            events,
            chain: 0,
        }
    }

    /// Returns the modulation sources.
    #[inline]
    pub fn sources(&self) -> &ModulationSourceSet {
        self.sources
    }

    /// Returns the index of the chain being processed.
    #[inline]
    pub fn chain(&self) -> usize {
        self.chain
    }

    pub(crate) fn set_chain(&mut self, chain: usize) {
        self.chain = chain;
    }

    /// Reports a module latency change. Never blocks; drops the event if the
    /// queue is full.
    pub fn report_latency(&mut self, slot: usize, latency_samples: usize) {
        if let Some(events) = self.events.as_deref_mut() {
            let _ = events.push(LatencyEvent {
                chain: self.chain,
                slot,
                latency_samples,
            });
        }
    }
}
