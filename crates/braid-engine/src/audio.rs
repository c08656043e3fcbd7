//! Audio-thread entry point.

use std::sync::Arc;

use braid_core::AudioBuffer;
use braid_graph::{LatencyProducer, ModulationSourceSet, ProcessContext, Splitter};
use parking_lot::Mutex;

/// Everything the audio thread touches while rendering a block.
pub(crate) struct RenderState {
    pub(crate) splitter: Splitter,
    pub(crate) sources: ModulationSourceSet,
    pub(crate) latency_events: LatencyProducer,
}

/// Renders blocks through the graph owned by a
/// [`ControlFacade`](crate::ControlFacade).
///
/// Cheap to create; hand one to the audio callback. Never blocks: if the
/// control thread is editing the graph, the block is skipped and left as it
/// was.
pub struct AudioHandle {
    state: Arc<Mutex<RenderState>>,
}

impl AudioHandle {
    pub(crate) fn new(state: Arc<Mutex<RenderState>>) -> Self {
        Self { state }
    }

    /// Advances the modulation sources and routes `buffer` through the
    /// graph in place.
    ///
    /// Returns `false` without touching `buffer` when the render state is
    /// locked by a structural edit.
    pub fn render(&mut self, buffer: &mut AudioBuffer, sidechain: Option<&AudioBuffer>) -> bool {
        let Some(mut guard) = self.state.try_lock() else {
            return false;
        };
        let RenderState {
            splitter,
            sources,
            latency_events,
        } = &mut *guard;
        sources.process(buffer, sidechain);
        let mut ctx = ProcessContext::new(sources, Some(latency_events));
        splitter.process(buffer, &mut ctx);
        true
    }
}
