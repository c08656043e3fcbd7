//! Core Effect trait.
//!
//! The [`Effect`] trait is the processing contract every stage of the routing
//! graph satisfies, whether a built-in gain stage or a hosted module.
//!
//! ## Design Decisions
//!
//! - **Block processing**: stages receive a whole multi-channel
//!   [`AudioBuffer`] in place. Chains process buffers, not samples.
//!
//! - **Object-safe**: the graph holds hosted modules as `Box<dyn ...>`.
//!
//! - **No allocations**: `process_block` and `reset` run on the audio thread.
//!   `prepare` runs on the control thread and may allocate.

use crate::{AudioBuffer, ProcessSetup};

/// Core trait for all audio stages.
///
/// # Example
///
/// ```rust
/// use braid_core::{AudioBuffer, Effect, ProcessSetup};
///
/// struct Invert;
///
/// impl Effect for Invert {
///     fn process_block(&mut self, buffer: &mut AudioBuffer) {
///         buffer.apply_gain(-1.0);
///     }
///
///     fn prepare(&mut self, _setup: &ProcessSetup) {}
///
///     fn reset(&mut self) {}
/// }
/// ```
pub trait Effect {
    /// Processes a block in place.
    ///
    /// The buffer's active length never exceeds the `block_size` passed to
    /// the most recent [`prepare`](Effect::prepare).
    fn process_block(&mut self, buffer: &mut AudioBuffer);

    /// Prepares for processing at the given sample rate, block size and
    /// channel count.
    ///
    /// Effects should recalculate any sample-rate-dependent coefficients and
    /// size internal buffers here.
    fn prepare(&mut self, setup: &ProcessSetup);

    /// Clears internal state (delay lines, filter history) without changing
    /// parameters.
    fn reset(&mut self);

    /// Reports processing latency in samples.
    ///
    /// May change between blocks; the graph polls it after every block and
    /// re-aligns parallel paths when it does. Default returns 0.
    fn latency_samples(&self) -> usize {
        0
    }
}
