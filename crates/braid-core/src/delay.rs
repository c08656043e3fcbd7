//! Latency-compensation delay line.
//!
//! A [`CompensationDelay`] delays every channel of a block by a whole number
//! of samples so that parallel chains with different processing latencies
//! reach the output aligned. The delay is resized from the control thread;
//! processing never allocates.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::AudioBuffer;

/// Multi-channel integer-sample delay ring buffer.
#[derive(Debug, Clone)]
pub struct CompensationDelay {
    lines: Vec<Vec<f32>>,
    write_pos: usize,
    delay_samples: usize,
}

impl CompensationDelay {
    /// Creates a delay line for `num_channels` channels delaying by `delay_samples`.
    ///
    /// A delay of 0 is a no-op.
    pub fn new(num_channels: usize, delay_samples: usize) -> Self {
        let len = delay_samples.max(1);
        Self {
            lines: (0..num_channels).map(|_| vec![0.0; len]).collect(),
            write_pos: 0,
            delay_samples,
        }
    }

    /// Returns the delay in samples.
    pub fn delay_samples(&self) -> usize {
        self.delay_samples
    }

    /// Returns the number of channels the line carries.
    pub fn num_channels(&self) -> usize {
        self.lines.len()
    }

    /// Changes the delay, reallocating and clearing the line when it changes.
    ///
    /// Returns `true` if the delay was changed. Allocates; control thread only.
    pub fn set_delay(&mut self, delay_samples: usize) -> bool {
        if delay_samples == self.delay_samples {
            return false;
        }
        let len = delay_samples.max(1);
        for line in &mut self.lines {
            line.clear();
            line.resize(len, 0.0);
        }
        self.write_pos = 0;
        self.delay_samples = delay_samples;
        #[cfg(feature = "tracing")]
        tracing::debug!(delay_samples, "compensation delay resized");
        true
    }

    /// Changes the channel count, clearing the line.
    pub fn set_num_channels(&mut self, num_channels: usize) {
        let len = self.delay_samples.max(1);
        self.lines.resize_with(num_channels, || vec![0.0; len]);
        self.clear();
    }

    /// Delays every channel of `buffer` in place.
    ///
    /// Channels beyond the line's channel count pass through unchanged.
    pub fn process_block_inplace(&mut self, buffer: &mut AudioBuffer) {
        if self.delay_samples == 0 {
            return;
        }
        let n = buffer.num_samples();
        let channels = self.lines.len().min(buffer.num_channels());
        let start = self.write_pos;
        for ch in 0..channels {
            let line = &mut self.lines[ch];
            let samples = buffer.channel_mut(ch);
            let mut pos = start;
            for s in samples.iter_mut().take(n) {
                let out = line[pos];
                line[pos] = *s;
                *s = out;
                pos = (pos + 1) % self.delay_samples;
            }
        }
        self.write_pos = (start + n) % self.delay_samples;
    }

    /// Clears the delay line to silence.
    pub fn clear(&mut self) {
        for line in &mut self.lines {
            line.fill(0.0);
        }
        self.write_pos = 0;
    }
}
