//! Multi-channel audio blocks for the routing graph.
//!
//! An [`AudioBuffer`] owns one `Vec<f32>` per channel, allocated once with a
//! fixed capacity. The number of *active* samples can change per block without
//! reallocating, so scratch buffers sized at prepare time stay allocation-free
//! on the audio thread.
//!
//! [`ProcessSetup`] carries the values every stage needs to prepare itself:
//! sample rate, maximum block size and the bus channel count.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

/// Maximum number of channels a bus can carry (stereo).
pub const MAX_CHANNELS: usize = 2;

/// Processing configuration shared by every stage of the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSetup {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Maximum number of samples per processing block.
    pub block_size: usize,
    /// Bus channel count (1 or 2).
    pub num_channels: usize,
}

impl ProcessSetup {
    /// Creates a setup, clamping the channel count into `1..=MAX_CHANNELS`.
    pub fn new(sample_rate: f32, block_size: usize, num_channels: usize) -> Self {
        Self {
            sample_rate,
            block_size,
            num_channels: num_channels.clamp(1, MAX_CHANNELS),
        }
    }

    /// Returns true for a two-channel bus.
    #[inline]
    pub fn is_stereo(&self) -> bool {
        self.num_channels == 2
    }
}

impl Default for ProcessSetup {
    fn default() -> Self {
        Self::new(48000.0, 512, 2)
    }
}

/// A block of audio with one buffer per channel.
///
/// `capacity` is the allocated length of every channel; `num_samples` is the
/// active length, always `<= capacity`. All slice accessors expose only the
/// active part.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    num_samples: usize,
}

impl AudioBuffer {
    /// Creates a zeroed buffer with `num_channels` channels of `capacity` samples.
    ///
    /// The active length starts at `capacity`.
    pub fn new(num_channels: usize, capacity: usize) -> Self {
        Self {
            channels: (0..num_channels).map(|_| vec![0.0; capacity]).collect(),
            num_samples: capacity,
        }
    }

    /// Builds a buffer from per-channel sample vectors.
    ///
    /// All channels are truncated to the shortest one.
    pub fn from_channels(mut channels: Vec<Vec<f32>>) -> Self {
        let len = channels.iter().map(Vec::len).min().unwrap_or(0);
        for ch in &mut channels {
            ch.truncate(len);
        }
        Self {
            channels,
            num_samples: len,
        }
    }

    /// Returns the number of channels.
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Returns the number of active samples per channel.
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Returns the allocated length of each channel.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Sets the active length, clamped to the capacity. Never allocates.
    #[inline]
    pub fn set_num_samples(&mut self, num_samples: usize) {
        self.num_samples = num_samples.min(self.capacity());
    }

    /// Reallocates to a new channel count and capacity, zeroing all samples.
    ///
    /// Allocates; call from the control thread only.
    pub fn resize(&mut self, num_channels: usize, capacity: usize) {
        self.channels.resize_with(num_channels, Vec::new);
        for ch in &mut self.channels {
            ch.clear();
            ch.resize(capacity, 0.0);
        }
        self.num_samples = capacity;
    }

    /// Returns the active samples of one channel.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= num_channels()`.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel][..self.num_samples]
    }

    /// Returns the active samples of one channel, mutably.
    ///
    /// # Panics
    ///
    /// Panics if `channel >= num_channels()`.
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let n = self.num_samples;
        &mut self.channels[channel][..n]
    }

    /// Returns both channels of a stereo buffer mutably, or `None` for mono.
    pub fn stereo_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
        let n = self.num_samples;
        match self.channels.as_mut_slice() {
            [left, right, ..] => Some((&mut left[..n], &mut right[..n])),
            _ => None,
        }
    }

    /// Fills every channel with zeros.
    pub fn clear(&mut self) {
        let n = self.num_samples;
        for ch in &mut self.channels {
            ch[..n].fill(0.0);
        }
    }

    /// Zeroes a single channel. Out-of-range channels are ignored.
    pub fn clear_channel(&mut self, channel: usize) {
        let n = self.num_samples;
        if let Some(ch) = self.channels.get_mut(channel) {
            ch[..n].fill(0.0);
        }
    }

    /// Copies another buffer's active samples into this one.
    ///
    /// The active length becomes `min(other.num_samples(), capacity())`.
    /// Channels missing from `other` are zeroed.
    pub fn copy_from(&mut self, other: &AudioBuffer) {
        self.set_num_samples(other.num_samples);
        let n = self.num_samples;
        for (i, dst) in self.channels.iter_mut().enumerate() {
            match other.channels.get(i) {
                Some(src) => dst[..n].copy_from_slice(&src[..n]),
                None => dst[..n].fill(0.0),
            }
        }
    }

    /// Adds another buffer's contents sample-by-sample (mix/accumulate).
    pub fn accumulate_from(&mut self, other: &AudioBuffer) {
        let n = self.num_samples.min(other.num_samples);
        for (dst, src) in self.channels.iter_mut().zip(other.channels.iter()) {
            for (d, s) in dst[..n].iter_mut().zip(src[..n].iter()) {
                *d += *s;
            }
        }
    }

    /// Multiplies every active sample by `gain`.
    pub fn apply_gain(&mut self, gain: f32) {
        let n = self.num_samples;
        for ch in &mut self.channels {
            for s in &mut ch[..n] {
                *s *= gain;
            }
        }
    }
}
