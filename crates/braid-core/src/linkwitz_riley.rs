//! Linkwitz-Riley 4th-order crossover filters.
//!
//! An LR4 low-pass or high-pass is a Butterworth biquad applied twice. A
//! matched LR4 pair sums to a 2nd-order all-pass at the same frequency, so
//! [`FilterKind::Allpass`] is a single RBJ all-pass stage: feeding a band
//! through it gives that band the same phase as a split it did not take.

use crate::MAX_CHANNELS;
use crate::biquad::{Biquad, allpass_coefficients, highpass_coefficients, lowpass_coefficients};

/// Butterworth Q (1/sqrt 2).
const BUTTERWORTH_Q: f32 = core::f32::consts::FRAC_1_SQRT_2;

/// Response of a [`LinkwitzRiley`] filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// 24 dB/oct low-pass.
    Lowpass,
    /// 24 dB/oct high-pass.
    Highpass,
    /// Phase corrector matching an LR4 pair.
    Allpass,
}

/// Multi-channel Linkwitz-Riley filter.
///
/// Holds independent state for up to [`MAX_CHANNELS`] channels.
#[derive(Debug, Clone)]
pub struct LinkwitzRiley {
    kind: FilterKind,
    frequency: f32,
    sample_rate: f32,
    stages: [[Biquad; 2]; MAX_CHANNELS],
}

impl LinkwitzRiley {
    /// Creates a filter of the given kind at `frequency` Hz.
    pub fn new(kind: FilterKind, frequency: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            kind,
            frequency,
            sample_rate,
            stages: Default::default(),
        };
        filter.update_coefficients();
        filter
    }

    /// Returns the filter's response.
    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    /// Returns the crossover frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Moves the crossover frequency. Filter state is kept.
    pub fn set_frequency(&mut self, frequency: f32) {
        if frequency != self.frequency {
            self.frequency = frequency;
            self.update_coefficients();
        }
    }

    /// Changes the sample rate and clears state.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
        self.reset();
    }

    fn update_coefficients(&mut self) {
        // Keep the cutoff strictly below Nyquist so the biquad stays stable.
        let nyquist = self.sample_rate * 0.5;
        let freq = self.frequency.clamp(1.0, nyquist * 0.999);
        let coeffs = match self.kind {
            FilterKind::Lowpass => lowpass_coefficients(freq, BUTTERWORTH_Q, self.sample_rate),
            FilterKind::Highpass => highpass_coefficients(freq, BUTTERWORTH_Q, self.sample_rate),
            FilterKind::Allpass => allpass_coefficients(freq, BUTTERWORTH_Q, self.sample_rate),
        };
        for channel in &mut self.stages {
            channel[0].set(coeffs);
            if self.kind == FilterKind::Allpass {
                channel[1] = Biquad::new();
            } else {
                channel[1].set(coeffs);
            }
        }
    }

    /// Filters one sample of `channel`.
    #[inline]
    pub fn process(&mut self, channel: usize, input: f32) -> f32 {
        let [first, second] = &mut self.stages[channel];
        let y = first.process(input);
        if self.kind == FilterKind::Allpass {
            y
        } else {
            second.process(y)
        }
    }

    /// Filters a block of `channel` in place.
    ///
    /// Channels beyond [`MAX_CHANNELS`] are left untouched.
    pub fn process_block(&mut self, channel: usize, samples: &mut [f32]) {
        if channel >= MAX_CHANNELS {
            return;
        }
        for s in samples {
            *s = self.process(channel, *s);
        }
    }

    /// Clears filter state on every channel.
    pub fn reset(&mut self) {
        for channel in &mut self.stages {
            for stage in channel {
                stage.clear();
            }
        }
    }
}
