//! Low Frequency Oscillator for parameter modulation.
//!
//! The graph advances each LFO once per block and reads the block's last
//! output, so [`Lfo::advance_block`] is the hot path.

use core::f32::consts::PI;
use libm::sinf;

/// LFO waveform type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    /// Smooth sine.
    #[default]
    Sine,
    /// Linear up/down ramps.
    Triangle,
    /// Rising ramp with abrupt reset.
    Saw,
    /// Binary on/off.
    Square,
    /// Random value held for one cycle.
    SampleAndHold,
}

impl LfoWaveform {
    /// All waveforms in index order.
    pub const ALL: [LfoWaveform; 5] = [
        LfoWaveform::Sine,
        LfoWaveform::Triangle,
        LfoWaveform::Saw,
        LfoWaveform::Square,
        LfoWaveform::SampleAndHold,
    ];

    /// Returns the waveform's stable index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Looks a waveform up by index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Phase-accumulating low frequency oscillator with output in \[-1.0, 1.0\].
///
/// # Example
///
/// ```rust
/// use braid_core::{Lfo, LfoWaveform};
///
/// let mut lfo = Lfo::new(48000.0, 2.0);
/// lfo.set_waveform(LfoWaveform::Triangle);
///
/// // Advance a 256-sample block, keep the last value.
/// let value = lfo.advance_block(256);
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Current phase position [0.0, 1.0)
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
    waveform: LfoWaveform,
    /// Phase the oscillator restarts from on reset.
    phase_offset: f32,
    sh_value: f32,
    /// xorshift state for sample & hold
    rng: u32,
    last_output: f32,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(48000.0, 1.0)
    }
}

impl Lfo {
    /// Creates an LFO at `freq_hz`.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: freq_hz / sample_rate,
            sample_rate,
            waveform: LfoWaveform::Sine,
            phase_offset: 0.0,
            sh_value: 0.0,
            rng: 0x9E37_79B9,
            last_output: 0.0,
        }
    }

    /// Sets the frequency in Hz.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.phase_inc = freq_hz / self.sample_rate;
    }

    /// Returns the frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.phase_inc * self.sample_rate
    }

    /// Sets the waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Returns the waveform.
    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }

    /// Sets the start phase (0.0 - 1.0) and jumps to it.
    ///
    /// 0.25 = 90°, 0.5 = 180°.
    pub fn set_phase_offset(&mut self, offset: f32) {
        let wrapped = libm::fmodf(offset, 1.0);
        self.phase_offset = if wrapped < 0.0 { wrapped + 1.0 } else { wrapped };
        self.phase = self.phase_offset;
    }

    /// Returns the start phase.
    pub fn phase_offset(&self) -> f32 {
        self.phase_offset
    }

    /// Returns the current phase (0.0 - 1.0).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Restarts at the phase offset.
    pub fn reset(&mut self) {
        self.phase = self.phase_offset;
        self.last_output = 0.0;
    }

    /// Changes the sample rate, keeping the frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        let freq = self.frequency();
        self.sample_rate = sample_rate;
        self.set_frequency(freq);
    }

    /// Returns the next value and advances one sample.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let output = match self.waveform {
            LfoWaveform::Sine => sinf(self.phase * 2.0 * PI),
            LfoWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
            LfoWaveform::Saw => 2.0 * self.phase - 1.0,
            LfoWaveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoWaveform::SampleAndHold => self.sh_value,
        };

        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
            if self.waveform == LfoWaveform::SampleAndHold {
                self.sh_value = self.next_random();
            }
        }

        self.last_output = output;
        output
    }

    /// Advances `num_samples` and returns the last value produced.
    ///
    /// Returns the previous output unchanged when `num_samples` is 0.
    pub fn advance_block(&mut self, num_samples: usize) -> f32 {
        for _ in 0..num_samples {
            self.next();
        }
        self.last_output
    }

    /// Returns the most recent output.
    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    fn next_random(&mut self) -> f32 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}
