//! Peak envelope follower.
//!
//! Drives the gain-stage meters and the envelope modulation sources.

use libm::expf;

/// Peak envelope follower with separate attack and release times.
///
/// # Example
///
/// ```rust
/// use braid_core::EnvelopeFollower;
///
/// let mut env = EnvelopeFollower::with_times(48000.0, 5.0, 200.0);
/// let level = env.process_block(&[0.5; 64]);
/// assert!(level > 0.0 && level <= 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    sample_rate: f32,
    attack_ms: f32,
    release_ms: f32,
}

impl EnvelopeFollower {
    /// Creates a follower with 10 ms attack and 100 ms release.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_times(sample_rate, 10.0, 100.0)
    }

    /// Creates a follower with the given attack and release times.
    pub fn with_times(sample_rate: f32, attack_ms: f32, release_ms: f32) -> Self {
        let mut follower = Self {
            envelope: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            sample_rate,
            attack_ms: attack_ms.max(0.1),
            release_ms: release_ms.max(1.0),
        };
        follower.recalculate_coefficients();
        follower
    }

    /// Sets the attack time in milliseconds (minimum 0.1 ms).
    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms.max(0.1);
        self.recalculate_coefficients();
    }

    /// Returns the attack time in milliseconds.
    pub fn attack_ms(&self) -> f32 {
        self.attack_ms
    }

    /// Sets the release time in milliseconds (minimum 1 ms).
    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.release_ms = release_ms.max(1.0);
        self.recalculate_coefficients();
    }

    /// Returns the release time in milliseconds.
    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    /// Updates the sample rate and recalculates coefficients.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coefficients();
    }

    /// Processes one sample and returns the envelope level.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let input_abs = input.abs();
        let coeff = if input_abs > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = coeff * self.envelope + (1.0 - coeff) * input_abs;
        self.envelope
    }

    /// Processes a block and returns the level after its last sample.
    pub fn process_block(&mut self, input: &[f32]) -> f32 {
        for &s in input {
            self.process(s);
        }
        self.envelope
    }

    /// Returns the current level without processing new input.
    pub fn level(&self) -> f32 {
        self.envelope
    }

    /// Resets the level to zero.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }

    fn recalculate_coefficients(&mut self) {
        // coeff = exp(-1 / (time_ms * sample_rate / 1000))
        self.attack_coeff = expf(-1.0 / (self.attack_ms * self.sample_rate / 1000.0));
        self.release_coeff = expf(-1.0 / (self.release_ms * self.sample_rate / 1000.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_rises_toward_input() {
        let mut env = EnvelopeFollower::with_times(48000.0, 1.0, 100.0);
        let level = env.process_block(&[1.0; 4800]);
        assert!(level > 0.99, "level {level}");
    }

    #[test]
    fn test_release_decays() {
        let mut env = EnvelopeFollower::with_times(48000.0, 1.0, 10.0);
        env.process_block(&[1.0; 4800]);
        let level = env.process_block(&[0.0; 4800]);
        assert!(level < 0.01, "level {level}");
    }

    #[test]
    fn test_negative_input_tracked_as_magnitude() {
        let mut env = EnvelopeFollower::new(48000.0);
        assert!(env.process(-1.0) > 0.0);
    }

    #[test]
    fn test_minimum_times() {
        let mut env = EnvelopeFollower::new(48000.0);
        env.set_attack_ms(0.0);
        env.set_release_ms(0.0);
        assert_eq!(env.attack_ms(), 0.1);
        assert_eq!(env.release_ms(), 1.0);
    }

    #[test]
    fn test_reset() {
        let mut env = EnvelopeFollower::new(48000.0);
        env.process_block(&[1.0; 64]);
        env.reset();
        assert_eq!(env.level(), 0.0);
    }
}
