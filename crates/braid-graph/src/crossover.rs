//! Multiband crossover: splits a signal into N bands at N−1 points.
//!
//! Bands are formed as a tree of Linkwitz-Riley splits:
//!
//! ```text
//! band 0     = LP(f0)
//! band k     = HP(f0) … HP(f_{k−1}) · LP(f_k)
//! top band   = HP(f0) … HP(f_{n−2})
//! ```
//!
//! A band that leaves the tree at point k has not seen the LR4 phase shift
//! of points k+1 and above, so it is passed through an all-pass at each of
//! those points. With that correction the bands sum to an all-pass: flat
//! magnitude.
//!
//! Points are kept in non-decreasing frequency order at all times.

use braid_core::{AudioBuffer, FilterKind, LinkwitzRiley};

/// Lowest crossover frequency in Hz.
pub const MIN_CROSSOVER_HZ: f32 = 20.0;

/// Highest crossover frequency in Hz.
pub const MAX_CROSSOVER_HZ: f32 = 20_000.0;

/// Frequency of the single point of a fresh two-band crossover.
pub const DEFAULT_CROSSOVER_HZ: f32 = 1_000.0;

/// Solo/mute state of one band, mirrored from its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    /// False when another band is soloed and this one is not.
    pub is_active: bool,
    /// Mirrors the chain's mute flag.
    pub is_muted: bool,
    /// Mirrors the chain's solo flag.
    pub is_soloed: bool,
}

impl Default for Band {
    fn default() -> Self {
        Self {
            is_active: true,
            is_muted: false,
            is_soloed: false,
        }
    }
}

#[derive(Debug, Clone)]
struct CrossoverPoint {
    lowpass: LinkwitzRiley,
    highpass: LinkwitzRiley,
}

impl CrossoverPoint {
    fn new(frequency: f32, sample_rate: f32) -> Self {
        Self {
            lowpass: LinkwitzRiley::new(FilterKind::Lowpass, frequency, sample_rate),
            highpass: LinkwitzRiley::new(FilterKind::Highpass, frequency, sample_rate),
        }
    }

    fn frequency(&self) -> f32 {
        self.lowpass.frequency()
    }

    fn set_frequency(&mut self, frequency: f32) {
        self.lowpass.set_frequency(frequency);
        self.highpass.set_frequency(frequency);
    }
}

/// Linkwitz-Riley filter bank with phase-corrected bands.
#[derive(Debug, Clone)]
pub struct Crossover {
    points: Vec<CrossoverPoint>,
    /// `allpasses[k][m]` corrects band `k` for point `k + 1 + m`.
    allpasses: Vec<Vec<LinkwitzRiley>>,
    bands: Vec<Band>,
    sample_rate: f32,
}

impl Crossover {
    /// Creates a two-band crossover split at [`DEFAULT_CROSSOVER_HZ`].
    pub fn new(sample_rate: f32) -> Self {
        let mut crossover = Self {
            points: vec![CrossoverPoint::new(DEFAULT_CROSSOVER_HZ, sample_rate)],
            allpasses: Vec::new(),
            bands: vec![Band::default(); 2],
            sample_rate,
        };
        crossover.rebuild_allpasses();
        crossover
    }

    /// Returns the number of bands (points + 1).
    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    /// Returns the band states.
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Returns the frequency of point `index`.
    pub fn frequency(&self, index: usize) -> Option<f32> {
        self.points.get(index).map(CrossoverPoint::frequency)
    }

    /// Returns all point frequencies in ascending order.
    pub fn frequencies(&self) -> Vec<f32> {
        self.points.iter().map(CrossoverPoint::frequency).collect()
    }

    /// Appends a band above the current highest one.
    ///
    /// The new point goes halfway between the highest point and the ceiling.
    /// If the highest point already sits at the ceiling it is first pulled
    /// down to halfway between its lower neighbour (or the floor) and the
    /// ceiling, and the new point takes the ceiling.
    pub fn add_band(&mut self) {
        let count = self.points.len();
        let highest = self.points[count - 1].frequency();
        let frequency = if highest >= MAX_CROSSOVER_HZ {
            let lower = if count >= 2 {
                self.points[count - 2].frequency()
            } else {
                MIN_CROSSOVER_HZ
            };
            self.points[count - 1].set_frequency((lower + MAX_CROSSOVER_HZ) * 0.5);
            MAX_CROSSOVER_HZ
        } else {
            (highest + MAX_CROSSOVER_HZ) * 0.5
        };
        self.points.push(CrossoverPoint::new(frequency, self.sample_rate));
        self.bands.push(Band::default());
        self.rebuild_allpasses();
        self.refresh_active();
        tracing::debug!(num_bands = self.bands.len(), frequency, "crossover band added");
    }

    /// Removes the highest band. Refused below two bands.
    pub fn remove_band(&mut self) -> bool {
        if self.bands.len() <= 2 {
            return false;
        }
        self.points.pop();
        self.bands.pop();
        self.rebuild_allpasses();
        self.refresh_active();
        tracing::debug!(num_bands = self.bands.len(), "crossover band removed");
        true
    }

    /// Moves point `index` to `frequency`, clamped to the crossover range.
    ///
    /// Neighbours that would end up out of order are dragged along to the
    /// new value. Returns `false` for an unknown point or a NaN frequency.
    pub fn set_crossover_frequency(&mut self, index: usize, frequency: f32) -> bool {
        if index >= self.points.len() || frequency.is_nan() {
            return false;
        }
        let frequency = frequency.clamp(MIN_CROSSOVER_HZ, MAX_CROSSOVER_HZ);
        self.points[index].set_frequency(frequency);
        for point in &mut self.points[index + 1..] {
            if point.frequency() >= frequency {
                break;
            }
            point.set_frequency(frequency);
        }
        for point in self.points[..index].iter_mut().rev() {
            if point.frequency() <= frequency {
                break;
            }
            point.set_frequency(frequency);
        }
        self.sync_allpass_frequencies();
        true
    }

    /// Applies a list of frequencies by index. Extra entries are ignored;
    /// missing ones leave their point where it is.
    pub fn set_frequencies(&mut self, frequencies: &[f32]) {
        for (index, &frequency) in frequencies.iter().enumerate().take(self.points.len()) {
            self.set_crossover_frequency(index, frequency);
        }
    }

    /// Mirrors a chain's solo/mute flags onto band `index`.
    pub fn set_band_state(&mut self, index: usize, is_soloed: bool, is_muted: bool) -> bool {
        let Some(band) = self.bands.get_mut(index) else {
            return false;
        };
        band.is_soloed = is_soloed;
        band.is_muted = is_muted;
        self.refresh_active();
        true
    }

    /// Changes the sample rate and clears all filter state.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        for point in &mut self.points {
            point.lowpass.set_sample_rate(sample_rate);
            point.highpass.set_sample_rate(sample_rate);
        }
        for filter in self.allpasses.iter_mut().flatten() {
            filter.set_sample_rate(sample_rate);
        }
    }

    /// Clears all filter state.
    pub fn reset(&mut self) {
        for point in &mut self.points {
            point.lowpass.reset();
            point.highpass.reset();
        }
        for filter in self.allpasses.iter_mut().flatten() {
            filter.reset();
        }
    }

    /// Splits `input` into `bands[..num_bands()]`.
    ///
    /// Every band buffer must have at least `input`'s channel count and
    /// capacity. Inactive or muted bands come out silent.
    pub fn process(&mut self, input: &AudioBuffer, bands: &mut [AudioBuffer]) {
        let n = self.bands.len();
        if bands.len() < n {
            return;
        }
        let (lower, upper) = bands[..n].split_at_mut(n - 1);
        // The top band buffer carries the not-yet-split remainder.
        let remaining = &mut upper[0];
        remaining.copy_from(input);
        let channels = remaining.num_channels();

        for (k, band) in lower.iter_mut().enumerate() {
            band.copy_from(remaining);
            let point = &mut self.points[k];
            for ch in 0..channels {
                point.lowpass.process_block(ch, band.channel_mut(ch));
                point.highpass.process_block(ch, remaining.channel_mut(ch));
                for allpass in &mut self.allpasses[k] {
                    allpass.process_block(ch, band.channel_mut(ch));
                }
            }
        }

        for (buffer, band) in bands.iter_mut().zip(&self.bands) {
            if !band.is_active || band.is_muted {
                buffer.clear();
            }
        }
    }

    fn refresh_active(&mut self) {
        let any_soloed = self.bands.iter().any(|b| b.is_soloed);
        for band in &mut self.bands {
            band.is_active = !any_soloed || band.is_soloed;
        }
    }

    fn rebuild_allpasses(&mut self) {
        let sample_rate = self.sample_rate;
        let points = &self.points;
        self.allpasses = (0..points.len())
            .map(|k| {
                points[k + 1..]
                    .iter()
                    .map(|p| LinkwitzRiley::new(FilterKind::Allpass, p.frequency(), sample_rate))
                    .collect()
            })
            .collect();
    }

    fn sync_allpass_frequencies(&mut self) {
        for (k, correctors) in self.allpasses.iter_mut().enumerate() {
            for (filter, point) in correctors.iter_mut().zip(&self.points[k + 1..]) {
                filter.set_frequency(point.frequency());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_ordered(c: &Crossover) -> bool {
        c.frequencies().windows(2).all(|w| w[0] <= w[1])
    }

    #[test]
    fn new_crossover_has_two_bands() {
        let c = Crossover::new(48000.0);
        assert_eq!(c.num_bands(), 2);
        assert_eq!(c.frequencies(), vec![DEFAULT_CROSSOVER_HZ]);
    }

    #[test]
    fn add_band_uses_midpoint_to_ceiling() {
        let mut c = Crossover::new(48000.0);
        c.add_band();
        assert_eq!(c.num_bands(), 3);
        assert_eq!(c.frequencies(), vec![1000.0, 10500.0]);
    }

    #[test]
    fn add_band_at_ceiling_pulls_highest_point_down() {
        let mut c = Crossover::new(48000.0);
        assert!(c.set_crossover_frequency(0, 25_000.0));
        assert_eq!(c.frequency(0), Some(MAX_CROSSOVER_HZ));
        c.add_band();
        assert_eq!(c.frequencies(), vec![10010.0, MAX_CROSSOVER_HZ]);

        c.add_band();
        assert_eq!(c.frequencies(), vec![10010.0, 15005.0, MAX_CROSSOVER_HZ]);
    }

    #[test]
    fn remove_band_refuses_below_two() {
        let mut c = Crossover::new(48000.0);
        assert!(!c.remove_band());
        c.add_band();
        assert!(c.remove_band());
        assert_eq!(c.num_bands(), 2);
    }

    #[test]
    fn moving_a_point_cascades_neighbours() {
        let mut c = Crossover::new(48000.0);
        c.add_band();
        c.add_band();
        assert!(c.set_crossover_frequency(0, 18_000.0));
        assert!(is_ordered(&c));
        assert_eq!(c.frequency(1), Some(18_000.0));

        assert!(c.set_crossover_frequency(2, 5.0));
        assert!(is_ordered(&c));
        assert_eq!(c.frequencies(), vec![MIN_CROSSOVER_HZ; 3]);
    }

    #[test]
    fn invalid_point_is_rejected() {
        let mut c = Crossover::new(48000.0);
        assert!(!c.set_crossover_frequency(1, 500.0));
        assert!(!c.set_crossover_frequency(0, f32::NAN));
        assert_eq!(c.frequency(0), Some(DEFAULT_CROSSOVER_HZ));
    }

    #[test]
    fn set_frequencies_repairs_order() {
        let mut c = Crossover::new(48000.0);
        c.add_band();
        c.set_frequencies(&[5000.0, 1000.0, 7.0]);
        assert!(is_ordered(&c));
        assert_eq!(c.frequency(1), Some(1000.0));
    }

    #[test]
    fn bands_sum_to_unit_energy() {
        let mut c = Crossover::new(48000.0);
        c.add_band();
        c.add_band();
        let len = 16384;
        let mut input = AudioBuffer::new(1, len);
        input.channel_mut(0)[0] = 1.0;
        let mut bands: Vec<AudioBuffer> = (0..c.num_bands()).map(|_| AudioBuffer::new(1, len)).collect();
        c.process(&input, &mut bands);

        let energy: f32 = (0..len)
            .map(|i| bands.iter().map(|b| b.channel(0)[i]).sum::<f32>())
            .map(|s| s * s)
            .sum();
        assert!((energy - 1.0).abs() < 1e-2, "energy {energy}");
    }

    #[test]
    fn soloed_band_silences_others() {
        let mut c = Crossover::new(48000.0);
        assert!(c.set_band_state(1, true, false));
        assert!(!c.bands()[0].is_active);
        assert!(c.bands()[1].is_active);

        let mut input = AudioBuffer::new(2, 64);
        input.channel_mut(0).fill(1.0);
        let mut bands = vec![AudioBuffer::new(2, 64), AudioBuffer::new(2, 64)];
        c.process(&input, &mut bands);
        assert!(bands[0].channel(0).iter().all(|&s| s == 0.0));
        assert!(bands[1].channel(0).iter().any(|&s| s != 0.0));
    }
}
