//! Level and channel math helpers.
//!
//! All functions are allocation-free and `no_std`.

use libm::expf;

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use braid_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Sum stereo to mono (average). This is the mid signal of a mid/side pair.
#[inline]
pub fn mono_sum(left: f32, right: f32) -> f32 {
    (left + right) * 0.5
}

/// Balance-law pan gains `(left, right)` for `pan` in \[-1, 1\].
///
/// Center is unity on both sides; panning attenuates the opposite side
/// linearly down to silence at the extreme.
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(-1.0, 1.0);
    ((1.0 - pan).min(1.0), (1.0 + pan).min(1.0))
}
