//! Mathematical utility functions for DSP.
//!
//! Allocation-free helpers shared by the filter, BBD, and gain stages.

use libm::{expf, logf};

/// Flush denormal numbers to zero.
///
/// Denormals (values below ~1e-38) cause massive CPU spikes on most
/// architectures. Recursive filters decay into the denormal range when fed
/// silence, so every stateful one-pole flushes its state through this.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use calliope_core::db_to_linear;
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

/// Convert linear gain to decibels.
///
/// Input is floored at 1e-10 to keep the logarithm finite.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_roundtrip() {
        for db in [-40.0, -12.0, -6.0, 0.0, 6.0, 12.0] {
            let back = linear_to_db(db_to_linear(db));
            assert!((back - db).abs() < 0.01, "{db} dB round-tripped to {back}");
        }
    }

    #[test]
    fn denormals_flushed() {
        assert_eq!(flush_denormal(1e-30), 0.0);
        assert_eq!(flush_denormal(-1e-30), 0.0);
        assert_eq!(flush_denormal(0.5), 0.5);
        assert_eq!(flush_denormal(-0.5), -0.5);
    }
}
