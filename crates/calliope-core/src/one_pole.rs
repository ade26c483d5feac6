//! One-pole lowpass filter.
//!
//! A single-pole IIR lowpass with the difference equation:
//!
//! ```text
//! y[n] = x[n] + coeff * (y[n-1] - x[n])
//! ```
//!
//! where `coeff = exp(-2π * freq / sample_rate)`. 6 dB/octave rolloff,
//! one multiply per sample. Used here for the BBD companion filtering and
//! as the lowpass half of the engine's first-order high-pass stage
//! (`highpass = x - lowpass(x)`).
//!
//! # Reference
//!
//! Julius O. Smith III, "Introduction to Digital Filters with Audio
//! Applications", Section: One-Pole Filter.

use crate::flush_denormal;
use libm::expf;

/// One-pole (6 dB/oct) lowpass filter.
///
/// # Invariants
///
/// - `coeff` stays in [0, 1) for stable operation
/// - `state` is flushed to zero when below 1e-20 (denormal protection)
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    coeff: f32,
    sample_rate: f32,
    freq: f32,
}

impl OnePole {
    /// Create a new one-pole lowpass.
    ///
    /// `freq_hz` is the -3 dB corner, valid from 20 Hz to Nyquist.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            coeff: 0.0,
            sample_rate,
            freq: freq_hz,
        };
        filter.recalculate_coeff();
        filter
    }

    /// Set the corner frequency and recalculate the coefficient.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.freq = freq_hz;
        self.recalculate_coeff();
    }

    /// Current corner frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.freq
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(input + self.coeff * (self.state - input));
        self.state
    }

    /// Reset filter state to zero.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }

    /// Update sample rate and recalculate the coefficient.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    fn recalculate_coeff(&mut self) {
        self.coeff = expf(-core::f32::consts::TAU * self.freq / self.sample_rate);
    }
}
