//! Bucket-brigade delay line with companion filtering.
//!
//! A bucket-brigade device (BBD) is an analog delay chip: a chain of
//! charge-transfer stages clocked at some rate, so the delay time equals
//! `stages / (2 * clock)`. This module models the audible consequences of
//! that construction rather than the electronics:
//!
//! - a circular buffer of discrete "bucket" samples read with a
//!   continuously varying, linearly interpolated fractional offset
//!   (a slowly moving read tap pitch-shifts the delayed signal, which is
//!   the entire basis of chorus coloration),
//! - a fixed companion lowpass on the way in and out, standing in for the
//!   anti-alias and reconstruction filters that bracket a real BBD and
//!   give it its characteristic treble loss,
//! - a clock-noise floor far below signal level, from the charge transfer
//!   inefficiency of the chain.
//!
//! The read offset is driven externally (the chorus owns the modulator);
//! this type knows nothing about notes, envelopes, or block boundaries.
//! It is a pure signal transform: `process(sample) -> sample`.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use crate::one_pole::OnePole;

/// Corner frequency of the companion filters, Hz. BBD chips ship with
/// steep anti-alias filtering around this corner; a one-pole pair on each
/// side of the chain approximates the combined treble loss.
const COMPANION_CORNER_HZ: f32 = 8000.0;

/// Clock-noise floor amplitude, ~-78 dBFS.
const CLOCK_NOISE_LEVEL: f32 = 1.25e-4;

/// Bucket-brigade delay line: interpolated ring buffer plus companion
/// filters.
///
/// # Memory
///
/// The bucket buffer is heap-allocated at construction and never
/// reallocates; `process` is allocation-free.
///
/// # Example
///
/// ```rust
/// use calliope_core::BbdDelayLine;
///
/// let mut bbd = BbdDelayLine::new(512, 44100.0);
/// bbd.set_delay_samples(96.5);
/// let out = bbd.process(1.0);
/// ```
#[derive(Debug, Clone)]
pub struct BbdDelayLine {
    buckets: Vec<f32>,
    write_pos: usize,
    delay_samples: f32,
    input_filter: OnePole,
    output_filter: OnePole,
    noise_state: u32,
}

impl BbdDelayLine {
    /// Create a delay line with the given bucket count.
    ///
    /// # Panics
    ///
    /// Panics if `max_delay_samples` is 0.
    pub fn new(max_delay_samples: usize, sample_rate: f32) -> Self {
        assert!(max_delay_samples > 0, "BBD size must be > 0");
        Self {
            buckets: vec![0.0; max_delay_samples],
            write_pos: 0,
            delay_samples: 0.0,
            input_filter: OnePole::new(sample_rate, COMPANION_CORNER_HZ),
            output_filter: OnePole::new(sample_rate, COMPANION_CORNER_HZ),
            noise_state: 0x2545_f491,
        }
    }

    /// Create a delay line from sample rate and maximum delay in seconds.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        let max_samples = (sample_rate * max_seconds) as usize + 1;
        Self::new(max_samples, sample_rate)
    }

    /// Set the current read offset in samples (fractional).
    ///
    /// Clamped to the bucket capacity. The caller varies this slowly;
    /// the line does not smooth it further.
    #[inline]
    pub fn set_delay_samples(&mut self, samples: f32) {
        self.delay_samples = samples.clamp(0.0, (self.buckets.len() - 1) as f32);
    }

    /// Current read offset in samples.
    pub fn delay_samples(&self) -> f32 {
        self.delay_samples
    }

    /// Maximum delay capacity in samples.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Push one sample through the delay chain.
    ///
    /// Input passes the entry companion filter, lands in the bucket ring,
    /// and the delayed output is read at the current fractional offset,
    /// filtered again and overlaid with the clock-noise floor.
    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let len = self.buckets.len();

        self.buckets[self.write_pos] = self.input_filter.process(sample);
        self.write_pos = (self.write_pos + 1) % len;

        let delay_int = self.delay_samples as usize;
        let frac = self.delay_samples - delay_int as f32;

        // Sample written `delay_int` samples ago, relative to the slot
        // just written.
        let read_pos = (self.write_pos + len - delay_int - 1) % len;
        let next_pos = (read_pos + len - 1) % len;
        let a = self.buckets[read_pos];
        let b = self.buckets[next_pos];
        let delayed = a + (b - a) * frac;

        let noise = self.next_noise();
        self.output_filter.process(delayed + noise * CLOCK_NOISE_LEVEL)
    }

    /// Clear all buckets and filter state.
    pub fn clear(&mut self) {
        self.buckets.fill(0.0);
        self.write_pos = 0;
        self.input_filter.reset();
        self.output_filter.reset();
    }

    /// Update sample rate on the companion filters.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.input_filter.set_sample_rate(sample_rate);
        self.output_filter.set_sample_rate(sample_rate);
    }

    #[inline]
    fn next_noise(&mut self) -> f32 {
        // Xorshift32
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;
        (x as i32 as f32) / (i32::MAX as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_by_integer_offset() {
        let mut bbd = BbdDelayLine::new(64, 44100.0);
        bbd.set_delay_samples(10.0);

        // Feed an impulse, then silence
        let mut peak_at = None;
        let first = bbd.process(1.0);
        assert!(first.abs() < 0.5, "Impulse should not appear instantly");
        for i in 1..40 {
            let out = bbd.process(0.0);
            if out.abs() > 0.3 && peak_at.is_none() {
                peak_at = Some(i);
            }
        }

        // Companion filter smears the impulse by a couple of samples
        let peak = peak_at.expect("Delayed impulse should emerge");
        assert!(
            (9..=13).contains(&peak),
            "Impulse expected near 10 samples, got {peak}"
        );
    }

    #[test]
    fn fractional_offset_interpolates() {
        let mut bbd = BbdDelayLine::new(64, 44100.0);
        bbd.set_delay_samples(5.5);

        // A slow ramp survives interpolation without discontinuities
        let mut prev = bbd.process(0.0);
        let mut max_step = 0.0f32;
        for i in 1..200 {
            let out = bbd.process(i as f32 / 200.0);
            max_step = max_step.max((out - prev).abs());
            prev = out;
        }
        assert!(max_step < 0.05, "Ramp through BBD jumped by {max_step}");
    }

    #[test]
    fn treble_attenuated_more_than_bass() {
        let sr = 44100.0;
        let mut bbd_lo = BbdDelayLine::new(512, sr);
        let mut bbd_hi = bbd_lo.clone();
        bbd_lo.set_delay_samples(50.0);
        bbd_hi.set_delay_samples(50.0);

        let mut lo_out = 0.0f32;
        let mut hi_out = 0.0f32;
        for i in 0..4410 {
            let t = i as f32 / sr;
            lo_out = lo_out.max(
                bbd_lo
                    .process(libm::sinf(core::f32::consts::TAU * 220.0 * t))
                    .abs(),
            );
            hi_out = hi_out.max(
                bbd_hi
                    .process(libm::sinf(core::f32::consts::TAU * 15000.0 * t))
                    .abs(),
            );
        }

        assert!(
            hi_out < lo_out * 0.7,
            "15 kHz ({hi_out}) should lose more level than 220 Hz ({lo_out})"
        );
    }

    #[test]
    fn noise_floor_is_far_below_signal() {
        let mut bbd = BbdDelayLine::new(64, 44100.0);
        bbd.set_delay_samples(8.0);

        let mut peak = 0.0f32;
        for _ in 0..10000 {
            peak = peak.max(bbd.process(0.0).abs());
        }
        assert!(peak < 1e-3, "Silent input should stay near silent, got {peak}");
        assert!(peak > 0.0, "Clock noise floor should be nonzero");
    }

    #[test]
    fn clear_empties_buckets() {
        let mut bbd = BbdDelayLine::new(32, 44100.0);
        bbd.set_delay_samples(4.0);
        for _ in 0..32 {
            bbd.process(1.0);
        }
        bbd.clear();
        let out = bbd.process(0.0);
        assert!(out.abs() < 1e-3, "Cleared line should be silent, got {out}");
    }

    #[test]
    #[should_panic]
    fn zero_size_panics() {
        let _bbd = BbdDelayLine::new(0, 44100.0);
    }
}
