//! Dual-mode bucket-brigade chorus.
//!
//! The classic two-button chorus: a pair of BBD lines swept by one
//! internal triangle modulator, with the right channel reading the
//! inverted sweep. Button I gives the slow, wide ensemble; button II the
//! faster variant; both together switch to a fast shallow sweep closer to
//! vibrato. With neither engaged the effect is hard-bypassed and both
//! output channels carry the dry input bit-exactly.
//!
//! The modulator here is private to the chorus and entirely separate from
//! the synth's shared LFO.

use calliope_core::{BbdDelayLine, SmoothedParam};

/// Sweep settings for one chorus mode: modulator rate and the delay
/// range the BBD tap travels, in milliseconds.
#[derive(Clone, Copy, Debug)]
struct ModeSweep {
    rate_hz: f32,
    delay_min_ms: f32,
    delay_max_ms: f32,
}

/// Service-manual sweep constants for the three button states.
const SWEEP_I: ModeSweep = ModeSweep {
    rate_hz: 0.513,
    delay_min_ms: 1.54,
    delay_max_ms: 5.15,
};
const SWEEP_II: ModeSweep = ModeSweep {
    rate_hz: 0.863,
    delay_min_ms: 1.54,
    delay_max_ms: 5.15,
};
const SWEEP_BOTH: ModeSweep = ModeSweep {
    rate_hz: 9.75,
    delay_min_ms: 3.20,
    delay_max_ms: 3.90,
};

/// Longest tap position any mode reaches, with headroom.
const MAX_DELAY_SECONDS: f32 = 0.008;

/// Dual-BBD chorus with independently toggleable modes I and II.
///
/// `process_block` maps a mono input to a stereo pair. The two lines are
/// swept in anti-phase, which is what splits the image: left hears the
/// tap moving up while right hears it moving down. In the I+II state the
/// two line outputs are additionally cross-mixed asymmetrically.
///
/// # Example
///
/// ```rust
/// use calliope_effects::BbdChorus;
///
/// let mut chorus = BbdChorus::new(44100.0);
/// chorus.set_mode_i(true);
///
/// let dry = [0.5f32; 64];
/// let mut left = [0.0f32; 64];
/// let mut right = [0.0f32; 64];
/// chorus.process_block(&dry, &mut left, &mut right);
/// ```
#[derive(Debug, Clone)]
pub struct BbdChorus {
    line_a: BbdDelayLine,
    line_b: BbdDelayLine,
    mode_i: bool,
    mode_ii: bool,
    mod_phase: f32,
    rate: SmoothedParam,
    center_delay: SmoothedParam,
    sweep_depth: SmoothedParam,
    sample_rate: f32,
}

impl BbdChorus {
    /// Create a chorus with both modes disabled.
    pub fn new(sample_rate: f32) -> Self {
        let mut chorus = Self {
            line_a: BbdDelayLine::from_time(sample_rate, MAX_DELAY_SECONDS),
            line_b: BbdDelayLine::from_time(sample_rate, MAX_DELAY_SECONDS),
            mode_i: false,
            mode_ii: false,
            mod_phase: 0.0,
            rate: SmoothedParam::with_config(SWEEP_I.rate_hz, sample_rate, 50.0),
            center_delay: SmoothedParam::with_config(0.0, sample_rate, 50.0),
            sweep_depth: SmoothedParam::with_config(0.0, sample_rate, 50.0),
            sample_rate,
        };
        chorus.retarget_sweep();
        chorus
    }

    /// Toggle mode I (slow, wide ensemble sweep).
    pub fn set_mode_i(&mut self, enabled: bool) {
        self.mode_i = enabled;
        self.retarget_sweep();
    }

    /// Toggle mode II (faster sweep).
    pub fn set_mode_ii(&mut self, enabled: bool) {
        self.mode_ii = enabled;
        self.retarget_sweep();
    }

    /// Whether either mode is engaged.
    pub fn is_enabled(&self) -> bool {
        self.mode_i || self.mode_ii
    }

    /// Process one block: mono input to stereo output.
    ///
    /// All three slices must be the same length. With both modes off the
    /// BBD lines keep running (so re-engaging a mode does not replay
    /// stale buckets) but the output is exactly the dry input on both
    /// channels.
    pub fn process_block(&mut self, input: &[f32], left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(input.len(), left.len());
        debug_assert_eq!(input.len(), right.len());

        let phase_inc_base = 1.0 / self.sample_rate;

        for i in 0..input.len() {
            let rate = self.rate.advance();
            let center = self.center_delay.advance();
            let depth = self.sweep_depth.advance();

            self.mod_phase += rate * phase_inc_base;
            if self.mod_phase >= 1.0 {
                self.mod_phase -= 1.0;
            }
            let tri = triangle(self.mod_phase);

            let dry = input[i];
            self.line_a.set_delay_samples(center + tri * depth);
            self.line_b.set_delay_samples(center - tri * depth);
            let wet_a = self.line_a.process(dry);
            let wet_b = self.line_b.process(dry);

            let (l, r) = match (self.mode_i, self.mode_ii) {
                (false, false) => (dry, dry),
                (true, true) => (
                    0.5 * dry + 0.5 * (0.7 * wet_a + 0.3 * wet_b),
                    0.5 * dry + 0.5 * (0.3 * wet_a + 0.7 * wet_b),
                ),
                _ => (0.5 * dry + 0.5 * wet_a, 0.5 * dry + 0.5 * wet_b),
            };

            left[i] = l;
            right[i] = r;
        }
    }

    /// Clear delay lines and rewind the modulator.
    pub fn reset(&mut self) {
        self.line_a.clear();
        self.line_b.clear();
        self.mod_phase = 0.0;
        self.rate.snap_to_target();
        self.center_delay.snap_to_target();
        self.sweep_depth.snap_to_target();
    }

    /// Update the sample rate; sweeps are retargeted in samples.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.line_a.set_sample_rate(sample_rate);
        self.line_b.set_sample_rate(sample_rate);
        self.rate.set_sample_rate(sample_rate);
        self.center_delay.set_sample_rate(sample_rate);
        self.sweep_depth.set_sample_rate(sample_rate);
        self.retarget_sweep();
    }

    /// Point the rate/center/depth ramps at the active mode's sweep.
    ///
    /// Smoothed rather than snapped so toggling a button mid-note bends
    /// the sweep instead of clicking.
    fn retarget_sweep(&mut self) {
        let sweep = match (self.mode_i, self.mode_ii) {
            (true, true) => SWEEP_BOTH,
            (false, true) => SWEEP_II,
            _ => SWEEP_I,
        };

        let ms_to_samples = self.sample_rate / 1000.0;
        let center = (sweep.delay_min_ms + sweep.delay_max_ms) * 0.5 * ms_to_samples;
        let depth = (sweep.delay_max_ms - sweep.delay_min_ms) * 0.5 * ms_to_samples;

        self.rate.set_target(sweep.rate_hz);
        self.center_delay.set_target(center);
        self.sweep_depth.set_target(depth);
    }
}

/// Bipolar triangle from normalized phase.
#[inline]
fn triangle(phase: f32) -> f32 {
    if phase < 0.5 {
        4.0 * phase - 1.0
    } else {
        3.0 - 4.0 * phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_block(chorus: &mut BbdChorus, input: &[f32]) -> (Vec<f32>, Vec<f32>) {
        let mut left = vec![0.0; input.len()];
        let mut right = vec![0.0; input.len()];
        chorus.process_block(input, &mut left, &mut right);
        (left, right)
    }

    fn test_signal(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| libm::sinf(core::f32::consts::TAU * 440.0 * i as f32 / 44100.0) * 0.5)
            .collect()
    }

    #[test]
    fn disabled_is_bit_exact_dry() {
        let mut chorus = BbdChorus::new(44100.0);
        let input = test_signal(1024);
        let (left, right) = run_block(&mut chorus, &input);

        for i in 0..input.len() {
            assert_eq!(left[i], input[i], "Left differs from dry at {i}");
            assert_eq!(right[i], input[i], "Right differs from dry at {i}");
        }
    }

    #[test]
    fn mode_i_changes_output_and_decorrelates_channels() {
        let mut chorus = BbdChorus::new(44100.0);
        chorus.set_mode_i(true);
        let input = test_signal(8192);
        let (left, right) = run_block(&mut chorus, &input);

        let wet_diff: f32 = left
            .iter()
            .zip(&input)
            .map(|(l, d)| (l - d).abs())
            .sum();
        assert!(wet_diff > 1.0, "Mode I should change the output");

        let lr_diff: f32 = left.iter().zip(&right).map(|(l, r)| (l - r).abs()).sum();
        assert!(lr_diff > 1.0, "Mode I should produce different L and R");
    }

    #[test]
    fn mode_ii_differs_from_mode_i() {
        let input = test_signal(16384);

        let mut chorus_i = BbdChorus::new(44100.0);
        chorus_i.set_mode_i(true);
        chorus_i.rate.snap_to_target();
        chorus_i.center_delay.snap_to_target();
        chorus_i.sweep_depth.snap_to_target();
        let (left_i, _) = run_block(&mut chorus_i, &input);

        let mut chorus_ii = BbdChorus::new(44100.0);
        chorus_ii.set_mode_ii(true);
        chorus_ii.rate.snap_to_target();
        chorus_ii.center_delay.snap_to_target();
        chorus_ii.sweep_depth.snap_to_target();
        let (left_ii, _) = run_block(&mut chorus_ii, &input);

        let diff: f32 = left_i
            .iter()
            .zip(&left_ii)
            .map(|(a, b)| (a - b).abs())
            .sum();
        assert!(diff > 0.5, "Modes I and II should sweep differently");
    }

    #[test]
    fn both_modes_still_produce_stereo() {
        let mut chorus = BbdChorus::new(44100.0);
        chorus.set_mode_i(true);
        chorus.set_mode_ii(true);
        let input = test_signal(8192);
        let (left, right) = run_block(&mut chorus, &input);

        let lr_diff: f32 = left.iter().zip(&right).map(|(l, r)| (l - r).abs()).sum();
        assert!(lr_diff > 0.1, "I+II should produce different L and R");
    }

    #[test]
    fn output_stays_finite_and_bounded() {
        let mut chorus = BbdChorus::new(44100.0);
        chorus.set_mode_i(true);
        let input = vec![1.0f32; 4096];
        let (left, right) = run_block(&mut chorus, &input);

        for (l, r) in left.iter().zip(&right) {
            assert!(l.is_finite() && r.is_finite());
            assert!(l.abs() <= 2.0 && r.abs() <= 2.0);
        }
    }

    #[test]
    fn reenabling_does_not_replay_stale_buckets() {
        let mut chorus = BbdChorus::new(44100.0);
        chorus.set_mode_i(true);
        let loud = vec![1.0f32; 512];
        run_block(&mut chorus, &loud);

        // Disable, run silence long enough to flush the lines, re-enable
        chorus.set_mode_i(false);
        let silence = vec![0.0f32; 1024];
        run_block(&mut chorus, &silence);
        chorus.set_mode_i(true);
        let (left, _) = run_block(&mut chorus, &silence);

        let peak = left.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(peak < 1e-2, "Stale bucket content leaked: {peak}");
    }
}
