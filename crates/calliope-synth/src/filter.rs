//! Per-voice resonant lowpass filter.
//!
//! Four cascaded one-pole lowpass stages with global feedback from the
//! last stage back to the input — the classic transistor-ladder topology —
//! and a `tanh` saturator on the feedback summing node standing in for
//! the analog overload behavior that keeps self-oscillation civilized.
//!
//! The filter itself is deliberately dumb: the caller (the engine's
//! per-voice render pass) computes the cutoff in Hz per sample from the
//! octave-domain modulation sum and hands it over alongside a resonance
//! buffer. Cutoff input is clamped to the safe audio domain before the
//! coefficient math.

use libm::{expf, tanhf};

/// Lowest accepted cutoff, Hz.
const CUTOFF_FLOOR_HZ: f32 = 10.0;

/// Highest accepted cutoff, as a fraction of the sample rate. Above this
/// the one-pole coefficient degenerates and stages stop tracking.
const CUTOFF_CEIL_RATIO: f32 = 0.45;

/// Feedback gain at full resonance. Four stages contribute 180° of phase
/// shift at the cutoff; gain 4 at that point is the self-oscillation
/// threshold.
const MAX_FEEDBACK: f32 = 4.0;

/// Four-stage feedback lowpass with saturating resonance.
///
/// # Example
///
/// ```rust
/// use calliope_synth::ResonantFilter;
///
/// let mut filter = ResonantFilter::new(44100.0);
/// let mut audio = [0.5f32; 64];
/// let cutoff = [2000.0f32; 64];
/// let resonance = [0.3f32; 64];
/// filter.process_block(&mut audio, &cutoff, &resonance);
/// ```
#[derive(Debug, Clone)]
pub struct ResonantFilter {
    stages: [f32; 4],
    sample_rate: f32,
}

impl ResonantFilter {
    /// Create a filter with cleared stage memory.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            stages: [0.0; 4],
            sample_rate,
        }
    }

    /// Clear internal stage memory.
    ///
    /// Called when a voice is reclaimed so the next note does not open on
    /// the previous note's stored charge.
    pub fn reset(&mut self) {
        self.stages = [0.0; 4];
    }

    /// Update the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    /// Filter `audio` in place.
    ///
    /// `cutoff_hz` is the absolute per-sample cutoff (already summed from
    /// its octave-domain contributions by the caller); `resonance` is
    /// 0..1, mapping monotonically onto feedback gain.
    pub fn process_block(&mut self, audio: &mut [f32], cutoff_hz: &[f32], resonance: &[f32]) {
        debug_assert_eq!(audio.len(), cutoff_hz.len());
        debug_assert_eq!(audio.len(), resonance.len());

        let ceil = self.sample_rate * CUTOFF_CEIL_RATIO;

        for i in 0..audio.len() {
            let fc = cutoff_hz[i].clamp(CUTOFF_FLOOR_HZ, ceil);
            let g = 1.0 - expf(-core::f32::consts::TAU * fc / self.sample_rate);
            let feedback = MAX_FEEDBACK * resonance[i].clamp(0.0, 1.0);

            let x = tanhf(audio[i] - feedback * self.stages[3]);
            self.stages[0] += g * (x - self.stages[0]);
            self.stages[1] += g * (self.stages[0] - self.stages[1]);
            self.stages[2] += g * (self.stages[1] - self.stages[2]);
            self.stages[3] += g * (self.stages[2] - self.stages[3]);

            audio[i] = self.stages[3];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    fn filter_sine(freq: f32, cutoff: f32, resonance: f32, seconds: f32) -> f32 {
        // Drive at 0.25 to keep the feedback saturator near its linear region
        let mut filter = ResonantFilter::new(SR);
        let n = (seconds * SR) as usize;
        let mut audio: Vec<f32> = (0..n)
            .map(|i| 0.25 * libm::sinf(core::f32::consts::TAU * freq * i as f32 / SR))
            .collect();
        let cutoff_buf = vec![cutoff; n];
        let res_buf = vec![resonance; n];
        filter.process_block(&mut audio, &cutoff_buf, &res_buf);
        // Steady-state peak over the last quarter
        audio[3 * n / 4..].iter().fold(0.0f32, |m, v| m.max(v.abs()))
    }

    #[test]
    fn passes_below_cutoff() {
        let peak = filter_sine(220.0, 8000.0, 0.0, 0.5);
        assert!(peak > 0.2, "220 Hz through open filter should pass, got {peak}");
    }

    #[test]
    fn attenuates_above_cutoff() {
        let peak = filter_sine(8000.0, 300.0, 0.0, 0.5);
        assert!(peak < 0.01, "8 kHz through closed filter should vanish, got {peak}");
    }

    #[test]
    fn resonance_boosts_near_cutoff() {
        // Probe right at the cutoff: resonance narrows and raises the peak
        let flat = filter_sine(1000.0, 1000.0, 0.0, 0.5);
        let boosted = filter_sine(1000.0, 1000.0, 0.8, 0.5);
        assert!(
            boosted > flat,
            "Resonance should raise the peak at cutoff: {flat} -> {boosted}"
        );
    }

    #[test]
    fn resonance_peak_grows_monotonically() {
        let mut prev = 0.0;
        for step in 0..=4 {
            let resonance = step as f32 * 0.225; // 0 .. 0.9
            let peak = filter_sine(1000.0, 1000.0, resonance, 0.5);
            assert!(
                peak > prev,
                "Peak should grow with resonance: {prev} -> {peak} at {resonance}"
            );
            prev = peak;
        }
    }

    #[test]
    fn extreme_inputs_stay_finite() {
        let mut filter = ResonantFilter::new(SR);
        let mut audio = vec![10.0f32; 4096];
        let cutoff = vec![1e9f32; 4096]; // silly cutoff, must clamp
        let resonance = vec![5.0f32; 4096]; // out-of-range, must clamp
        filter.process_block(&mut audio, &cutoff, &resonance);
        for &v in &audio {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn reset_clears_ring() {
        let mut filter = ResonantFilter::new(SR);
        let mut audio = vec![1.0f32; 512];
        let cutoff = vec![500.0f32; 512];
        let resonance = vec![0.9f32; 512];
        filter.process_block(&mut audio, &cutoff, &resonance);

        filter.reset();
        let mut silence = vec![0.0f32; 64];
        filter.process_block(&mut silence, &cutoff[..64], &resonance[..64]);
        for &v in &silence {
            assert_eq!(v, 0.0, "Reset filter must not ring");
        }
    }
}
