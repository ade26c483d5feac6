//! Opaque DSP block interface and the stock block implementations.
//!
//! The raw oscillator mixture and the amplifier/high-pass stages are
//! treated as black boxes behind a narrow compute contract: named
//! parameters in, sample buffers through. The engine assumes nothing
//! about their internals beyond sample-accurate behavior given
//! consistent inputs, so alternative algorithms (wavetable oscillators,
//! different filter laws) drop in without touching the voice or engine
//! code.
//!
//! Stock implementations:
//!
//! - [`DcoBlock`] — saw + pulse + sub + noise mixture with PolyBLEP
//!   band-limiting; this is the per-voice tone source.
//! - [`HighPassBlock`] — first-order high-pass with a panel-curve corner.
//! - [`AmplifierBlock`] — smoothed output gain stage.

use calliope_core::{OnePole, SmoothedParam};

use crate::tables::HPF_FREQ_CURVE;

/// Narrow compute contract for generated/opaque DSP blocks.
///
/// `process` reads `frames` samples from each input slice and writes
/// `frames` samples to each output slice; blocks are stateful across
/// calls but make no assumptions about block boundaries. Unknown
/// parameter names are ignored.
pub trait BlockDsp {
    /// Set a named control parameter.
    fn set_parameter(&mut self, name: &str, value: f32);

    /// Process one block of audio.
    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: usize);

    /// Clear internal state (phases, filter memory); control parameters
    /// survive, in-flight smoothing ramps snap to their targets.
    fn reset(&mut self);

    /// Update the sample rate.
    fn set_sample_rate(&mut self, sample_rate: f32);
}

/// 2nd-order PolyBLEP residual: smooths the step discontinuity at a
/// phase wrap across the two neighbouring samples.
///
/// `t` is the phase in [0, 1), `dt` the per-sample phase increment.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    if t < dt {
        let x = t / dt;
        2.0 * x - x * x - 1.0
    } else if t > 1.0 - dt {
        let x = (t - 1.0) / dt;
        x * x + 2.0 * x + 1.0
    } else {
        0.0
    }
}

#[inline]
fn wrap_phase(phase: f32) -> f32 {
    if phase >= 1.0 { phase - 1.0 } else { phase }
}

/// Digitally controlled oscillator: band-limited saw, pulse, sub-octave
/// square and noise, mixed by four level controls.
///
/// Inputs: `[detune multiplier, pwm]`. The detune input scales the base
/// frequency per sample (shared vibrato bus); the pwm input narrows the
/// pulse duty cycle from 50% down to 5%.
///
/// Parameters: `frequency` (Hz), `saw_level`, `pulse_level`, `sub_level`,
/// `noise_level` (each 0..1, smoothed).
#[derive(Debug, Clone)]
pub struct DcoBlock {
    phase: f32,
    sub_phase: f32,
    frequency: f32,
    saw_level: SmoothedParam,
    pulse_level: SmoothedParam,
    sub_level: SmoothedParam,
    noise_level: SmoothedParam,
    noise_state: u32,
    sample_rate: f32,
}

impl DcoBlock {
    /// Create a DCO at the given sample rate, all levels zero.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            sub_phase: 0.0,
            frequency: 440.0,
            saw_level: SmoothedParam::with_config(0.0, sample_rate, 10.0),
            pulse_level: SmoothedParam::with_config(0.0, sample_rate, 10.0),
            sub_level: SmoothedParam::with_config(0.0, sample_rate, 10.0),
            noise_level: SmoothedParam::with_config(0.0, sample_rate, 10.0),
            noise_state: 0x9e37_79b9,
            sample_rate,
        }
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

impl BlockDsp for DcoBlock {
    fn set_parameter(&mut self, name: &str, value: f32) {
        match name {
            "frequency" => self.frequency = value.max(0.0),
            "saw_level" => self.saw_level.set_target(value.clamp(0.0, 1.0)),
            "pulse_level" => self.pulse_level.set_target(value.clamp(0.0, 1.0)),
            "sub_level" => self.sub_level.set_target(value.clamp(0.0, 1.0)),
            "noise_level" => self.noise_level.set_target(value.clamp(0.0, 1.0)),
            _ => {}
        }
    }

    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: usize) {
        debug_assert_eq!(inputs.len(), 2, "DCO takes detune and pwm inputs");
        debug_assert_eq!(outputs.len(), 1);
        let detune = inputs[0];
        let pwm = inputs[1];

        for i in 0..frames {
            let dt = (self.frequency * detune[i] / self.sample_rate).clamp(1e-6, 0.45);

            let saw = 2.0 * self.phase - 1.0 - poly_blep(self.phase, dt);

            let duty = 0.5 - 0.45 * pwm[i].clamp(0.0, 1.0);
            let naive_pulse = if self.phase < duty { 1.0 } else { -1.0 };
            let pulse = naive_pulse + poly_blep(self.phase, dt)
                - poly_blep(wrap_phase(self.phase - duty + 1.0), dt);

            let sub_dt = dt * 0.5;
            let naive_sub = if self.sub_phase < 0.5 { 1.0 } else { -1.0 };
            let sub = naive_sub + poly_blep(self.sub_phase, sub_dt)
                - poly_blep(wrap_phase(self.sub_phase + 0.5), sub_dt);

            let noise = self.next_noise();

            outputs[0][i] = saw * self.saw_level.advance()
                + pulse * self.pulse_level.advance()
                + sub * self.sub_level.advance()
                + noise * self.noise_level.advance();

            self.phase = wrap_phase(self.phase + dt);
            self.sub_phase = wrap_phase(self.sub_phase + sub_dt);
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        self.sub_phase = 0.0;
        self.saw_level.snap_to_target();
        self.pulse_level.snap_to_target();
        self.sub_level.snap_to_target();
        self.noise_level.snap_to_target();
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.saw_level.set_sample_rate(sample_rate);
        self.pulse_level.set_sample_rate(sample_rate);
        self.sub_level.set_sample_rate(sample_rate);
        self.noise_level.set_sample_rate(sample_rate);
    }
}

/// First-order high-pass stage with the panel-curve corner.
///
/// Implemented as `x - lowpass(x)`. Parameter: `amount` (0..1, smoothed),
/// mapped to a corner frequency through [`HPF_FREQ_CURVE`].
#[derive(Debug, Clone)]
pub struct HighPassBlock {
    amount: SmoothedParam,
    lowpass: OnePole,
    corner_amount: f32,
}

impl HighPassBlock {
    /// Create the stage with the corner at the bottom of the curve.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            amount: SmoothedParam::with_config(0.0, sample_rate, 10.0),
            lowpass: OnePole::new(sample_rate, HPF_FREQ_CURVE.evaluate(0.0)),
            corner_amount: 0.0,
        }
    }
}

impl BlockDsp for HighPassBlock {
    fn set_parameter(&mut self, name: &str, value: f32) {
        if name == "amount" {
            self.amount.set_target(value.clamp(0.0, 1.0));
        }
    }

    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: usize) {
        debug_assert_eq!(inputs.len(), 1);
        debug_assert_eq!(outputs.len(), 1);

        for i in 0..frames {
            let amount = self.amount.advance();
            if (amount - self.corner_amount).abs() > 1e-4 {
                self.lowpass.set_frequency(HPF_FREQ_CURVE.evaluate(amount));
                self.corner_amount = amount;
            }
            let x = inputs[0][i];
            outputs[0][i] = x - self.lowpass.process(x);
        }
    }

    fn reset(&mut self) {
        self.lowpass.reset();
        self.amount.snap_to_target();
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.amount.set_sample_rate(sample_rate);
        self.lowpass.set_sample_rate(sample_rate);
    }
}

/// Output amplifier stage: smoothed gain, unity at the panel default.
///
/// Parameter: `amount` (0..1, smoothed), gain = `2 * amount`.
#[derive(Debug, Clone)]
pub struct AmplifierBlock {
    amount: SmoothedParam,
}

impl AmplifierBlock {
    /// Create the stage at the unity-gain default.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            amount: SmoothedParam::with_config(0.5, sample_rate, 10.0),
        }
    }
}

impl BlockDsp for AmplifierBlock {
    fn set_parameter(&mut self, name: &str, value: f32) {
        if name == "amount" {
            self.amount.set_target(value.clamp(0.0, 1.0));
        }
    }

    fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: usize) {
        debug_assert_eq!(inputs.len(), 1);
        debug_assert_eq!(outputs.len(), 1);

        for i in 0..frames {
            outputs[0][i] = inputs[0][i] * (2.0 * self.amount.advance());
        }
    }

    fn reset(&mut self) {
        self.amount.snap_to_target();
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.amount.set_sample_rate(sample_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    fn run_dco(dco: &mut DcoBlock, frames: usize) -> Vec<f32> {
        let detune = vec![1.0f32; frames];
        let pwm = vec![0.0f32; frames];
        let mut out = vec![0.0f32; frames];
        dco.process(&[&detune, &pwm], &mut [&mut out], frames);
        out
    }

    #[test]
    fn dco_saw_frequency() {
        let mut dco = DcoBlock::new(SR);
        dco.set_parameter("frequency", 441.0);
        dco.set_parameter("saw_level", 1.0);
        run_dco(&mut dco, 4410); // settle level smoother

        let out = run_dco(&mut dco, 44100);
        // The ramp crosses zero upward exactly once per cycle
        let mut crossings = 0;
        for pair in out.windows(2) {
            if pair[0] <= 0.0 && pair[1] > 0.0 {
                crossings += 1;
            }
        }
        assert!(
            (436..=446).contains(&crossings),
            "Expected ~441 cycles, got {crossings}"
        );
    }

    #[test]
    fn dco_pwm_narrows_pulse() {
        let mut dco = DcoBlock::new(SR);
        dco.set_parameter("frequency", 100.0);
        dco.set_parameter("pulse_level", 1.0);
        dco.reset();

        let frames = 44100;
        let detune = vec![1.0f32; frames];
        let pwm = vec![0.9f32; frames];
        let mut out = vec![0.0f32; frames];
        dco.process(&[&detune, &pwm], &mut [&mut out], frames);

        let high = out.iter().filter(|&&v| v > 0.0).count() as f32 / frames as f32;
        // duty = 0.5 - 0.45*0.9 = 0.095
        assert!(
            (high - 0.095).abs() < 0.03,
            "Expected ~9.5% duty, got {:.1}%",
            high * 100.0
        );
    }

    #[test]
    fn dco_sub_runs_at_half_frequency() {
        let mut dco = DcoBlock::new(SR);
        dco.set_parameter("frequency", 200.0);
        dco.set_parameter("sub_level", 1.0);
        dco.reset();

        let out = run_dco(&mut dco, 44100);
        let mut crossings = 0;
        for pair in out.windows(2) {
            if pair[0] <= 0.0 && pair[1] > 0.0 {
                crossings += 1;
            }
        }
        assert!((95..=105).contains(&crossings), "Sub should run at 100 Hz, got {crossings}");
    }

    #[test]
    fn dco_silent_with_all_levels_zero() {
        let mut dco = DcoBlock::new(SR);
        dco.set_parameter("frequency", 440.0);
        let out = run_dco(&mut dco, 1000);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn dco_unknown_parameter_ignored() {
        let mut dco = DcoBlock::new(SR);
        dco.set_parameter("warp_drive", 9000.0);
        let out = run_dco(&mut dco, 16);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn highpass_removes_dc() {
        let mut hpf = HighPassBlock::new(SR);
        hpf.set_parameter("amount", 0.5);

        let input = vec![1.0f32; 44100];
        let mut out = vec![0.0f32; 44100];
        hpf.process(&[&input], &mut [&mut out], 44100);

        let tail_avg: f32 =
            out[40000..].iter().sum::<f32>() / (out.len() - 40000) as f32;
        assert!(tail_avg.abs() < 1e-3, "DC should be blocked, got {tail_avg}");
    }

    #[test]
    fn highpass_passes_treble() {
        let mut hpf = HighPassBlock::new(SR);
        hpf.set_parameter("amount", 0.0);

        let frames = 44100;
        let input: Vec<f32> = (0..frames)
            .map(|i| libm::sinf(core::f32::consts::TAU * 5000.0 * i as f32 / SR))
            .collect();
        let mut out = vec![0.0f32; frames];
        hpf.process(&[&input], &mut [&mut out], frames);

        let peak = out[frames / 2..].iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(peak > 0.9, "5 kHz should pass the 140 Hz corner, got {peak}");
    }

    #[test]
    fn amplifier_default_is_unity() {
        let mut vca = AmplifierBlock::new(SR);
        let input = vec![0.5f32; 64];
        let mut out = vec![0.0f32; 64];
        vca.process(&[&input], &mut [&mut out], 64);
        for &v in &out {
            assert!((v - 0.5).abs() < 1e-5, "Default gain should be unity, got {v}");
        }
    }

    #[test]
    fn amplifier_zero_amount_is_silent() {
        let mut vca = AmplifierBlock::new(SR);
        vca.set_parameter("amount", 0.0);
        let input = vec![0.5f32; 4410];
        let mut out = vec![0.0f32; 4410];
        vca.process(&[&input], &mut [&mut out], 4410);
        assert!(out[4000].abs() < 1e-3, "Zero amount should gate output");
    }
}
