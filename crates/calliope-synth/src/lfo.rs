//! Shared low-frequency oscillator with an amplitude envelope window.
//!
//! One instance per engine. The oscillator side is a plain phase
//! accumulator with five waveforms and a smoothed frequency; the envelope
//! side is a delay-then-attack window that fades the LFO in after a key
//! trigger and sustains at full amplitude until shut down. There is no
//! decay or release stage: the engine either arms the window
//! ([`note_on`](LfoWithEnvelope::note_on)) or kills it
//! ([`shutdown`](LfoWithEnvelope::shutdown)) — the component never tapers
//! out on its own.
//!
//! In free-running mode the window is bypassed entirely and the LFO is
//! always at full amplitude.

use calliope_core::SmoothedParam;
use libm::sinf;

/// LFO waveform selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    /// Linear up/down ramp.
    Triangle,
    /// Smooth sinusoid.
    #[default]
    Sine,
    /// Hard-edged on/off.
    Square,
    /// Sample-and-hold: a new random level each cycle.
    Random,
    /// A new random value every sample (free noise).
    Noise,
}

/// Window stages: silence, ramp-up, hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum WindowStage {
    #[default]
    Idle,
    Delay,
    Attack,
    Hold,
}

/// Low-frequency oscillator shaped by a delay+attack amplitude window.
///
/// # Example
///
/// ```rust
/// use calliope_synth::{LfoWithEnvelope, LfoWaveform};
///
/// let mut lfo = LfoWithEnvelope::new(44100.0);
/// lfo.set_waveform(LfoWaveform::Triangle);
/// lfo.set_frequency(5.0);
/// lfo.set_free_running(true);
///
/// let mut buffer = [0.0f32; 128];
/// lfo.process_block(&mut buffer);
/// ```
#[derive(Debug, Clone)]
pub struct LfoWithEnvelope {
    waveform: LfoWaveform,
    sample_rate: f32,
    phase: f32,
    held_value: f32,
    smooth_frequency: SmoothedParam,

    free_running: bool,
    stage: WindowStage,
    delay_secs: f32,
    attack_secs: f32,
    delay_remaining: f32,
    window_level: f32,

    noise_state: u32,
}

impl LfoWithEnvelope {
    /// Create an LFO in key-triggered mode (window idle, silent).
    pub fn new(sample_rate: f32) -> Self {
        Self {
            waveform: LfoWaveform::default(),
            sample_rate,
            phase: 0.0,
            held_value: 0.0,
            smooth_frequency: SmoothedParam::with_config(0.3, sample_rate, 100.0),
            free_running: false,
            stage: WindowStage::Idle,
            delay_secs: 0.0,
            attack_secs: 0.001,
            delay_remaining: 0.0,
            window_level: 0.0,
            noise_state: 0x1234_5678,
        }
    }

    /// Set oscillation frequency in Hz (smoothed).
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.smooth_frequency.set_target(freq_hz.max(0.0));
    }

    /// Select the waveform. Resets phase and the held random value.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
        self.phase = 0.0;
        self.held_value = 0.0;
    }

    /// Current waveform.
    pub fn waveform(&self) -> LfoWaveform {
        self.waveform
    }

    /// Silence window onset delay in seconds.
    pub fn set_delay_duration(&mut self, secs: f32) {
        self.delay_secs = secs.max(0.0);
    }

    /// Amplitude ramp-up duration in seconds.
    pub fn set_attack_duration(&mut self, secs: f32) {
        self.attack_secs = secs.max(1e-3);
    }

    /// Bypass the amplitude window (free-running trigger policy).
    pub fn set_free_running(&mut self, free: bool) {
        self.free_running = free;
    }

    /// Whether the window is currently armed (any non-idle stage).
    pub fn is_triggered(&self) -> bool {
        self.stage != WindowStage::Idle
    }

    /// Current amplitude window level, 0..1.
    pub fn window_level(&self) -> f32 {
        self.window_level
    }

    /// Arm the amplitude window: silence for the delay, then ramp to full.
    ///
    /// Called by the engine on the first key of a new chord in
    /// key-triggered mode. Re-arming while already armed restarts
    /// nothing — the window keeps its place (the second key of a held
    /// chord must not restart the ramp; the engine guards this, and the
    /// guard here keeps the component safe on its own).
    pub fn note_on(&mut self) {
        if self.stage == WindowStage::Idle {
            self.window_level = 0.0;
            self.delay_remaining = self.delay_secs * self.sample_rate;
            self.stage = if self.delay_remaining > 0.0 {
                WindowStage::Delay
            } else {
                WindowStage::Attack
            };
        }
    }

    /// Forcefully reset: window to silence, stage to idle.
    pub fn shutdown(&mut self) {
        self.stage = WindowStage::Idle;
        self.window_level = 0.0;
    }

    /// Update sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.smooth_frequency.set_sample_rate(sample_rate);
    }

    /// Fill `output` with bipolar LFO samples, window applied.
    pub fn process_block(&mut self, output: &mut [f32]) {
        for sample in output.iter_mut() {
            let freq = self.smooth_frequency.advance();

            let raw = self.next_raw();
            self.phase += freq / self.sample_rate;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
                self.held_value = self.next_noise();
            }

            let amplitude = if self.free_running {
                1.0
            } else {
                self.advance_window()
            };

            *sample = raw * amplitude;
        }
    }

    /// Waveform value at the current phase.
    #[inline]
    fn next_raw(&mut self) -> f32 {
        match self.waveform {
            LfoWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
            LfoWaveform::Sine => sinf(self.phase * core::f32::consts::TAU),
            LfoWaveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoWaveform::Random => self.held_value,
            LfoWaveform::Noise => self.next_noise(),
        }
    }

    /// One step of the delay+attack window.
    #[inline]
    fn advance_window(&mut self) -> f32 {
        match self.stage {
            WindowStage::Idle => 0.0,
            WindowStage::Delay => {
                self.delay_remaining -= 1.0;
                if self.delay_remaining <= 0.0 {
                    self.stage = WindowStage::Attack;
                }
                0.0
            }
            WindowStage::Attack => {
                self.window_level += 1.0 / (self.attack_secs * self.sample_rate).max(1.0);
                if self.window_level >= 1.0 {
                    self.window_level = 1.0;
                    self.stage = WindowStage::Hold;
                }
                self.window_level
            }
            WindowStage::Hold => 1.0,
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

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    fn render(lfo: &mut LfoWithEnvelope, samples: usize) -> Vec<f32> {
        let mut out = vec![0.0; samples];
        let mut done = 0;
        while done < samples {
            let chunk = (samples - done).min(128);
            lfo.process_block(&mut out[done..done + chunk]);
            done += chunk;
        }
        out
    }

    #[test]
    fn keyed_mode_is_silent_until_triggered() {
        let mut lfo = LfoWithEnvelope::new(SR);
        lfo.set_frequency(5.0);
        let out = render(&mut lfo, 1000);
        assert!(out.iter().all(|&v| v == 0.0), "Untriggered LFO must be silent");
    }

    #[test]
    fn free_running_ignores_triggering() {
        let mut lfo = LfoWithEnvelope::new(SR);
        lfo.set_frequency(5.0);
        lfo.set_free_running(true);
        let out = render(&mut lfo, 44100);
        let peak = out.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(peak > 0.9, "Free-running LFO should be at full amplitude");
    }

    #[test]
    fn delay_then_attack_ramp() {
        let mut lfo = LfoWithEnvelope::new(SR);
        lfo.set_waveform(LfoWaveform::Square); // |raw| = 1, exposes the window
        lfo.set_frequency(50.0);
        lfo.set_delay_duration(0.1);
        lfo.set_attack_duration(0.1);
        lfo.note_on();

        let out = render(&mut lfo, (0.3 * SR) as usize);

        // During the delay window: silence
        let delay_peak = out[..(0.09 * SR) as usize]
            .iter()
            .fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(delay_peak < 1e-6, "Delay stage should be silent, got {delay_peak}");

        // Mid-attack: partial amplitude
        let mid = out[(0.15 * SR) as usize].abs().max(out[(0.15 * SR) as usize + 1].abs());
        assert!(mid > 0.1 && mid < 0.95, "Mid-ramp should be partial, got {mid}");

        // After the ramp: full amplitude
        let tail_peak = out[(0.25 * SR) as usize..]
            .iter()
            .fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(tail_peak > 0.95, "Post-ramp should be full, got {tail_peak}");
    }

    #[test]
    fn retrigger_while_armed_does_not_restart() {
        let mut lfo = LfoWithEnvelope::new(SR);
        lfo.set_waveform(LfoWaveform::Square);
        lfo.set_frequency(50.0);
        lfo.set_attack_duration(0.2);
        lfo.note_on();
        render(&mut lfo, (0.1 * SR) as usize);
        let level_before = lfo.window_level;
        assert!(level_before > 0.0);

        lfo.note_on();
        assert_eq!(lfo.window_level, level_before, "Second trigger must not reset the ramp");
    }

    #[test]
    fn shutdown_then_retrigger_ramps_from_zero() {
        let mut lfo = LfoWithEnvelope::new(SR);
        lfo.set_waveform(LfoWaveform::Square);
        lfo.set_frequency(50.0);
        lfo.set_attack_duration(0.1);
        lfo.note_on();
        render(&mut lfo, 44100);
        assert!(lfo.window_level > 0.99);

        lfo.shutdown();
        assert!(!lfo.is_triggered());
        let silent = render(&mut lfo, 1000);
        assert!(silent.iter().all(|&v| v == 0.0));

        lfo.note_on();
        assert_eq!(lfo.window_level, 0.0, "Fresh trigger restarts the ramp from 0");
    }

    #[test]
    fn triangle_frequency_is_accurate() {
        let mut lfo = LfoWithEnvelope::new(SR);
        lfo.set_waveform(LfoWaveform::Triangle);
        lfo.set_frequency(2.0);
        lfo.set_free_running(true);

        // Let the frequency smoother settle, then count rising zero crossings
        render(&mut lfo, 44100);
        let out = render(&mut lfo, 44100 * 5);
        let mut crossings = 0;
        for pair in out.windows(2) {
            if pair[0] <= 0.0 && pair[1] > 0.0 {
                crossings += 1;
            }
        }
        assert!((9..=11).contains(&crossings), "Expected ~10 cycles in 5 s, got {crossings}");
    }

    #[test]
    fn random_holds_within_cycle() {
        let mut lfo = LfoWithEnvelope::new(SR);
        lfo.set_waveform(LfoWaveform::Random);
        lfo.set_frequency(10.0);
        lfo.set_free_running(true);
        render(&mut lfo, 44100); // settle smoother

        let out = render(&mut lfo, 4410); // one cycle at 10 Hz
        let distinct = out
            .windows(2)
            .filter(|pair| (pair[0] - pair[1]).abs() > 1e-9)
            .count();
        assert!(distinct <= 2, "Sample-and-hold should step once per cycle, stepped {distinct} times");
    }

    #[test]
    fn waveform_change_resets_phase() {
        let mut lfo = LfoWithEnvelope::new(SR);
        lfo.set_frequency(1.0);
        lfo.set_free_running(true);
        render(&mut lfo, 10000);
        lfo.set_waveform(LfoWaveform::Triangle);
        assert_eq!(lfo.phase, 0.0);
    }

    #[test]
    fn all_waveforms_bipolar_bounded() {
        for waveform in [
            LfoWaveform::Triangle,
            LfoWaveform::Sine,
            LfoWaveform::Square,
            LfoWaveform::Random,
            LfoWaveform::Noise,
        ] {
            let mut lfo = LfoWithEnvelope::new(SR);
            lfo.set_waveform(waveform);
            lfo.set_frequency(8.0);
            lfo.set_free_running(true);
            let out = render(&mut lfo, 10000);
            for &v in &out {
                assert!((-1.0..=1.0).contains(&v), "{waveform:?} out of range: {v}");
            }
        }
    }
}
