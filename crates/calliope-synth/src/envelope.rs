//! ADSR envelope generator.
//!
//! Per-voice envelope driving the amplitude path and the filter
//! modulation bus. Two configurations exist: the panel envelope with its
//! knob-controlled stage times, and the gate variant — the same state
//! machine with fixed, very short constants that approximates an on/off
//! contour for the gate amplitude mode.

use libm::expf;

/// Stage targets reach "completion" when the exponential has covered 99%
/// of its span; ln(100) time constants fit inside the configured duration.
const LN_100: f32 = 4.6051702;

/// Attack aims past 1.0 so the curve crosses full level in finite time
/// instead of approaching it asymptotically.
const ATTACK_TARGET: f32 = 1.2;

/// Envelope stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Inactive — output is zero.
    #[default]
    Idle,
    /// Output ramps up toward peak level.
    Attack,
    /// Output falls from peak toward the sustain level.
    Decay,
    /// Output holds at the sustain level while the key is held.
    Sustain,
    /// Output decays to zero after key release.
    Release,
}

/// ADSR envelope generator.
///
/// Each stage is an exponential approach toward its target with a time
/// constant derived from the configured duration (seconds, set by the
/// engine from the panel curve tables).
///
/// Trigger semantics:
///
/// - [`note_on`](Self::note_on) restarts Attack *from the current output
///   level* — no discontinuity, no forced re-zero — from any stage.
/// - [`note_off`](Self::note_off) moves any held stage to Release.
/// - [`shutdown`](Self::shutdown) drops to Idle immediately with zero
///   output: the voice-steal and all-notes-off path, no audible tail.
#[derive(Debug, Clone)]
pub struct AdsrEnvelope {
    state: EnvelopeState,
    level: f32,
    sample_rate: f32,

    attack_secs: f32,
    decay_secs: f32,
    release_secs: f32,
    sustain: f32,

    attack_coeff: f32,
    decay_coeff: f32,
    release_coeff: f32,
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new(44100.0)
    }
}

impl AdsrEnvelope {
    /// Create an envelope with instant stages and full sustain.
    pub fn new(sample_rate: f32) -> Self {
        let mut env = Self {
            state: EnvelopeState::Idle,
            level: 0.0,
            sample_rate,
            attack_secs: 0.001,
            decay_secs: 0.002,
            release_secs: 0.002,
            sustain: 1.0,
            attack_coeff: 0.0,
            decay_coeff: 0.0,
            release_coeff: 0.0,
        };
        env.recalculate_coefficients();
        env
    }

    /// Create the gate variant: fixed fast constants, near-full sustain.
    ///
    /// Strictly faster than any panel setting of the normal envelope, so
    /// the gate amplitude mode reads as an on/off switch.
    pub fn gate(sample_rate: f32) -> Self {
        let mut env = Self::new(sample_rate);
        env.set_attack_secs(0.00247);
        env.set_decay_secs(0.0057);
        env.set_sustain(0.98);
        env.set_release_secs(0.0057);
        env
    }

    /// Set attack duration in seconds.
    pub fn set_attack_secs(&mut self, secs: f32) {
        self.attack_secs = secs.max(1e-4);
        self.attack_coeff = self.stage_coeff(self.attack_secs);
    }

    /// Set decay duration in seconds.
    pub fn set_decay_secs(&mut self, secs: f32) {
        self.decay_secs = secs.max(1e-4);
        self.decay_coeff = self.stage_coeff(self.decay_secs);
    }

    /// Set sustain level (0.0 to 1.0).
    pub fn set_sustain(&mut self, level: f32) {
        self.sustain = level.clamp(0.0, 1.0);
    }

    /// Set release duration in seconds.
    pub fn set_release_secs(&mut self, secs: f32) {
        self.release_secs = secs.max(1e-4);
        self.release_coeff = self.stage_coeff(self.release_secs);
    }

    /// Update sample rate and recalculate stage coefficients.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coefficients();
    }

    /// Start (or restart) the envelope from the current output level.
    pub fn note_on(&mut self) {
        self.state = EnvelopeState::Attack;
    }

    /// Release the envelope.
    pub fn note_off(&mut self) {
        if self.state != EnvelopeState::Idle {
            self.state = EnvelopeState::Release;
        }
    }

    /// Immediate transition to Idle with zero output.
    pub fn shutdown(&mut self) {
        self.state = EnvelopeState::Idle;
        self.level = 0.0;
    }

    /// Current stage.
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Current output level without advancing.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// True whenever the envelope is producing output (state ≠ Idle).
    pub fn is_active(&self) -> bool {
        self.state != EnvelopeState::Idle
    }

    /// True only in Release or Idle: the key driving this envelope has
    /// been let go (or was never held).
    pub fn is_released(&self) -> bool {
        matches!(self.state, EnvelopeState::Release | EnvelopeState::Idle)
    }

    /// Advance one sample and return the output level.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        match self.state {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }

            EnvelopeState::Attack => {
                self.level =
                    ATTACK_TARGET + (self.level - ATTACK_TARGET) * self.attack_coeff;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.state = EnvelopeState::Decay;
                }
            }

            EnvelopeState::Decay => {
                self.level = self.sustain + (self.level - self.sustain) * self.decay_coeff;
                if (self.level - self.sustain).abs() < 1e-4 {
                    self.level = self.sustain;
                    self.state = EnvelopeState::Sustain;
                }
            }

            EnvelopeState::Sustain => {
                self.level = self.sustain;
            }

            EnvelopeState::Release => {
                self.level *= self.release_coeff;
                if self.level < 1e-4 {
                    self.level = 0.0;
                    self.state = EnvelopeState::Idle;
                }
            }
        }

        self.level
    }

    /// Fill a buffer with consecutive envelope samples.
    pub fn process_block(&mut self, output: &mut [f32]) {
        for sample in output.iter_mut() {
            *sample = self.advance();
        }
    }

    fn recalculate_coefficients(&mut self) {
        self.attack_coeff = self.stage_coeff(self.attack_secs);
        self.decay_coeff = self.stage_coeff(self.decay_secs);
        self.release_coeff = self.stage_coeff(self.release_secs);
    }

    /// Per-sample pole for a stage covering 99% of its span in `secs`.
    fn stage_coeff(&self, secs: f32) -> f32 {
        let samples = (secs * self.sample_rate).max(1.0);
        expf(-LN_100 / samples)
    }
}
