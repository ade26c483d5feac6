//! A single synthesizer voice.
//!
//! One voice = one sounding note: a DCO block, a resonant filter, the
//! panel envelope plus its gate sibling, and a per-voice PWM-depth
//! smoother. Voices live in the engine's fixed pool; they are assigned on
//! note-on and returned to the pool when their governing envelope goes
//! silent, when they are stolen, or on all-notes-off.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::boxed::Box;

use calliope_core::SmoothedParam;
use libm::exp2f;

use crate::block::{BlockDsp, DcoBlock};
use crate::engine::{MAX_VOICES, RenderBuffers};
use crate::envelope::AdsrEnvelope;
use crate::filter::ResonantFilter;

/// Which envelope governs the amplitude path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AmpMode {
    /// The panel ADSR shapes amplitude.
    #[default]
    Envelope,
    /// The fixed fast gate envelope shapes amplitude (on/off contour).
    Gate,
}

impl AmpMode {
    /// Decode the selector parameter value.
    pub fn from_value(value: f32) -> Self {
        if value < 0.5 { AmpMode::Envelope } else { AmpMode::Gate }
    }
}

/// Source feeding the pulse-width modulation bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PwmSource {
    /// Constant manual depth.
    #[default]
    Manual,
    /// Depth scaled by the shared LFO (unipolar).
    Lfo,
    /// Depth scaled by the panel envelope.
    Envelope,
}

impl PwmSource {
    /// Decode the selector parameter value.
    pub fn from_value(value: f32) -> Self {
        match value as i32 {
            1 => PwmSource::Lfo,
            2 => PwmSource::Envelope,
            _ => PwmSource::Manual,
        }
    }
}

/// Convert a MIDI note number to frequency in Hz (A4 = 440).
#[inline]
pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * exp2f((note as f32 - 69.0) / 12.0)
}

/// One pool slot: oscillator, filter, envelope pair and modulation state.
pub struct Voice {
    active: bool,
    note: u8,
    frequency: f32,
    velocity: f32,
    amp_mode: AmpMode,
    pwm_source: PwmSource,

    dco: Box<dyn BlockDsp + Send>,
    filter: ResonantFilter,
    /// Panel ADSR: amplitude (in envelope mode) and filter modulation.
    pub normal_env: AdsrEnvelope,
    /// Fixed fast envelope for gate amplitude mode.
    pub gate_env: AdsrEnvelope,
    smooth_pwm_depth: SmoothedParam,
}

impl Voice {
    /// Create an unassigned voice with the stock DCO block.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_oscillator(sample_rate, Box::new(DcoBlock::new(sample_rate)))
    }

    /// Create a voice around a caller-supplied oscillator block.
    pub fn with_oscillator(sample_rate: f32, dco: Box<dyn BlockDsp + Send>) -> Self {
        Self {
            active: false,
            note: 0,
            frequency: 440.0,
            velocity: 0.0,
            amp_mode: AmpMode::default(),
            pwm_source: PwmSource::default(),
            dco,
            filter: ResonantFilter::new(sample_rate),
            normal_env: AdsrEnvelope::new(sample_rate),
            gate_env: AdsrEnvelope::gate(sample_rate),
            smooth_pwm_depth: SmoothedParam::with_config(0.5, sample_rate, 10.0),
        }
    }

    /// Claim this slot for a note. Sets bookkeeping only; the envelope
    /// starts in [`trigger`](Self::trigger) so the scheduler can inspect
    /// held-voice state in between.
    pub(crate) fn assign(&mut self, note: u8, velocity: f32) {
        self.active = true;
        self.note = note;
        self.frequency = midi_to_freq(note);
        self.velocity = velocity.clamp(0.0, 1.0);
    }

    /// Start the governing envelope and point the oscillator at the
    /// assigned pitch (times the current bend factor). The PWM smoother
    /// snaps so a reclaimed voice does not inherit a stale ramp.
    pub(crate) fn trigger(&mut self, bend_factor: f32) {
        self.governing_env_mut().note_on();
        self.dco
            .set_parameter("frequency", self.frequency * bend_factor);
        let target = self.smooth_pwm_depth.target();
        self.smooth_pwm_depth.set_immediate(target);
    }

    /// Release the governing envelope (note-off).
    pub(crate) fn release(&mut self) {
        self.governing_env_mut().note_off();
    }

    /// Steal/all-notes-off path: immediate silence, slot freed.
    pub(crate) fn shutdown(&mut self) {
        self.normal_env.shutdown();
        self.gate_env.shutdown();
        self.free();
    }

    /// Return the slot to the pool and scrub per-note DSP state so the
    /// next note does not open on stale filter charge or mid-cycle phase.
    pub(crate) fn free(&mut self) {
        self.active = false;
        self.note = 0;
        self.normal_env.shutdown();
        self.gate_env.shutdown();
        self.filter.reset();
        self.dco.reset();
    }

    /// Whether the slot is currently assigned to a note.
    pub fn is_assigned(&self) -> bool {
        self.active
    }

    /// Whether the governing envelope has received note-off (or is idle).
    pub fn is_released(&self) -> bool {
        self.governing_env().is_released()
    }

    /// Assigned and not released: the key is conceptually still down.
    pub fn is_held(&self) -> bool {
        self.active && !self.is_released()
    }

    /// The assigned MIDI note number.
    pub fn note(&self) -> u8 {
        self.note
    }

    /// Trigger velocity, 0..1.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Select which envelope governs the amplitude path.
    pub fn set_amp_mode(&mut self, mode: AmpMode) {
        self.amp_mode = mode;
    }

    /// Select the PWM bus source.
    pub fn set_pwm_source(&mut self, source: PwmSource) {
        self.pwm_source = source;
    }

    /// Retarget the PWM depth ramp.
    pub fn set_pwm_depth(&mut self, depth: f32) {
        self.smooth_pwm_depth.set_target(depth.clamp(0.0, 1.0));
    }

    /// Forward a parameter to the oscillator block.
    pub fn set_dco_parameter(&mut self, name: &str, value: f32) {
        self.dco.set_parameter(name, value);
    }

    /// Retune a live voice (pitch bend). Does not retrigger envelopes.
    pub(crate) fn set_pitch_bend_factor(&mut self, factor: f32) {
        if self.active {
            self.dco
                .set_parameter("frequency", self.frequency * factor);
        }
    }

    /// Update sample rate on every owned component.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.dco.set_sample_rate(sample_rate);
        self.filter.set_sample_rate(sample_rate);
        self.normal_env.set_sample_rate(sample_rate);
        self.gate_env.set_sample_rate(sample_rate);
        self.smooth_pwm_depth.set_sample_rate(sample_rate);
    }

    fn governing_env(&self) -> &AdsrEnvelope {
        match self.amp_mode {
            AmpMode::Envelope => &self.normal_env,
            AmpMode::Gate => &self.gate_env,
        }
    }

    fn governing_env_mut(&mut self) -> &mut AdsrEnvelope {
        match self.amp_mode {
            AmpMode::Envelope => &mut self.normal_env,
            AmpMode::Gate => &mut self.gate_env,
        }
    }

    /// Render one block into the engine's mix bus.
    ///
    /// Executes the per-voice leg of the block pipeline: envelopes → PWM
    /// bus → DCO → octave-summed cutoff → filter → velocity-scaled
    /// accumulate. Returns `false` when the governing envelope went
    /// silent, in which case the slot has already been freed.
    pub(crate) fn render(
        &mut self,
        bufs: &mut RenderBuffers,
        frames: usize,
        bend_semitones: f32,
    ) -> bool {
        let RenderBuffers {
            lfo,
            detune,
            pwm,
            envelope,
            gate,
            dco: dco_buf,
            cutoff_octaves,
            cutoff_hz,
            resonance,
            env_depth,
            lfo_octaves,
            key_depth,
            bend_depth,
            mix,
            ..
        } = bufs;

        self.normal_env.process_block(&mut envelope[..frames]);
        if self.amp_mode == AmpMode::Gate {
            self.gate_env.process_block(&mut gate[..frames]);
        }

        for i in 0..frames {
            let depth = self.smooth_pwm_depth.advance();
            pwm[i] = match self.pwm_source {
                PwmSource::Manual => depth,
                PwmSource::Lfo => depth * (lfo[i] * 0.5 + 0.5),
                PwmSource::Envelope => depth * envelope[i],
            };
        }

        self.dco.process(
            &[&detune[..frames], &pwm[..frames]],
            &mut [&mut dco_buf[..frames]],
            frames,
        );

        let amp_env: &[f32] = match self.amp_mode {
            AmpMode::Envelope => &envelope[..frames],
            AmpMode::Gate => &gate[..frames],
        };

        let key_factor = (self.note as f32 - 60.0) / 12.0;
        let bend_factor = bend_semitones * (48.0 / 84.0);
        for i in 0..frames {
            let env_octaves = env_depth[i] * envelope[i] * 12.0;
            let lfo_oct = lfo_octaves[i] * amp_env[i];
            let key_octaves = key_depth[i] * key_factor;
            let bend_octaves = bend_depth[i] * bend_factor;
            cutoff_hz[i] = 7.8
                * exp2f(
                    cutoff_octaves[i] + env_octaves + lfo_oct + key_octaves + bend_octaves,
                );
        }

        self.filter.process_block(
            &mut dco_buf[..frames],
            &cutoff_hz[..frames],
            &resonance[..frames],
        );

        // Square-law velocity, divided by the pool size for headroom
        let note_volume = self.velocity * self.velocity * (1.0 / MAX_VOICES as f32);
        for i in 0..frames {
            mix[i] += dco_buf[i] * amp_env[i] * note_volume;
        }

        if !self.governing_env().is_active() {
            self.free();
            return false;
        }
        true
    }
}

impl core::fmt::Debug for Voice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Voice")
            .field("active", &self.active)
            .field("note", &self.note)
            .field("velocity", &self.velocity)
            .field("amp_mode", &self.amp_mode)
            .field("pwm_source", &self.pwm_source)
            .finish_non_exhaustive()
    }
}
