//! Engine: parameter distribution, note scheduling and block rendering.
//!
//! One [`Engine`] instance owns the fixed voice pool, the shared LFO, the
//! post-filter effect chain and every control smoother. Multiple engines
//! can coexist (multi-timbral or test-parallel use); nothing here is
//! process-global.
//!
//! # Real-time contract
//!
//! [`render_block`](Engine::render_block) runs synchronously inside the
//! host's audio callback: it never blocks, never allocates (all scratch
//! is preallocated at construction) and always produces a full block —
//! silence when no voice is active. Note and parameter mutators may be
//! called from a control thread without locks: every externally mutable
//! control is a single `f32` store, and the per-sample smoothers turn
//! whatever value the render pass observes into an inaudible ramp.
//! This lock-free tension is deliberate and inherited from the hardware
//! lineage; do not add synchronization on the render path.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;

use calliope_core::{LerpTable, SmoothedParam};
use calliope_effects::BbdChorus;
use libm::{exp2f, tanh};

use crate::block::{AmplifierBlock, BlockDsp, HighPassBlock};
use crate::lfo::{LfoWithEnvelope, LfoWaveform};
use crate::params::{PARAM_COUNT, ParamId};
use crate::preset::{Preset, factory_bank};
use crate::state::StateSnapshot;
use crate::tables::{
    ATTACK_CURVE, DECAY_CURVE, LFO_ATTACK_CURVE, LFO_DELAY_CURVE, LFO_RATE_CURVE, RELEASE_CURVE,
};
use crate::voice::{AmpMode, PwmSource, Voice};

/// Fixed polyphony of the voice pool.
pub const MAX_VOICES: usize = 6;

/// Largest renderable block, frames.
pub const MAX_BLOCK: usize = 256;

/// Pitch bend span in semitones (± from center).
pub const BEND_RANGE_SEMITONES: f32 = 7.0;

/// Octave transpose limit (± from center).
const MAX_OCTAVE_TRANSPOSE: i32 = 3;

/// LFO trigger policy, selected by the panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoTriggerMode {
    /// The LFO runs at full amplitude regardless of keys.
    Free,
    /// The LFO is armed by the first key of a chord and shut down when
    /// the last held key releases.
    #[default]
    Keyed,
}

impl LfoTriggerMode {
    fn from_value(value: f32) -> Self {
        if value < 0.5 {
            LfoTriggerMode::Free
        } else {
            LfoTriggerMode::Keyed
        }
    }
}

/// Preallocated per-block scratch shared by the engine and its voices.
pub(crate) struct RenderBuffers {
    pub lfo: [f32; MAX_BLOCK],
    pub detune: [f32; MAX_BLOCK],
    pub pwm: [f32; MAX_BLOCK],
    pub envelope: [f32; MAX_BLOCK],
    pub gate: [f32; MAX_BLOCK],
    pub dco: [f32; MAX_BLOCK],
    pub cutoff_octaves: [f32; MAX_BLOCK],
    pub cutoff_hz: [f32; MAX_BLOCK],
    pub resonance: [f32; MAX_BLOCK],
    pub env_depth: [f32; MAX_BLOCK],
    pub lfo_octaves: [f32; MAX_BLOCK],
    pub key_depth: [f32; MAX_BLOCK],
    pub bend_depth: [f32; MAX_BLOCK],
    pub mix: [f32; MAX_BLOCK],
    pub post: [f32; MAX_BLOCK],
    pub out_l: [f32; MAX_BLOCK],
    pub out_r: [f32; MAX_BLOCK],
}

impl RenderBuffers {
    fn new() -> Box<Self> {
        Box::new(Self {
            lfo: [0.0; MAX_BLOCK],
            detune: [0.0; MAX_BLOCK],
            pwm: [0.0; MAX_BLOCK],
            envelope: [0.0; MAX_BLOCK],
            gate: [0.0; MAX_BLOCK],
            dco: [0.0; MAX_BLOCK],
            cutoff_octaves: [0.0; MAX_BLOCK],
            cutoff_hz: [0.0; MAX_BLOCK],
            resonance: [0.0; MAX_BLOCK],
            env_depth: [0.0; MAX_BLOCK],
            lfo_octaves: [0.0; MAX_BLOCK],
            key_depth: [0.0; MAX_BLOCK],
            bend_depth: [0.0; MAX_BLOCK],
            mix: [0.0; MAX_BLOCK],
            post: [0.0; MAX_BLOCK],
            out_l: [0.0; MAX_BLOCK],
            out_r: [0.0; MAX_BLOCK],
        })
    }
}

/// The complete voice engine: pool, shared modulation, effect chain.
pub struct Engine {
    params: [f32; PARAM_COUNT],
    voices: [Voice; MAX_VOICES],
    lfo: LfoWithEnvelope,
    hpf: HighPassBlock,
    vca: AmplifierBlock,
    chorus: BbdChorus,
    soft_clip: LerpTable,

    smooth_pitch_mod_depth: SmoothedParam,
    smooth_cutoff: SmoothedParam,
    smooth_resonance: SmoothedParam,
    smooth_env_depth: SmoothedParam,
    smooth_lfo_depth: SmoothedParam,
    smooth_key_depth: SmoothedParam,
    smooth_bend_depth: SmoothedParam,

    pitch_factor: f32,
    amp_mode: AmpMode,
    lfo_mode: LfoTriggerMode,
    pitch_bend_semitones: f32,
    octave_transpose: i32,
    volume: f32,

    presets: Vec<Preset>,
    current_preset: usize,

    buffers: Box<RenderBuffers>,
    sample_rate: f32,
}

impl Engine {
    /// Create an engine at the given sample rate with the factory-default
    /// patch loaded.
    pub fn new(sample_rate: f32) -> Self {
        let smoother = |initial: f32| SmoothedParam::with_config(initial, sample_rate, 10.0);

        let mut lfo = LfoWithEnvelope::new(sample_rate);
        lfo.set_waveform(LfoWaveform::Sine);

        let mut engine = Self {
            params: [0.0; PARAM_COUNT],
            voices: core::array::from_fn(|_| Voice::new(sample_rate)),
            lfo,
            hpf: HighPassBlock::new(sample_rate),
            vca: AmplifierBlock::new(sample_rate),
            chorus: BbdChorus::new(sample_rate),
            soft_clip: LerpTable::from_fn(|x| tanh(3.0 * x as f64) as f32, -1.0, 1.0, 128),
            smooth_pitch_mod_depth: smoother(0.0),
            smooth_cutoff: {
                let mut s = smoother(1.0);
                s.set_immediate(1.0);
                s
            },
            smooth_resonance: smoother(0.0),
            smooth_env_depth: smoother(0.0),
            smooth_lfo_depth: smoother(0.0),
            smooth_key_depth: smoother(0.0),
            smooth_bend_depth: smoother(0.0),
            pitch_factor: 1.0,
            amp_mode: AmpMode::Envelope,
            lfo_mode: LfoTriggerMode::Keyed,
            pitch_bend_semitones: 0.0,
            octave_transpose: 0,
            volume: 0.8,
            presets: factory_bank(),
            current_preset: 0,
            buffers: RenderBuffers::new(),
            sample_rate,
        };

        for id in ParamId::ALL {
            engine.set_parameter(id, id.descriptor().default);
        }
        engine.load_preset(0);
        engine
    }

    /// Engine sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    // ------------------------------------------------------------------
    // Parameter interface
    // ------------------------------------------------------------------

    /// Write a parameter: range-clamp per the catalog, store, distribute
    /// to the owning component.
    pub fn set_parameter(&mut self, id: ParamId, value: f32) {
        let clamped = id.clamp(value);
        #[cfg(feature = "tracing")]
        if clamped != value {
            tracing::debug!(
                "param {} clamped: {value} -> {clamped}",
                id.key()
            );
        }
        self.params[id.index()] = clamped;
        self.distribute(id, clamped);
    }

    /// Read the stored (clamped) value of a parameter.
    pub fn get_parameter(&self, id: ParamId) -> f32 {
        self.params[id.index()]
    }

    fn distribute(&mut self, id: ParamId, value: f32) {
        match id {
            ParamId::VcaDepth => self.vca.set_parameter("amount", value),
            ParamId::VcaType => {
                self.amp_mode = AmpMode::from_value(value);
                for voice in &mut self.voices {
                    voice.set_amp_mode(self.amp_mode);
                }
            }
            ParamId::PwmDepth => {
                for voice in &mut self.voices {
                    voice.set_pwm_depth(value);
                }
            }
            ParamId::PwmSource => {
                let source = PwmSource::from_value(value);
                for voice in &mut self.voices {
                    voice.set_pwm_source(source);
                }
            }
            ParamId::SawLevel => self.each_dco("saw_level", value),
            ParamId::PulseLevel => self.each_dco("pulse_level", value),
            ParamId::SubLevel => self.each_dco("sub_level", value),
            ParamId::NoiseLevel => self.each_dco("noise_level", value),
            ParamId::PitchRange => {
                const FACTORS: [f32; 3] = [0.5, 1.0, 2.0];
                self.pitch_factor = FACTORS[(value as usize).min(2)];
            }
            ParamId::PitchModDepth => self.smooth_pitch_mod_depth.set_target(value),
            ParamId::VcfCutoff => self.smooth_cutoff.set_target(value),
            ParamId::VcfResonance => self.smooth_resonance.set_target(value),
            ParamId::VcfEnvDepth => self.smooth_env_depth.set_target(value),
            ParamId::VcfLfoDepth => self.smooth_lfo_depth.set_target(value),
            ParamId::VcfKeyDepth => self.smooth_key_depth.set_target(value),
            ParamId::VcfBendDepth => self.smooth_bend_depth.set_target(value),
            ParamId::EnvAttack => {
                let secs = ATTACK_CURVE.evaluate(value);
                for voice in &mut self.voices {
                    voice.normal_env.set_attack_secs(secs);
                }
            }
            ParamId::EnvDecay => {
                let secs = DECAY_CURVE.evaluate(value);
                for voice in &mut self.voices {
                    voice.normal_env.set_decay_secs(secs);
                }
            }
            ParamId::EnvSustain => {
                for voice in &mut self.voices {
                    voice.normal_env.set_sustain(value);
                }
            }
            ParamId::EnvRelease => {
                let secs = RELEASE_CURVE.evaluate(value);
                for voice in &mut self.voices {
                    voice.normal_env.set_release_secs(secs);
                }
            }
            ParamId::LfoTriggerMode => {
                let mode = LfoTriggerMode::from_value(value);
                if mode != self.lfo_mode {
                    self.lfo.shutdown();
                    self.lfo_mode = mode;
                    self.lfo.set_free_running(mode == LfoTriggerMode::Free);
                }
            }
            ParamId::LfoRate => self.lfo.set_frequency(LFO_RATE_CURVE.evaluate(value)),
            ParamId::LfoDelay => {
                self.lfo.set_delay_duration(LFO_DELAY_CURVE.evaluate(value));
                self.lfo.set_attack_duration(LFO_ATTACK_CURVE.evaluate(value));
            }
            ParamId::Hpf => self.hpf.set_parameter("amount", value),
            ParamId::ChorusI => self.chorus.set_mode_i(value >= 0.5),
            ParamId::ChorusII => self.chorus.set_mode_ii(value >= 0.5),
        }
    }

    fn each_dco(&mut self, name: &str, value: f32) {
        for voice in &mut self.voices {
            voice.set_dco_parameter(name, value);
        }
    }

    /// Select the shared LFO waveform (not a catalog parameter; the
    /// panel hard-wires it, hosts may retarget it).
    pub fn set_lfo_waveform(&mut self, waveform: LfoWaveform) {
        self.lfo.set_waveform(waveform);
    }

    // ------------------------------------------------------------------
    // Note control
    // ------------------------------------------------------------------

    /// Start a note. Never blocks and never drops: a free slot is used
    /// if one exists, else the first released slot, else slot 0 is
    /// stolen outright.
    pub fn note_on(&mut self, note: i32, velocity: f32) {
        let note = (note + self.octave_transpose * 12).clamp(0, 127) as u8;
        let velocity = velocity.clamp(0.0, 1.0);

        let idx = self.find_free_voice();
        self.voices[idx].set_amp_mode(self.amp_mode);
        self.voices[idx].assign(note, velocity);

        // Arm the keyed LFO only for the first key of a chord. The voice
        // just assigned does not count as held until its envelope starts
        // below, so a steal of a still-held voice keeps the ramp running.
        if self.lfo_mode == LfoTriggerMode::Keyed && !self.has_held_voices() {
            self.lfo.note_on();
        }

        let bend_factor = exp2f(self.pitch_bend_semitones / 12.0);
        self.voices[idx].trigger(bend_factor);
    }

    /// Release a note: the first assigned, matching, not-yet-released
    /// voice enters its release stage.
    ///
    /// First-index-match semantics: with rapidly repeated identical notes
    /// a stray unreleased duplicate can outlive its key. Deliberate —
    /// see the duplicate-note coverage in the integration tests.
    pub fn note_off(&mut self, note: i32) {
        let note = (note + self.octave_transpose * 12).clamp(0, 127) as u8;

        for voice in &mut self.voices {
            if voice.is_assigned() && voice.note() == note && !voice.is_released() {
                voice.release();
                break;
            }
        }

        if self.lfo_mode == LfoTriggerMode::Keyed && !self.has_held_voices() {
            self.lfo.shutdown();
        }
    }

    /// Silence every voice immediately — no release tails — and free the
    /// pool.
    pub fn all_notes_off(&mut self) {
        for voice in &mut self.voices {
            if voice.is_assigned() {
                voice.shutdown();
            }
        }
        if self.lfo_mode == LfoTriggerMode::Keyed {
            self.lfo.shutdown();
        }
    }

    /// Apply pitch bend in semitones, clamped to ±7. Live voices retune
    /// without retriggering their envelopes.
    pub fn pitch_bend(&mut self, semitones: f32) {
        let clamped = semitones.clamp(-BEND_RANGE_SEMITONES, BEND_RANGE_SEMITONES);
        #[cfg(feature = "tracing")]
        if clamped != semitones {
            tracing::debug!("pitch bend clamped: {semitones} -> {clamped}");
        }
        self.pitch_bend_semitones = clamped;

        let factor = exp2f(clamped / 12.0);
        for voice in &mut self.voices {
            voice.set_pitch_bend_factor(factor);
        }
    }

    /// Current pitch bend in semitones.
    pub fn pitch_bend_semitones(&self) -> f32 {
        self.pitch_bend_semitones
    }

    /// Number of assigned (sounding or releasing) voices.
    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_assigned()).count()
    }

    /// Read access to the voice pool (slot order is allocation order).
    pub fn voices(&self) -> &[Voice; MAX_VOICES] {
        &self.voices
    }

    /// Read access to the shared LFO.
    pub fn lfo(&self) -> &LfoWithEnvelope {
        &self.lfo
    }

    /// Whether any voice is assigned and not yet released.
    fn has_held_voices(&self) -> bool {
        self.voices.iter().any(|v| v.is_held())
    }

    /// First unassigned slot; else first released slot; else slot 0.
    ///
    /// First-match-by-index, not oldest-first: the tie-break is
    /// deliberately simplistic and deterministic.
    fn find_free_voice(&self) -> usize {
        if let Some(idx) = self.voices.iter().position(|v| !v.is_assigned()) {
            return idx;
        }
        if let Some(idx) = self.voices.iter().position(|v| v.is_released()) {
            return idx;
        }
        0
    }

    // ------------------------------------------------------------------
    // Preset and state interface
    // ------------------------------------------------------------------

    /// Apply a factory preset: every catalog value is republished to its
    /// consumer in one call. Returns the preset name, or `None` (logged,
    /// state untouched) for an out-of-range index.
    pub fn load_preset(&mut self, idx: usize) -> Option<&'static str> {
        let Some(preset) = self.presets.get(idx).copied() else {
            #[cfg(feature = "tracing")]
            tracing::debug!("ignoring out-of-range preset index {idx}");
            return None;
        };

        for (i, id) in ParamId::ALL.iter().enumerate() {
            self.set_parameter(*id, preset.values[i]);
        }
        self.current_preset = idx;
        Some(preset.name)
    }

    /// Number of available presets.
    pub fn preset_count(&self) -> usize {
        self.presets.len()
    }

    /// Index of the most recently loaded preset.
    pub fn current_preset(&self) -> usize {
        self.current_preset
    }

    /// Set master volume, clamped to 0..1.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Master volume.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set key transpose in octaves, clamped to ±3.
    pub fn set_octave_transpose(&mut self, octaves: i32) {
        let clamped = octaves.clamp(-MAX_OCTAVE_TRANSPOSE, MAX_OCTAVE_TRANSPOSE);
        #[cfg(feature = "tracing")]
        if clamped != octaves {
            tracing::debug!("octave transpose clamped: {octaves} -> {clamped}");
        }
        self.octave_transpose = clamped;
    }

    /// Key transpose in octaves.
    pub fn octave_transpose(&self) -> i32 {
        self.octave_transpose
    }

    /// Capture the full control state as a flat record: every catalog id
    /// exactly once, plus preset index, transpose and volume.
    pub fn serialize_state(&self) -> StateSnapshot {
        let mut values = [(ParamId::VcaDepth, 0.0); PARAM_COUNT];
        for (i, id) in ParamId::ALL.iter().enumerate() {
            values[i] = (*id, self.params[i]);
        }
        StateSnapshot {
            preset: self.current_preset,
            octave_transpose: self.octave_transpose,
            volume: self.volume,
            values,
        }
    }

    /// Restore a previously captured record. The preset is applied first,
    /// then transpose/volume, then every stored parameter value (which
    /// therefore wins over the preset). Everything is clamped on the way
    /// in; nothing here can fail.
    pub fn restore_state(&mut self, snapshot: &StateSnapshot) {
        self.load_preset(snapshot.preset);
        self.set_octave_transpose(snapshot.octave_transpose);
        self.set_volume(snapshot.volume);
        for (id, value) in snapshot.values {
            self.set_parameter(id, value);
        }
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Render interleaved stereo `i16` frames into `output`.
    ///
    /// `frames` is clamped to [`MAX_BLOCK`] and to the slice capacity;
    /// the slice is zero-filled first so short renders degrade to
    /// silence rather than garbage.
    pub fn render_block(&mut self, output: &mut [i16], frames: usize) {
        output.fill(0);
        let frames = frames.min(MAX_BLOCK).min(output.len() / 2);
        if frames == 0 {
            return;
        }

        self.render_internal(frames);

        let gain = self.volume;
        let bufs = &*self.buffers;
        for i in 0..frames {
            let l = (bufs.out_l[i] * gain * 32767.0) as i32;
            let r = (bufs.out_r[i] * gain * 32767.0) as i32;
            output[i * 2] = l.clamp(-32768, 32767) as i16;
            output[i * 2 + 1] = r.clamp(-32768, 32767) as i16;
        }
    }

    /// Render one block as stereo `f32`, master volume applied.
    pub fn render_block_f32(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len()).min(MAX_BLOCK);
        if frames == 0 {
            return;
        }

        self.render_internal(frames);

        let gain = self.volume;
        let bufs = &*self.buffers;
        for i in 0..frames {
            left[i] = bufs.out_l[i] * gain;
            right[i] = bufs.out_r[i] * gain;
        }
    }

    /// The fixed-order block pipeline, producing into the internal
    /// stereo scratch.
    fn render_internal(&mut self, frames: usize) {
        let bufs = &mut *self.buffers;
        bufs.mix[..frames].fill(0.0);

        // 1. Shared LFO
        self.lfo.process_block(&mut bufs.lfo[..frames]);

        // 2. Pitch detune bus: range factor times LFO vibrato
        for i in 0..frames {
            bufs.detune[i] = self.pitch_factor
                * exp2f(bufs.lfo[i] * 0.25 * self.smooth_pitch_mod_depth.advance());
        }

        // 3. Filter modulation buses. Base cutoff spans ~16.7 octaves
        // above the 7.8 Hz floor; resonance lifts it another half octave
        // to compensate the passband loss of rising feedback.
        for i in 0..frames {
            let cutoff = self.smooth_cutoff.advance();
            let resonance = self.smooth_resonance.advance();
            bufs.cutoff_octaves[i] = cutoff * (200.0 / 12.0) + resonance * 0.5;
            bufs.resonance[i] = resonance;
            bufs.env_depth[i] = self.smooth_env_depth.advance();
            bufs.lfo_octaves[i] = self.smooth_lfo_depth.advance() * bufs.lfo[i] * 3.0;
            bufs.key_depth[i] = self.smooth_key_depth.advance();
            bufs.bend_depth[i] = self.smooth_bend_depth.advance();
        }

        // 4. Voices accumulate into the mono mix bus
        let bend = self.pitch_bend_semitones;
        for voice in &mut self.voices {
            if voice.is_assigned() {
                voice.render(bufs, frames, bend);
            }
        }

        // 5. HPF -> VCA -> soft clip on the mono bus
        {
            let RenderBuffers { mix, post, .. } = bufs;
            self.hpf
                .process(&[&mix[..frames]], &mut [&mut post[..frames]], frames);
        }
        {
            let RenderBuffers { mix, post, .. } = bufs;
            self.vca
                .process(&[&post[..frames]], &mut [&mut mix[..frames]], frames);
        }
        for i in 0..frames {
            bufs.mix[i] = self.soft_clip.evaluate(bufs.mix[i]);
        }

        // 6. Chorus splits the bus into the stereo pair
        {
            let RenderBuffers {
                mix, out_l, out_r, ..
            } = bufs;
            self.chorus
                .process_block(&mix[..frames], &mut out_l[..frames], &mut out_r[..frames]);
        }
    }
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("sample_rate", &self.sample_rate)
            .field("active_voices", &self.active_voice_count())
            .field("current_preset", &self.current_preset)
            .field("octave_transpose", &self.octave_transpose)
            .finish_non_exhaustive()
    }
}
