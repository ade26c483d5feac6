//! Parameter catalog.
//!
//! The engine exposes 26 panel parameters. Each has a static descriptor
//! — key, display name, range, default — and every write anywhere in the
//! engine is clamped to the descriptor's range before distribution.
//! Ranges are raw knob/selector units; mapping to physical units happens
//! at the consumer (see [`crate::tables`]).

/// Identifier for each of the 26 panel parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamId {
    /// Output amplifier depth (0..1, unity at 0.5).
    VcaDepth,
    /// Amplitude path selector: 0 = envelope, 1 = gate.
    VcaType,
    /// Pulse-width modulation depth (0..1).
    PwmDepth,
    /// PWM source selector: 0 = manual, 1 = LFO, 2 = envelope.
    PwmSource,
    /// Sawtooth mix level (0..1).
    SawLevel,
    /// Pulse mix level (0..1).
    PulseLevel,
    /// Sub-octave square mix level (0..1).
    SubLevel,
    /// Noise mix level (0..1).
    NoiseLevel,
    /// Octave range selector: 0 = 16', 1 = 8', 2 = 4'.
    PitchRange,
    /// LFO-to-pitch modulation depth (0..1).
    PitchModDepth,
    /// Filter cutoff knob (0..1).
    VcfCutoff,
    /// Filter resonance knob (0..1).
    VcfResonance,
    /// Filter envelope modulation depth (-1..1, bipolar).
    VcfEnvDepth,
    /// Filter LFO modulation depth (0..1).
    VcfLfoDepth,
    /// Filter keyboard tracking depth (0..1).
    VcfKeyDepth,
    /// Filter pitch-bend depth (0..1).
    VcfBendDepth,
    /// Envelope attack knob (0..1).
    EnvAttack,
    /// Envelope decay knob (0..1).
    EnvDecay,
    /// Envelope sustain level (0..1).
    EnvSustain,
    /// Envelope release knob (0..1).
    EnvRelease,
    /// LFO trigger policy: 0 = free-running, 1 = key-triggered.
    LfoTriggerMode,
    /// LFO rate knob (0..1).
    LfoRate,
    /// LFO delay knob (0..1).
    LfoDelay,
    /// High-pass amount (0..1).
    Hpf,
    /// Chorus mode I toggle (0 or 1).
    ChorusI,
    /// Chorus mode II toggle (0 or 1).
    ChorusII,
}

/// Number of catalog parameters.
pub const PARAM_COUNT: usize = 26;

/// Static description of one parameter: key, range, default.
#[derive(Clone, Copy, Debug)]
pub struct ParamDescriptor {
    /// Stable string key, used by presets and state snapshots.
    pub key: &'static str,
    /// Human-readable display name.
    pub name: &'static str,
    /// Inclusive range minimum.
    pub min: f32,
    /// Inclusive range maximum.
    pub max: f32,
    /// Power-on default.
    pub default: f32,
    /// Whether the parameter selects between discrete positions.
    pub stepped: bool,
}

/// Catalog table, indexed by [`ParamId::index`].
static CATALOG: [ParamDescriptor; PARAM_COUNT] = [
    ParamDescriptor { key: "vca_depth", name: "VCA Depth", min: 0.0, max: 1.0, default: 0.5, stepped: false },
    ParamDescriptor { key: "vca_type", name: "VCA Type", min: 0.0, max: 1.0, default: 0.0, stepped: true },
    ParamDescriptor { key: "pwm_depth", name: "PWM Depth", min: 0.0, max: 1.0, default: 0.5, stepped: false },
    ParamDescriptor { key: "pwm_mod", name: "PWM Mod", min: 0.0, max: 2.0, default: 0.0, stepped: true },
    ParamDescriptor { key: "saw_level", name: "Saw Level", min: 0.0, max: 1.0, default: 1.0, stepped: false },
    ParamDescriptor { key: "pulse_level", name: "Pulse Level", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "sub_level", name: "Sub Level", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "noise_level", name: "Noise Level", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "pitch_range", name: "Range", min: 0.0, max: 2.0, default: 1.0, stepped: true },
    ParamDescriptor { key: "pitch_mod", name: "Pitch Mod", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "vcf_cutoff", name: "VCF Cutoff", min: 0.0, max: 1.0, default: 0.5, stepped: false },
    ParamDescriptor { key: "vcf_resonance", name: "VCF Reso", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "vcf_env", name: "VCF Env", min: -1.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "vcf_lfo", name: "VCF LFO", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "vcf_key", name: "VCF Key", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "vcf_bend", name: "VCF Bend", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "attack", name: "Attack", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "decay", name: "Decay", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "sustain", name: "Sustain", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "release", name: "Release", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "lfo_trigger", name: "LFO Trigger", min: 0.0, max: 1.0, default: 1.0, stepped: true },
    ParamDescriptor { key: "lfo_rate", name: "LFO Rate", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "lfo_delay", name: "LFO Delay", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "hpf", name: "HPF", min: 0.0, max: 1.0, default: 0.0, stepped: false },
    ParamDescriptor { key: "chorus_i", name: "Chorus I", min: 0.0, max: 1.0, default: 0.0, stepped: true },
    ParamDescriptor { key: "chorus_ii", name: "Chorus II", min: 0.0, max: 1.0, default: 0.0, stepped: true },
];

impl ParamId {
    /// Every parameter, in catalog order.
    pub const ALL: [ParamId; PARAM_COUNT] = [
        ParamId::VcaDepth,
        ParamId::VcaType,
        ParamId::PwmDepth,
        ParamId::PwmSource,
        ParamId::SawLevel,
        ParamId::PulseLevel,
        ParamId::SubLevel,
        ParamId::NoiseLevel,
        ParamId::PitchRange,
        ParamId::PitchModDepth,
        ParamId::VcfCutoff,
        ParamId::VcfResonance,
        ParamId::VcfEnvDepth,
        ParamId::VcfLfoDepth,
        ParamId::VcfKeyDepth,
        ParamId::VcfBendDepth,
        ParamId::EnvAttack,
        ParamId::EnvDecay,
        ParamId::EnvSustain,
        ParamId::EnvRelease,
        ParamId::LfoTriggerMode,
        ParamId::LfoRate,
        ParamId::LfoDelay,
        ParamId::Hpf,
        ParamId::ChorusI,
        ParamId::ChorusII,
    ];

    /// Catalog index of this parameter.
    #[inline]
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&id| id == self).unwrap_or(0)
    }

    /// Static descriptor for this parameter.
    pub fn descriptor(self) -> &'static ParamDescriptor {
        &CATALOG[self.index()]
    }

    /// Stable string key.
    pub fn key(self) -> &'static str {
        self.descriptor().key
    }

    /// Clamp a raw value into this parameter's range.
    #[inline]
    pub fn clamp(self, value: f32) -> f32 {
        let d = self.descriptor();
        value.clamp(d.min, d.max)
    }

    /// Look a parameter up by its string key.
    pub fn from_key(key: &str) -> Option<ParamId> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.descriptor().key == key)
    }
}

/// Default value for every parameter, in catalog order.
pub fn default_values() -> [f32; PARAM_COUNT] {
    let mut values = [0.0; PARAM_COUNT];
    for (i, descriptor) in CATALOG.iter().enumerate() {
        values[i] = descriptor.default;
    }
    values
}
