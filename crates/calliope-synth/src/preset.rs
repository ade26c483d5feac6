//! Factory presets.
//!
//! A preset is a complete bundle of catalog values plus a display name.
//! Loading one republishes every parameter through the normal
//! distribution path in a single call. Preset files and on-disk storage
//! live outside the engine; this module only carries the compiled-in
//! factory bank.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

use crate::params::{PARAM_COUNT, ParamId, default_values};

/// A named bundle of values for every catalog parameter.
#[derive(Clone, Copy, Debug)]
pub struct Preset {
    /// Display name.
    pub name: &'static str,
    /// One value per catalog parameter, in catalog order.
    pub values: [f32; PARAM_COUNT],
}

/// Build a preset from the catalog defaults plus a list of edits.
fn patch(name: &'static str, edits: &[(ParamId, f32)]) -> Preset {
    let mut values = default_values();
    for &(id, value) in edits {
        values[id.index()] = id.clamp(value);
    }
    Preset { name, values }
}

/// The compiled-in factory bank. Index 0 is the panel-default patch.
pub fn factory_bank() -> Vec<Preset> {
    use ParamId::*;
    vec![
        patch("Init", &[]),
        patch(
            "Lush Strings",
            &[
                (SawLevel, 1.0),
                (EnvAttack, 0.45),
                (EnvSustain, 1.0),
                (EnvRelease, 0.5),
                (VcfCutoff, 0.45),
                (VcfKeyDepth, 0.6),
                (Hpf, 0.25),
                (ChorusI, 1.0),
            ],
        ),
        patch(
            "Round Bass",
            &[
                (SawLevel, 0.0),
                (PulseLevel, 1.0),
                (SubLevel, 0.8),
                (PitchRange, 0.0),
                (VcfCutoff, 0.3),
                (VcfEnvDepth, 0.5),
                (VcfKeyDepth, 0.4),
                (EnvDecay, 0.4),
                (EnvSustain, 0.2),
                (EnvRelease, 0.15),
            ],
        ),
        patch(
            "Hollow Organ",
            &[
                (SawLevel, 0.0),
                (PulseLevel, 0.8),
                (SubLevel, 0.6),
                (VcaType, 1.0),
                (VcfCutoff, 0.7),
                (EnvSustain, 1.0),
                (ChorusII, 1.0),
            ],
        ),
        patch(
            "Sweep Pad",
            &[
                (SawLevel, 1.0),
                (PulseLevel, 0.4),
                (EnvAttack, 0.6),
                (EnvDecay, 0.7),
                (EnvSustain, 0.7),
                (EnvRelease, 0.6),
                (VcfCutoff, 0.2),
                (VcfEnvDepth, 0.6),
                (VcfLfoDepth, 0.3),
                (LfoRate, 0.3),
                (LfoDelay, 0.5),
                (ChorusI, 1.0),
                (ChorusII, 1.0),
            ],
        ),
        patch(
            "Clock Pulse",
            &[
                (SawLevel, 0.0),
                (PulseLevel, 1.0),
                (PwmSource, 1.0),
                (PwmDepth, 0.8),
                (LfoRate, 0.45),
                (LfoTriggerMode, 0.0),
                (VcfCutoff, 0.6),
                (EnvSustain, 1.0),
            ],
        ),
    ]
}
