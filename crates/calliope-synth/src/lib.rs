//! Calliope Synth - polyphonic analog-modeled voice engine
//!
//! Turns note events and a 26-parameter panel into a stereo stream that
//! behaves like a classic one-oscillator subtractive polysynth: DCO
//! mixture → four-stage resonant lowpass → envelope/gate amplitude path,
//! six voices summed onto a mono bus, then high-pass, output amplifier,
//! soft clip and the bucket-brigade chorus for the stereo split.
//!
//! # Architecture
//!
//! - [`Engine`] - voice scheduler, parameter distribution and the
//!   fixed-order block render pipeline
//! - [`Voice`] - one note: DCO block, [`ResonantFilter`], envelope pair
//! - [`AdsrEnvelope`] - the per-voice envelope state machine
//! - [`LfoWithEnvelope`] - the shared LFO with its delay+attack window
//! - [`BlockDsp`] - the opaque-block contract for the generated
//!   oscillator/amplifier stages ([`DcoBlock`], [`HighPassBlock`],
//!   [`AmplifierBlock`])
//! - [`ParamId`] - the static parameter catalog
//!
//! # Example
//!
//! ```rust
//! use calliope_synth::{Engine, ParamId};
//!
//! let mut engine = Engine::new(44100.0);
//! engine.set_parameter(ParamId::EnvSustain, 1.0);
//! engine.note_on(60, 1.0); // middle C
//!
//! let mut out = [0i16; 512];
//! engine.render_block(&mut out, 256);
//!
//! engine.note_off(60);
//! ```
//!
//! # Threading
//!
//! The render path is single-threaded and callback-driven; parameter and
//! note mutators may run on a control thread without locks. Every
//! externally mutable control is a single `f32` store — torn reads of a
//! float-sized value are benign — and all audible effect is mediated by
//! per-sample smoothers, so an asynchronous write lands as a short ramp,
//! not a click. See [`Engine`] for the full contract.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod block;
pub mod engine;
pub mod envelope;
pub mod filter;
pub mod lfo;
pub mod params;
pub mod preset;
pub mod state;
pub mod tables;
pub mod voice;

// Re-export main types at crate root
pub use block::{AmplifierBlock, BlockDsp, DcoBlock, HighPassBlock};
pub use engine::{BEND_RANGE_SEMITONES, Engine, LfoTriggerMode, MAX_BLOCK, MAX_VOICES};
pub use envelope::{AdsrEnvelope, EnvelopeState};
pub use filter::ResonantFilter;
pub use lfo::{LfoWaveform, LfoWithEnvelope};
pub use params::{PARAM_COUNT, ParamDescriptor, ParamId};
pub use preset::{Preset, factory_bank};
pub use state::StateSnapshot;
pub use voice::{AmpMode, PwmSource, Voice, midi_to_freq};

// Re-export commonly used types from the support crates
pub use calliope_core::{BbdDelayLine, LerpTable, SmoothedParam};
pub use calliope_effects::BbdChorus;
