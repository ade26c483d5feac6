//! Calliope Effects - the analog delay-line chorus
//!
//! One effect lives here: [`BbdChorus`], the bucket-brigade chorus that
//! turns the engine's mono bus into the stereo output pair. It is built
//! on [`calliope_core::BbdDelayLine`] and owns its own low-rate
//! modulator, independent of the synth's shared LFO.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod chorus;

pub use chorus::BbdChorus;
