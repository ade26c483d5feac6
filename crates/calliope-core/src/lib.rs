//! Calliope Core - DSP primitives for the calliope voice engine
//!
//! Foundational building blocks shared by the synth and effects crates,
//! designed for real-time audio processing with zero allocation in the
//! audio path.
//!
//! # Components
//!
//! - [`LerpTable`] - Piecewise-linear lookup for knob-to-unit mapping and
//!   transfer curves
//! - [`SmoothedParam`] - One-pole exponential parameter smoother for
//!   zipper-free control changes
//! - [`OnePole`] - 6 dB/oct lowpass used for tone shaping and companion
//!   filtering
//! - [`BbdDelayLine`] - Bucket-brigade device model: a clocked analog
//!   delay chain with companion anti-alias filtering
//! - Math helpers: [`db_to_linear`], [`linear_to_db`], [`flush_denormal`]
//!
//! # Concurrency
//!
//! Control-rate setters write plain `f32` scalars; torn reads of a single
//! float-sized value are benign, and every audible consequence is routed
//! through a [`SmoothedParam`] ramp. No locking is used anywhere on the
//! render path.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! calliope-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod bbd;
pub mod curve;
pub mod math;
pub mod one_pole;
pub mod param;

// Re-export main types at crate root
pub use bbd::BbdDelayLine;
pub use curve::LerpTable;
pub use math::{db_to_linear, flush_denormal, linear_to_db};
pub use one_pole::OnePole;
pub use param::SmoothedParam;
