//! Control-value smoothing for zipper-free parameter changes.
//!
//! Knob writes arrive as stepped values, possibly from a different thread
//! than the audio callback. [`SmoothedParam`] converts each step into a
//! per-sample exponential ramp so the audible result is a short fade
//! instead of a click. This is also the entire cross-thread story of the
//! engine: a parameter write is a single `f32` store (torn reads of one
//! float are benign), and the smoother absorbs whenever the store lands.
//!
//! ## Usage
//!
//! ```rust
//! use calliope_core::SmoothedParam;
//!
//! let mut cutoff = SmoothedParam::with_config(1.0, 44100.0, 10.0);
//!
//! cutoff.set_target(0.2);
//! for _ in 0..441 {
//!     let value = cutoff.advance(); // ramps toward 0.2
//! }
//! ```

use libm::expf;

/// One-pole exponential smoother for a single control value.
///
/// Difference equation: `y[n] = y[n-1] + coeff * (target - y[n-1])`, a
/// first-order lowpass on the control signal. With time constant `tau`
/// (seconds) the coefficient is `1 - exp(-1 / (tau * sample_rate))`; the
/// ramp covers ~63% of the remaining distance per `tau` and is effectively
/// settled after `5 * tau`.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    sample_rate: f32,
    smoothing_time_ms: f32,
}

impl SmoothedParam {
    /// Create a smoother holding `initial` with smoothing disabled.
    ///
    /// Call [`set_sample_rate`](Self::set_sample_rate) and
    /// [`set_smoothing_time_ms`](Self::set_smoothing_time_ms) to enable.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate: 44100.0,
            smoothing_time_ms: 0.0,
        }
    }

    /// Create a fully configured smoother.
    pub fn with_config(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        let mut param = Self::new(initial);
        param.sample_rate = sample_rate;
        param.smoothing_time_ms = smoothing_time_ms;
        param.recalculate_coeff();
        param
    }

    /// Set the value the smoother ramps toward.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Set target and snap the current value to it (no ramp).
    ///
    /// Used at voice start so a reclaimed voice does not inherit the
    /// previous note's in-flight ramp.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Update sample rate and recalculate the coefficient.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.recalculate_coeff();
    }

    /// Set the smoothing time constant in milliseconds.
    ///
    /// Zero disables smoothing (instant steps).
    pub fn set_smoothing_time_ms(&mut self, time_ms: f32) {
        self.smoothing_time_ms = time_ms;
        self.recalculate_coeff();
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current smoothed value, without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whether the ramp has reached its target (within epsilon).
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }

    /// Jump the ramp to its target immediately.
    #[inline]
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    fn recalculate_coeff(&mut self) {
        if self.smoothing_time_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples_per_tau = self.smoothing_time_ms / 1000.0 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples_per_tau);
        }
    }
}

impl Default for SmoothedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}
