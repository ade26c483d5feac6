//! Panel curve tables.
//!
//! The front panel exposes every control as a 0..1 knob position; these
//! tables carry the measured mapping from position to physical unit.
//! Envelope times and LFO rates follow strongly exponential-feeling
//! curves, captured here as five-point piecewise-linear approximations.

use calliope_core::LerpTable;

/// LFO rate knob to frequency in Hz.
pub static LFO_RATE_CURVE: LerpTable =
    LerpTable::from_breakpoints(&[0.3, 0.85, 3.39, 11.49, 22.22], 0.0, 1.0);

/// LFO delay knob to onset delay in seconds.
pub static LFO_DELAY_CURVE: LerpTable =
    LerpTable::from_breakpoints(&[0.0, 0.0639, 0.85, 1.2, 2.685], 0.0, 1.0);

/// LFO delay knob to amplitude ramp-up duration in seconds.
///
/// The single delay knob sets both the onset delay and the attack ramp;
/// longer delays also fade in more gradually.
pub static LFO_ATTACK_CURVE: LerpTable =
    LerpTable::from_breakpoints(&[0.001, 0.053, 0.188, 0.348, 1.15], 0.0, 1.0);

/// High-pass knob to corner frequency in Hz.
pub static HPF_FREQ_CURVE: LerpTable =
    LerpTable::from_breakpoints(&[140.0, 250.0, 520.0, 1220.0], 0.0, 1.0);

/// Envelope attack knob to duration in seconds.
pub static ATTACK_CURVE: LerpTable =
    LerpTable::from_breakpoints(&[0.001, 0.03, 0.24, 0.65, 3.25], 0.0, 1.0);

/// Envelope decay knob to duration in seconds.
pub static DECAY_CURVE: LerpTable =
    LerpTable::from_breakpoints(&[0.002, 0.096, 0.984, 4.449, 19.783], 0.0, 1.0);

/// Envelope release knob to duration in seconds. Shares the decay taper.
pub static RELEASE_CURVE: LerpTable =
    LerpTable::from_breakpoints(&[0.002, 0.096, 0.984, 4.449, 19.783], 0.0, 1.0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_range_matches_panel() {
        assert_eq!(ATTACK_CURVE.evaluate(0.0), 0.001);
        assert_eq!(ATTACK_CURVE.evaluate(1.0), 3.25);
    }

    #[test]
    fn lfo_rate_is_monotonic() {
        let mut prev = LFO_RATE_CURVE.evaluate(0.0);
        for i in 1..=50 {
            let v = LFO_RATE_CURVE.evaluate(i as f32 / 50.0);
            assert!(v > prev);
            prev = v;
        }
    }

    #[test]
    fn hpf_corner_starts_gentle() {
        assert_eq!(HPF_FREQ_CURVE.evaluate(0.0), 140.0);
        assert_eq!(HPF_FREQ_CURVE.evaluate(1.0), 1220.0);
    }
}
