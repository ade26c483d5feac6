//! Property-based tests for the chorus.
//!
//! Uses proptest to verify fundamental invariants over arbitrary inputs
//! and button states: finite output, bounded output, and exact dry
//! pass-through when disabled.

use calliope_effects::BbdChorus;
use proptest::prelude::*;

fn run(chorus: &mut BbdChorus, input: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let mut left = vec![0.0; input.len()];
    let mut right = vec![0.0; input.len()];
    chorus.process_block(input, &mut left, &mut right);
    (left, right)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// For any finite input in [-1, 1] and any button state, the chorus
    /// must produce finite output.
    #[test]
    fn chorus_finite_output(
        input in prop::collection::vec(-1.0f32..=1.0f32, 64..512),
        mode_i in any::<bool>(),
        mode_ii in any::<bool>(),
    ) {
        let mut chorus = BbdChorus::new(44100.0);
        chorus.set_mode_i(mode_i);
        chorus.set_mode_ii(mode_ii);

        let (left, right) = run(&mut chorus, &input);
        for i in 0..input.len() {
            prop_assert!(left[i].is_finite(), "Left not finite at {i}");
            prop_assert!(right[i].is_finite(), "Right not finite at {i}");
        }
    }

    /// For input in [-1, 1], output stays bounded: the wet path is a
    /// unity-gain delay, so dry/wet mixing cannot exceed ~2x input level.
    #[test]
    fn chorus_bounded_output(
        input in prop::collection::vec(-1.0f32..=1.0f32, 64..512),
        mode_i in any::<bool>(),
        mode_ii in any::<bool>(),
    ) {
        let mut chorus = BbdChorus::new(44100.0);
        chorus.set_mode_i(mode_i);
        chorus.set_mode_ii(mode_ii);

        let (left, right) = run(&mut chorus, &input);
        for i in 0..input.len() {
            prop_assert!(left[i].abs() <= 2.0, "Left {} exceeds bound at {i}", left[i]);
            prop_assert!(right[i].abs() <= 2.0, "Right {} exceeds bound at {i}", right[i]);
        }
    }

    /// With both buttons off, both channels equal the dry input exactly,
    /// for any input whatsoever.
    #[test]
    fn chorus_disabled_is_identity(
        input in prop::collection::vec(-1.0f32..=1.0f32, 1..512),
    ) {
        let mut chorus = BbdChorus::new(44100.0);
        let (left, right) = run(&mut chorus, &input);
        for i in 0..input.len() {
            prop_assert_eq!(left[i], input[i]);
            prop_assert_eq!(right[i], input[i]);
        }
    }
}
