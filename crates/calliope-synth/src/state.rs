//! Engine state snapshots.
//!
//! A snapshot is the flat key/value record the host round-trips for
//! patch persistence: every catalog parameter exactly once, plus the
//! preset index, octave transpose and master volume. Serialization to an
//! external text format is the host's business; the contract here is the
//! record itself.

use crate::params::{PARAM_COUNT, ParamId};

/// Flat record of the full engine control state.
#[derive(Clone, Copy, Debug)]
pub struct StateSnapshot {
    /// Current preset index.
    pub preset: usize,
    /// Key transpose in octaves, -3..=3.
    pub octave_transpose: i32,
    /// Master volume, 0..1.
    pub volume: f32,
    /// Every catalog parameter exactly once, in catalog order.
    pub values: [(ParamId, f32); PARAM_COUNT],
}

impl StateSnapshot {
    /// Look up a parameter value in the record.
    pub fn get(&self, id: ParamId) -> Option<f32> {
        self.values
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, value)| *value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::default_values;

    fn snapshot() -> StateSnapshot {
        let defaults = default_values();
        let mut values = [(ParamId::VcaDepth, 0.0); PARAM_COUNT];
        for (i, id) in ParamId::ALL.iter().enumerate() {
            values[i] = (*id, defaults[i]);
        }
        StateSnapshot {
            preset: 0,
            octave_transpose: 0,
            volume: 0.8,
            values,
        }
    }

    #[test]
    fn every_id_appears_exactly_once() {
        let snap = snapshot();
        for id in ParamId::ALL {
            let count = snap.values.iter().filter(|(e, _)| *e == id).count();
            assert_eq!(count, 1, "{} appears {count} times", id.key());
        }
    }

    #[test]
    fn get_finds_values() {
        let snap = snapshot();
        assert_eq!(snap.get(ParamId::SawLevel), Some(1.0));
        assert_eq!(snap.get(ParamId::ChorusI), Some(0.0));
    }
}
