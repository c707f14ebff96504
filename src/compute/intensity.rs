//! Mapping of raw cell states to display intensity.

use rayon::prelude::*;

use crate::snapshot::{FrameSequence, Snapshot};

/// Lookup table from raw state to intensity in [0, 1].
///
/// Built once from the highest state seen across the whole sequence.
#[derive(Debug, Clone)]
pub struct IntensityMap {
    max_state: u8,
    table: [f32; 256],
}

impl IntensityMap {
    /// Build the table for a sequence whose highest state is `max_state`.
    ///
    /// Binary automata (`max_state <= 1`) map states to themselves. For
    /// multi-state automata, 0 is dead (0.0), 1 is alive (1.0), and decay
    /// state `s` in `2..=max_state` fades as `1 - (s - 1) / max_state`.
    pub fn new(max_state: u8) -> Self {
        let mut table = [0.0f32; 256];
        table[1] = 1.0;
        if max_state > 1 {
            let max = max_state as f32;
            for (s, value) in table.iter_mut().enumerate().take(max_state as usize + 1).skip(2) {
                *value = 1.0 - (s as f32 - 1.0) / max;
            }
        }
        Self { max_state, table }
    }

    /// Build the table from a sequence's highest state.
    pub fn for_sequence(frames: &FrameSequence) -> Self {
        Self::new(frames.max_state())
    }

    pub fn max_state(&self) -> u8 {
        self.max_state
    }

    /// True when the automaton has decay states beyond alive/dead.
    pub fn is_multi_state(&self) -> bool {
        self.max_state > 1
    }

    #[inline]
    pub fn intensity(&self, state: u8) -> f32 {
        self.table[state as usize]
    }

    /// Map one snapshot to a row-major intensity grid.
    pub fn map_snapshot(&self, snapshot: &Snapshot) -> Vec<f32> {
        snapshot
            .cells()
            .iter()
            .map(|&s| self.intensity(s))
            .collect()
    }
}

/// Intensity grids, one per frame of the source sequence.
#[derive(Debug, Clone, Default)]
pub struct IntensityFrames {
    pub width: usize,
    pub height: usize,
    pub frames: Vec<Vec<f32>>,
}

impl IntensityFrames {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Map every frame of `frames` through a table built from its highest state.
pub fn map_intensities(frames: &FrameSequence) -> (IntensityMap, IntensityFrames) {
    let map = IntensityMap::for_sequence(frames);
    let (width, height) = frames.dimensions().unwrap_or((0, 0));
    let mapped = frames
        .frames()
        .par_iter()
        .map(|snapshot| map.map_snapshot(snapshot))
        .collect();

    (
        map,
        IntensityFrames {
            width,
            height,
            frames: mapped,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_identity() {
        let map = IntensityMap::new(1);
        assert!(!map.is_multi_state());
        assert_eq!(map.intensity(0), 0.0);
        assert_eq!(map.intensity(1), 1.0);

        let empty = IntensityMap::new(0);
        assert_eq!(empty.intensity(0), 0.0);
    }

    #[test]
    fn test_decay_states_fade() {
        let map = IntensityMap::new(4);
        assert!(map.is_multi_state());
        assert_eq!(map.intensity(0), 0.0);
        assert_eq!(map.intensity(1), 1.0);
        assert!((map.intensity(2) - 0.75).abs() < 1e-6);
        assert!((map.intensity(3) - 0.5).abs() < 1e-6);
        assert!((map.intensity(4) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_fade_is_monotonic() {
        let map = IntensityMap::new(200);
        for s in 2..200u8 {
            assert!(map.intensity(s + 1) < map.intensity(s));
            assert!(map.intensity(s) > 0.0 && map.intensity(s) < 1.0);
        }
        assert_eq!(map.intensity(0), 0.0);
    }

    #[test]
    fn test_map_sequence_uses_global_max() {
        // Only the second frame contains state 4; the first must still fade by 1/4.
        let a = Snapshot::new(2, 1, vec![3, 1]).unwrap();
        let b = Snapshot::new(2, 1, vec![4, 0]).unwrap();
        let frames = FrameSequence::new(vec![a, b]).unwrap();

        let (map, mapped) = map_intensities(&frames);
        assert_eq!(map.max_state(), 4);
        assert_eq!((mapped.width, mapped.height), (2, 1));
        assert_eq!(mapped.len(), 2);
        assert!((mapped.frames[0][0] - 0.5).abs() < 1e-6);
        assert_eq!(mapped.frames[0][1], 1.0);
        assert!((mapped.frames[1][0] - 0.25).abs() < 1e-6);
        assert_eq!(mapped.frames[1][1], 0.0);
    }
}
