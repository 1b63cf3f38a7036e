//! Cardinal directions as a 4-bit mask.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// A set of cardinal directions. Used for blocked-airflow masks,
    /// open adjacency and pressure flow direction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AtmosDirection: u8 {
        const NORTH = 1 << 0;
        const SOUTH = 1 << 1;
        const EAST = 1 << 2;
        const WEST = 1 << 3;
    }
}

impl AtmosDirection {
    /// The four single directions, in bit order.
    pub const CARDINALS: [AtmosDirection; 4] = [
        AtmosDirection::NORTH,
        AtmosDirection::SOUTH,
        AtmosDirection::EAST,
        AtmosDirection::WEST,
    ];

    /// Single directions in clockwise order, starting north.
    const CLOCKWISE: [AtmosDirection; 4] = [
        AtmosDirection::NORTH,
        AtmosDirection::EAST,
        AtmosDirection::SOUTH,
        AtmosDirection::WEST,
    ];

    /// Offsets matching [`Self::CLOCKWISE`].
    const CLOCKWISE_OFFSETS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

    fn clockwise_index(self) -> Option<usize> {
        Self::CLOCKWISE.iter().position(|d| *d == self)
    }

    /// Opposite of every direction in the set.
    pub fn opposite(self) -> AtmosDirection {
        self.rotate_clockwise(2)
    }

    /// Rotate every direction clockwise by `quarter_turns` × 90°.
    pub fn rotate_clockwise(self, quarter_turns: u8) -> AtmosDirection {
        self.iter()
            .filter_map(|dir| dir.clockwise_index())
            .map(|i| Self::CLOCKWISE[(i + quarter_turns as usize) % 4])
            .fold(AtmosDirection::empty(), |out, dir| out | dir)
    }

    /// Grid offset `(dx, dy)` of a single direction. North is +y.
    pub fn offset(self) -> (i32, i32) {
        self.clockwise_index()
            .map(|i| Self::CLOCKWISE_OFFSETS[i])
            .unwrap_or((0, 0))
    }

    /// Number of directions in the set.
    pub fn count(self) -> usize {
        self.bits().count_ones() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite() {
        assert_eq!(AtmosDirection::NORTH.opposite(), AtmosDirection::SOUTH);
        assert_eq!(
            (AtmosDirection::EAST | AtmosDirection::NORTH).opposite(),
            AtmosDirection::WEST | AtmosDirection::SOUTH
        );
        assert_eq!(AtmosDirection::all().opposite(), AtmosDirection::all());
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(AtmosDirection::NORTH.rotate_clockwise(1), AtmosDirection::EAST);
        assert_eq!(AtmosDirection::NORTH.rotate_clockwise(2), AtmosDirection::SOUTH);
        assert_eq!(AtmosDirection::WEST.rotate_clockwise(5), AtmosDirection::NORTH);
    }

    #[test]
    fn test_offsets_cancel_with_opposite() {
        for dir in AtmosDirection::CARDINALS {
            let (dx, dy) = dir.offset();
            let (ox, oy) = dir.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
    }

    #[test]
    fn test_rotating_a_set_keeps_its_size() {
        let corner = AtmosDirection::NORTH | AtmosDirection::EAST;
        assert_eq!(corner.rotate_clockwise(1), AtmosDirection::EAST | AtmosDirection::SOUTH);
        assert_eq!(AtmosDirection::all().rotate_clockwise(3), AtmosDirection::all());
        assert_eq!(AtmosDirection::empty().opposite(), AtmosDirection::empty());
        assert_eq!(corner.offset(), (0, 0));
    }
}
