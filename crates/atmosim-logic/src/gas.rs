//! Gas species and their thermal properties.

use serde::{Deserialize, Serialize};

/// Number of simulated gas species.
pub const GAS_COUNT: usize = 6;

/// A simulated gas species. The discriminant is the index into a
/// mixture's mole array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Gas {
    Oxygen = 0,
    Nitrogen = 1,
    CarbonDioxide = 2,
    Plasma = 3,
    Tritium = 4,
    WaterVapor = 5,
}

impl Gas {
    /// All species, in index order.
    pub const ALL: [Gas; GAS_COUNT] = [
        Gas::Oxygen,
        Gas::Nitrogen,
        Gas::CarbonDioxide,
        Gas::Plasma,
        Gas::Tritium,
        Gas::WaterVapor,
    ];

    /// Index into a mole array.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a species by index.
    pub fn from_index(index: usize) -> Option<Gas> {
        Self::ALL.get(index).copied()
    }

    /// Molar specific heat, J/(mol·K).
    pub fn specific_heat(self) -> f32 {
        SPECIFIC_HEATS[self.index()]
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Gas::Oxygen => "oxygen",
            Gas::Nitrogen => "nitrogen",
            Gas::CarbonDioxide => "carbon dioxide",
            Gas::Plasma => "plasma",
            Gas::Tritium => "tritium",
            Gas::WaterVapor => "water vapor",
        }
    }
}

/// Molar specific heats indexed by [`Gas::index`].
pub const SPECIFIC_HEATS: [f32; GAS_COUNT] = [20.0, 30.0, 30.0, 200.0, 10.0, 40.0];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for gas in Gas::ALL {
            assert_eq!(Gas::from_index(gas.index()), Some(gas));
        }
        assert_eq!(Gas::from_index(GAS_COUNT), None);
    }

    #[test]
    fn test_plasma_holds_most_heat() {
        let max = Gas::ALL
            .iter()
            .max_by(|a, b| a.specific_heat().total_cmp(&b.specific_heat()));
        assert_eq!(max, Some(&Gas::Plasma));
    }
}
