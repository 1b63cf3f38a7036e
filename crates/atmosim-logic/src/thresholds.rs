//! Tunable epsilons for gas sharing and comparison.

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Thresholds consulted by [`crate::mixture::GasMixture::share`] and
/// [`crate::mixture::GasMixture::compare`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasThresholds {
    pub minimum_moles_delta_to_move: f32,
    pub minimum_air_ratio_to_move: f32,
    pub minimum_air_to_suspend: f32,
    pub minimum_temperature_delta_to_suspend: f32,
    pub minimum_temperature_delta_to_consider: f32,
    pub minimum_temperature_to_move: f32,
    pub open_heat_transfer_coefficient: f32,
}

impl Default for GasThresholds {
    fn default() -> Self {
        Self {
            minimum_moles_delta_to_move: MINIMUM_MOLES_DELTA_TO_MOVE,
            minimum_air_ratio_to_move: MINIMUM_AIR_RATIO_TO_MOVE,
            minimum_air_to_suspend: MINIMUM_AIR_TO_SUSPEND,
            minimum_temperature_delta_to_suspend: MINIMUM_TEMPERATURE_DELTA_TO_SUSPEND,
            minimum_temperature_delta_to_consider: MINIMUM_TEMPERATURE_DELTA_TO_CONSIDER,
            minimum_temperature_to_move: MINIMUM_TEMPERATURE_TO_MOVE,
            open_heat_transfer_coefficient: OPEN_HEAT_TRANSFER_COEFFICIENT,
        }
    }
}
