//! Simple gas devices used by the harness scenarios.

use atmosim_core::devices::{AtmosDevice, TileGasAccess};
use atmosim_core::tile::TileCoord;
use atmosim_logic::{Gas, GasMixture};

/// Pumps gas from an internal tank into a tile up to a target pressure,
/// raising the tile by at most `pressure_rate` kPa per second.
pub struct AirVent {
    pub tile: TileCoord,
    pub tank: GasMixture,
    pub target_pressure: f32,
    pub pressure_rate: f32,
}

impl AtmosDevice for AirVent {
    fn update(&mut self, atmos: &mut dyn TileGasAccess, dt: f32) {
        let Some(current) = atmos.tile_mixture(self.tile).map(|a| a.pressure()) else {
            return;
        };
        if current >= self.target_pressure {
            return;
        }
        let target = self.target_pressure.min(current + self.pressure_rate * dt);
        let tank = &mut self.tank;
        atmos.modify_tile_mixture(self.tile, &mut |air| {
            tank.pump_gas_to(air, target);
        });
    }
}

/// Pulls a fraction of a tile's air through a filter each second, keeping
/// the filtered species.
pub struct Scrubber {
    pub tile: TileCoord,
    pub gases: Vec<Gas>,
    /// Fraction of the tile's air processed per second.
    pub rate: f32,
    pub collected: GasMixture,
}

impl AtmosDevice for Scrubber {
    fn update(&mut self, atmos: &mut dyn TileGasAccess, dt: f32) {
        let has_target = atmos
            .tile_mixture(self.tile)
            .map(|air| self.gases.iter().any(|g| air.moles(*g) > 0.0))
            .unwrap_or(false);
        if !has_target {
            return;
        }
        let ratio = (self.rate * dt).min(1.0);
        let gases = &self.gases;
        let collected = &mut self.collected;
        atmos.modify_tile_mixture(self.tile, &mut |air| {
            let mut portion = air.remove_ratio(ratio);
            portion.scrub_into(collected, gases);
            air.merge(&portion);
        });
    }
}
