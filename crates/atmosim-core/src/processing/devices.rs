//! Devices phase: every registered device exchanges gas with its tiles.

use super::{PhaseContext, PhaseResult};
use crate::budget::ProcessingBudget;
use crate::grid::GridAtmosphere;

pub fn run(
    grid: &mut GridAtmosphere,
    ctx: &mut PhaseContext<'_>,
    budget: &mut ProcessingBudget,
    resumed: bool,
) -> PhaseResult {
    if !resumed {
        grid.device_cursor = 0;
    }
    let dt = ctx.config.real_atmos_time();

    // Devices get the grid as their gas access, so they sit outside it
    // while they run.
    let mut devices = std::mem::take(&mut grid.devices);
    let mut result = PhaseResult::Complete;
    while grid.device_cursor < devices.len() {
        let (_, device) = &mut devices[grid.device_cursor];
        device.update(grid, dt);
        grid.device_cursor += 1;
        grid.stats.devices_updated += 1;
        if budget.tick() && grid.device_cursor < devices.len() {
            result = PhaseResult::Paused;
            break;
        }
    }
    devices.append(&mut grid.devices);
    grid.devices = devices;

    if result == PhaseResult::Complete {
        grid.device_cursor = 0;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AtmosConfig, TileDefaults};
    use crate::devices::{AtmosDevice, TileGasAccess};
    use crate::grid::GridId;
    use crate::occupants::Occupants;
    use crate::tile::{TileCoord, TileKind};
    use atmosim_logic::constants::{CELL_VOLUME, T20C};
    use atmosim_logic::{Gas, GasMixture};

    /// Adds a fixed amount of nitrogen per second.
    struct Injector {
        at: TileCoord,
        moles_per_second: f32,
    }

    impl AtmosDevice for Injector {
        fn update(&mut self, atmos: &mut dyn TileGasAccess, dt: f32) {
            let amount = self.moles_per_second * dt;
            atmos.modify_tile_mixture(self.at, &mut |air| air.adjust_moles(Gas::Nitrogen, amount));
        }
    }

    fn grid_with_injectors(n: usize) -> GridAtmosphere {
        let mut grid = GridAtmosphere::new(
            GridId(0),
            GasMixture::standard_air(CELL_VOLUME, T20C),
            TileDefaults::default(),
        );
        let at = TileCoord::new(0, 0);
        grid.add_tile(at, TileKind::Floor);
        for _ in 0..n {
            grid.add_device(Box::new(Injector {
                at,
                moles_per_second: 1.0,
            }));
        }
        grid
    }

    #[test]
    fn test_devices_update_with_cycle_time() {
        let config = AtmosConfig::default();
        let occupants = Occupants::new();
        let mut ctx = PhaseContext {
            config: &config,
            occupants: &occupants,
            listeners: &mut [],
        };
        let mut grid = grid_with_injectors(2);
        let before = grid.tile_mixture(TileCoord::new(0, 0)).map(|a| a.moles(Gas::Nitrogen)).unwrap_or(0.0);
        let result = run(&mut grid, &mut ctx, &mut ProcessingBudget::unlimited(), false);
        assert_eq!(result, PhaseResult::Complete);
        let after = grid.tile_mixture(TileCoord::new(0, 0)).map(|a| a.moles(Gas::Nitrogen)).unwrap_or(0.0);
        assert!((after - before - 2.0 * config.real_atmos_time()).abs() < 1e-3);
        assert!(grid.is_active(TileCoord::new(0, 0)));
        assert_eq!(grid.device_count(), 2);
    }

    #[test]
    fn test_paused_devices_resume_at_cursor() {
        let config = AtmosConfig::default();
        let occupants = Occupants::new();
        let mut ctx = PhaseContext {
            config: &config,
            occupants: &occupants,
            listeners: &mut [],
        };
        let mut grid = grid_with_injectors(3);
        let first = run(&mut grid, &mut ctx, &mut ProcessingBudget::with_item_limit(2), false);
        assert_eq!(first, PhaseResult::Paused);
        assert_eq!(grid.stats().devices_updated, 2);
        let second = run(&mut grid, &mut ctx, &mut ProcessingBudget::unlimited(), true);
        assert_eq!(second, PhaseResult::Complete);
        assert_eq!(grid.stats().devices_updated, 3);
    }
}
