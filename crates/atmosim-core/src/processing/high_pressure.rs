//! High pressure phase: report strong pressure differentials so the host
//! can push loose objects around, then reset the accumulators.

use atmosim_logic::AtmosDirection;

use super::{drain_tiles, start_run, PhaseContext, PhaseResult};
use crate::budget::ProcessingBudget;
use crate::grid::{GridAtmosphere, GridId};
use crate::tile::TileCoord;

/// A tile pushing air hard in one direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureMovement {
    pub grid: GridId,
    pub tile: TileCoord,
    pub direction: AtmosDirection,
    /// kPa.
    pub pressure_difference: f32,
}

/// Receives pressure movements. Registered on the engine.
pub trait PressureListener {
    fn on_pressure_movement(&mut self, movement: &PressureMovement);
}

pub fn run(
    grid: &mut GridAtmosphere,
    ctx: &mut PhaseContext<'_>,
    budget: &mut ProcessingBudget,
    resumed: bool,
) -> PhaseResult {
    if !resumed {
        let flagged = std::mem::take(&mut grid.high_pressure_delta);
        start_run(grid, false, flagged);
    }
    let threshold = ctx.config.high_pressure.movement_threshold;
    let listeners = &mut *ctx.listeners;
    drain_tiles(grid, budget, |grid, coord| {
        if let Some(movement) = take_movement(grid, coord) {
            if movement.pressure_difference > threshold {
                for listener in listeners.iter_mut() {
                    listener.on_pressure_movement(&movement);
                }
                grid.stats.pressure_movements += 1;
            }
        }
    })
}

/// Read and reset a tile's accumulated differential.
fn take_movement(grid: &mut GridAtmosphere, coord: TileCoord) -> Option<PressureMovement> {
    let id = grid.id;
    let tile = grid.tile_mut(coord)?;
    let movement = PressureMovement {
        grid: id,
        tile: coord,
        direction: tile.pressure_direction,
        pressure_difference: tile.pressure_difference,
    };
    tile.last_pressure_direction = tile.pressure_direction;
    tile.pressure_difference = 0.0;
    tile.pressure_direction = AtmosDirection::empty();
    Some(movement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AtmosConfig, TileDefaults};
    use crate::occupants::Occupants;
    use crate::tile::TileKind;
    use atmosim_logic::constants::{CELL_VOLUME, T20C};
    use atmosim_logic::GasMixture;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<PressureMovement>>>);

    impl PressureListener for Recorder {
        fn on_pressure_movement(&mut self, movement: &PressureMovement) {
            self.0.borrow_mut().push(*movement);
        }
    }

    #[test]
    fn test_movements_reported_and_reset() {
        let config = AtmosConfig::default();
        let occupants = Occupants::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners: Vec<Box<dyn PressureListener>> = vec![Box::new(Recorder(seen.clone()))];

        let mut grid = GridAtmosphere::new(
            GridId(3),
            GasMixture::standard_air(CELL_VOLUME, T20C),
            TileDefaults::default(),
        );
        let strong = TileCoord::new(0, 0);
        let weak = TileCoord::new(1, 0);
        grid.add_tile(strong, TileKind::Floor);
        grid.add_tile(weak, TileKind::Floor);
        for (coord, difference) in [(strong, 90.0), (weak, 5.0)] {
            if let Some(tile) = grid.tile_mut(coord) {
                tile.pressure_difference = difference;
                tile.pressure_direction = AtmosDirection::EAST;
            }
            grid.high_pressure_delta.insert(coord);
        }

        let mut ctx = PhaseContext {
            config: &config,
            occupants: &occupants,
            listeners: &mut listeners[..],
        };
        let result = run(&mut grid, &mut ctx, &mut ProcessingBudget::unlimited(), false);
        assert_eq!(result, PhaseResult::Complete);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].grid, GridId(3));
        assert_eq!(seen[0].tile, strong);
        assert_eq!(seen[0].direction, AtmosDirection::EAST);
        assert!(grid.high_pressure_delta.is_empty());
        let tile = grid.tile(strong).expect("tile");
        assert_eq!(tile.pressure_difference, 0.0);
        assert_eq!(tile.last_pressure_direction, AtmosDirection::EAST);
    }
}
