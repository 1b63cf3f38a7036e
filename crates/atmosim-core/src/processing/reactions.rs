//! Reactions phase: tiles flagged during equalize run their reactions.

use atmosim_logic::ReactionResult;

use super::hotspot::hotspot_expose;
use super::{drain_tiles, start_run, PhaseContext, PhaseResult};
use crate::budget::ProcessingBudget;
use crate::config::FireSettings;
use crate::grid::GridAtmosphere;
use crate::tile::TileCoord;

pub fn run(
    grid: &mut GridAtmosphere,
    ctx: &mut PhaseContext<'_>,
    budget: &mut ProcessingBudget,
    resumed: bool,
) -> PhaseResult {
    if !resumed {
        let reactive = std::mem::take(&mut grid.reactive_tiles);
        start_run(grid, false, reactive);
    }
    let fire = ctx.config.fire;
    drain_tiles(grid, budget, |grid, coord| {
        if react_tile(grid, coord, &fire) != ReactionResult::NoReaction {
            grid.stats.reactions += 1;
        }
    })
}

/// React a tile's air in place. A burn hot enough to sustain fire exposes
/// the tile to a hotspot.
pub fn react_tile(grid: &mut GridAtmosphere, coord: TileCoord, fire: &FireSettings) -> ReactionResult {
    let Some(air) = grid
        .tile_mut(coord)
        .filter(|t| t.is_simulated())
        .and_then(|t| t.air.as_mut())
    else {
        return ReactionResult::NoReaction;
    };
    let result = air.react();
    let fire_amount = air.fire_amount();
    let temperature = air.temperature();
    let volume = air.volume();
    if fire_amount > 0.0 && temperature > fire.minimum_temperature_to_exist {
        hotspot_expose(grid, coord, temperature, volume, false, fire);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TileDefaults;
    use crate::grid::GridId;
    use crate::tile::TileKind;
    use atmosim_logic::constants::{CELL_VOLUME, T20C};
    use atmosim_logic::{Gas, GasMixture};

    fn grid_with(air: GasMixture) -> GridAtmosphere {
        let mut grid = GridAtmosphere::new(GridId(0), air, TileDefaults::default());
        grid.add_tile(TileCoord::new(0, 0), TileKind::Floor);
        grid.add_tile(TileCoord::new(1, 0), TileKind::Space);
        grid
    }

    #[test]
    fn test_hot_fuel_reacts_and_ignites() {
        let mut air = GasMixture::standard_air(CELL_VOLUME, 900.0);
        air.set_moles(Gas::Plasma, 30.0);
        let mut grid = grid_with(air);
        let c = TileCoord::new(0, 0);
        let result = react_tile(&mut grid, c, &FireSettings::default());
        assert_eq!(result, ReactionResult::Reacting);
        assert!(grid.is_hotspot_active(c));
    }

    #[test]
    fn test_cool_air_does_nothing() {
        let mut grid = grid_with(GasMixture::standard_air(CELL_VOLUME, T20C));
        let result = react_tile(&mut grid, TileCoord::new(0, 0), &FireSettings::default());
        assert_eq!(result, ReactionResult::NoReaction);
        assert_eq!(grid.hotspot_count(), 0);
    }

    #[test]
    fn test_space_and_missing_tiles_never_react() {
        let mut grid = grid_with(GasMixture::standard_air(CELL_VOLUME, T20C));
        let fire = FireSettings::default();
        assert_eq!(react_tile(&mut grid, TileCoord::new(1, 0), &fire), ReactionResult::NoReaction);
        assert_eq!(react_tile(&mut grid, TileCoord::new(9, 9), &fire), ReactionResult::NoReaction);
    }
}
