//! Revalidate phase: bring invalidated tiles back in line with their
//! occupants.

use atmosim_logic::{AtmosDirection, GasMixture};
use log::trace;

use super::{drain_tiles, PhaseContext, PhaseResult};
use crate::budget::ProcessingBudget;
use crate::grid::GridAtmosphere;
use crate::occupants::Occupants;
use crate::tile::{Hotspot, TileCoord};

pub fn run(
    grid: &mut GridAtmosphere,
    ctx: &mut PhaseContext<'_>,
    budget: &mut ProcessingBudget,
    resumed: bool,
) -> PhaseResult {
    if !resumed {
        let invalidated = std::mem::take(&mut grid.invalidated);
        grid.current_run = invalidated.into_iter().collect();
    }
    let occupants = ctx.occupants;
    drain_tiles(grid, budget, |grid, coord| {
        revalidate_tile(grid, occupants, coord);
        grid.stats.revalidated += 1;
    })
}

/// Recompute blocking, air presence and solid properties for one tile,
/// then wake it and its neighbours.
pub fn revalidate_tile(grid: &mut GridAtmosphere, occupants: &Occupants, coord: TileCoord) {
    let id = grid.id;
    let blocked = occupants.blocked_directions(id, coord);
    let no_air = occupants.no_air_when_fully_blocked(id, coord);
    let conductor = occupants.heat_conductor(id, coord);
    let defaults = grid.tile_defaults;

    let Some(tile) = grid.tile_mut(coord) else {
        return;
    };
    let old_blocked = tile.blocked_airflow;
    let was_excited = tile.excited;
    tile.blocked_airflow = blocked;
    tile.thermal_conductivity = conductor
        .map(|c| c.thermal_conductivity)
        .unwrap_or(defaults.thermal_conductivity);
    tile.heat_capacity = conductor.map(|c| c.heat_capacity).unwrap_or(defaults.heat_capacity);

    grid.update_adjacency(coord);

    // Airflow changed under a live group: the group no longer describes
    // what is connected to what.
    if was_excited && blocked != old_blocked {
        grid.remove_active_tile(coord, true);
    }

    let fully_blocked = blocked == AtmosDirection::all();
    if fully_blocked {
        if no_air {
            remove_air(grid, coord);
        }
    } else {
        restore_air(grid, coord);
    }

    grid.add_active_tile(coord);
    for (_, neighbor) in coord.neighbors() {
        grid.add_active_tile(neighbor);
    }
}

fn remove_air(grid: &mut GridAtmosphere, coord: TileCoord) {
    let had_air = grid.tile(coord).map(|t| t.air.is_some()).unwrap_or(false);
    if !had_air {
        return;
    }
    grid.remove_active_tile(coord, true);
    grid.excited_group_remove_tile(coord);
    grid.hotspot_tiles.remove(&coord);
    grid.reactive_tiles.remove(&coord);
    grid.high_pressure_delta.remove(&coord);
    if let Some(tile) = grid.tile_mut(coord) {
        tile.air = None;
        tile.archived_cycle = 0;
        tile.hotspot = Hotspot::default();
        tile.pressure_difference = 0.0;
    }
    trace!("tile {:?} sealed, air removed", coord);
}

fn restore_air(grid: &mut GridAtmosphere, coord: TileCoord) {
    let Some(tile) = grid.tile(coord) else {
        return;
    };
    if tile.air.is_some() {
        return;
    }
    if tile.space {
        if let Some(tile) = grid.tile_mut(coord) {
            tile.air = Some(GasMixture::space());
        }
        return;
    }
    let air = fix_vacuum(grid, coord);
    if let Some(tile) = grid.tile_mut(coord) {
        tile.air = Some(air);
        tile.archived_cycle = 0;
    }
}

/// Build air for a tile whose blocker just left: each open neighbour gives
/// up `1 / (n + 1)` of its gas, so nothing is created.
fn fix_vacuum(grid: &mut GridAtmosphere, coord: TileCoord) -> GasMixture {
    let defaults = grid.tile_defaults;
    let mut air = GasMixture::with_temperature(defaults.volume, defaults.temperature);
    let Some(open) = grid.tile(coord).map(|t| t.adjacent_bits) else {
        return air;
    };
    let ratio = 1.0 / (open.count() + 1) as f32;
    for dir in open.iter() {
        let neighbor = coord.offset(dir);
        let taken = grid
            .tile_mut(neighbor)
            .filter(|t| t.is_simulated())
            .and_then(|t| t.air.as_mut())
            .map(|a| a.remove_ratio(ratio));
        if let Some(taken) = taken {
            air.merge(&taken);
        }
    }
    trace!("tile {:?} vacuum fixed with {:.2} mol", coord, air.total_moles());
    air
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TileDefaults;
    use crate::grid::GridId;
    use crate::occupants::{Airtight, HeatConductor, TilePosition};
    use crate::tile::TileKind;
    use atmosim_logic::constants::{CELL_VOLUME, T20C};

    fn setup() -> (GridAtmosphere, Occupants) {
        let mut grid = GridAtmosphere::new(
            GridId(0),
            GasMixture::standard_air(CELL_VOLUME, T20C),
            TileDefaults::default(),
        );
        for x in 0..3 {
            grid.add_tile(TileCoord::new(x, 0), TileKind::Floor);
        }
        (grid, Occupants::new())
    }

    fn revalidate_all(grid: &mut GridAtmosphere, occupants: &Occupants) {
        let coords: Vec<_> = std::mem::take(&mut grid.invalidated).into_iter().collect();
        for c in coords {
            revalidate_tile(grid, occupants, c);
        }
    }

    #[test]
    fn test_wall_removes_air_and_splits_adjacency() {
        let (mut grid, mut occupants) = setup();
        let middle = TileCoord::new(1, 0);
        occupants.spawn(TilePosition::anchored(grid.id, middle), Some(Airtight::wall()), None);
        revalidate_all(&mut grid, &occupants);
        grid.invalidate(middle);
        revalidate_all(&mut grid, &occupants);

        assert!(grid.tile_mixture(middle).is_none());
        let left = grid.tile(TileCoord::new(0, 0)).expect("left");
        assert!(!left.adjacent_bits.contains(AtmosDirection::EAST));
        assert!(!grid.is_active(middle));
        assert!(grid.is_active(TileCoord::new(0, 0)));
    }

    #[test]
    fn test_door_keeps_air() {
        let (mut grid, mut occupants) = setup();
        let middle = TileCoord::new(1, 0);
        occupants.spawn(TilePosition::anchored(grid.id, middle), Some(Airtight::door()), None);
        grid.invalidate(middle);
        revalidate_all(&mut grid, &occupants);
        assert!(grid.tile_mixture(middle).is_some());
        assert_eq!(grid.tile(middle).map(|t| t.adjacent_bits), Some(AtmosDirection::empty()));
    }

    #[test]
    fn test_vacuum_fix_conserves_gas() {
        let (mut grid, mut occupants) = setup();
        let middle = TileCoord::new(1, 0);
        let wall = occupants.spawn(TilePosition::anchored(grid.id, middle), Some(Airtight::wall()), None);
        grid.invalidate(middle);
        revalidate_all(&mut grid, &occupants);
        let (moles_sealed, _) = grid.totals();

        occupants.despawn(wall);
        grid.invalidate(middle);
        revalidate_all(&mut grid, &occupants);

        let restored = grid.tile_mixture(middle).expect("air restored");
        assert!(restored.total_moles() > 0.0);
        let (moles_after, _) = grid.totals();
        assert!((moles_sealed - moles_after).abs() / moles_sealed < 1e-5);
    }

    #[test]
    fn test_conductor_sets_solid_properties() {
        let (mut grid, mut occupants) = setup();
        let c = TileCoord::new(0, 0);
        let conductor = HeatConductor {
            thermal_conductivity: 0.01,
            heat_capacity: 50_000.0,
        };
        occupants.spawn(TilePosition::anchored(grid.id, c), None, Some(conductor));
        grid.invalidate(c);
        revalidate_all(&mut grid, &occupants);
        let tile = grid.tile(c).expect("tile");
        assert_eq!(tile.thermal_conductivity, 0.01);
        assert_eq!(tile.heat_capacity, 50_000.0);
    }

    #[test]
    fn test_stale_coordinate_is_skipped() {
        let (mut grid, occupants) = setup();
        revalidate_tile(&mut grid, &occupants, TileCoord::new(40, 40));
        assert_eq!(grid.tile_count(), 3);
    }
}
