//! Equalize phase: active tiles share gas with their open neighbours.
//!
//! Every neighbour pair is visited at most once per cycle: a tile marks
//! itself with the current cycle before sharing, and a neighbour that
//! already carries the cycle has done the sharing from its own side.

use atmosim_logic::reactions::can_react;
use atmosim_logic::{AtmosDirection, GasCompareResult, GasThresholds};

use super::superconductivity::consider_superconductivity;
use super::{drain_tiles, start_run, PhaseContext, PhaseResult};
use crate::budget::ProcessingBudget;
use crate::config::AtmosConfig;
use crate::grid::GridAtmosphere;
use crate::tile::TileCoord;

pub fn run(
    grid: &mut GridAtmosphere,
    ctx: &mut PhaseContext<'_>,
    budget: &mut ProcessingBudget,
    resumed: bool,
) -> PhaseResult {
    let snapshot: Vec<TileCoord> = grid.active_tiles.iter().copied().collect();
    start_run(grid, resumed, snapshot);
    let config = ctx.config;
    drain_tiles(grid, budget, |grid, coord| {
        process_cell(grid, coord, config);
        grid.stats.equalized += 1;
    })
}

/// Share one active tile's air with every open neighbour not yet handled
/// this cycle.
pub fn process_cell(grid: &mut GridAtmosphere, coord: TileCoord, config: &AtmosConfig) {
    let cycle = grid.update_counter;
    let groups_enabled = config.excited_groups.enabled;
    let thresholds = &config.thresholds;

    match grid.tile(coord).map(|t| t.is_simulated()) {
        Some(true) => {}
        Some(false) => {
            grid.remove_active_tile(coord, false);
            return;
        }
        None => return,
    }
    let Some(tile) = grid.tile_mut(coord) else {
        return;
    };
    if tile.archived_cycle < cycle {
        tile.archive(cycle);
    }
    tile.current_cycle = cycle;
    let open = tile.adjacent_bits;
    let adjacent_count = open.count();
    let mut exchanged = false;

    for dir in open.iter() {
        let neighbor = coord.offset(dir);
        match grid.tile_mut(neighbor) {
            Some(enemy) if enemy.air.is_some() && cycle > enemy.current_cycle => {
                if enemy.archived_cycle < cycle {
                    enemy.archive(cycle);
                }
            }
            _ => continue,
        }

        let (tile_group, enemy_group) = if groups_enabled {
            (grid.excited_group_of(coord), grid.excited_group_of(neighbor))
        } else {
            (None, None)
        };

        let should_share = match (tile_group, enemy_group) {
            (Some(a), Some(b)) => {
                if a != b {
                    grid.excited_group_merge(a, b);
                }
                true
            }
            _ => {
                if compare_tiles(grid, coord, neighbor, thresholds) == GasCompareResult::NoExchange {
                    false
                } else {
                    grid.add_active_tile(neighbor);
                    if groups_enabled {
                        let group = match tile_group.or(enemy_group) {
                            Some(group) => group,
                            None => grid.excited_group_create(),
                        };
                        if tile_group.is_none() {
                            grid.excited_group_add_tile(group, coord);
                        }
                        if enemy_group.is_none() && grid.tile(neighbor).map(|t| t.is_simulated()).unwrap_or(false) {
                            grid.excited_group_add_tile(group, neighbor);
                        }
                    }
                    true
                }
            }
        };

        if !should_share {
            continue;
        }

        let Some((difference, last_share)) = share_tiles(grid, coord, neighbor, adjacent_count, thresholds) else {
            continue;
        };
        exchanged = true;
        let threshold = config.high_pressure.movement_threshold;
        if difference >= 0.0 {
            consider_pressure_difference(grid, coord, dir, difference, threshold);
        } else {
            consider_pressure_difference(grid, neighbor, dir.opposite(), -difference, threshold);
        }
        last_share_check(grid, coord, last_share, thresholds);
    }

    let (reactive, temperature) = match grid.tile_mixture(coord) {
        Some(air) => (can_react(air), air.temperature()),
        None => (false, 0.0),
    };
    if reactive {
        grid.reactive_tiles.insert(coord);
    }

    let mut remove = true;
    if temperature > config.superconduction.start_temperature
        && consider_superconductivity(grid, coord, true, config)
    {
        remove = false;
    }

    if remove {
        let settled = if groups_enabled {
            grid.excited_group_of(coord).is_none()
        } else {
            !exchanged
        };
        if settled {
            grid.remove_active_tile(coord, false);
        }
    }
}

fn compare_tiles(
    grid: &GridAtmosphere,
    a: TileCoord,
    b: TileCoord,
    thresholds: &GasThresholds,
) -> GasCompareResult {
    match (grid.tile_mixture(a), grid.tile_mixture(b)) {
        (Some(air), Some(other)) => air.compare(other, thresholds),
        _ => GasCompareResult::NoExchange,
    }
}

/// Share between two tiles. Returns the pressure difference and how many
/// moles moved.
fn share_tiles(
    grid: &mut GridAtmosphere,
    a: TileCoord,
    b: TileCoord,
    adjacent_count: usize,
    thresholds: &GasThresholds,
) -> Option<(f32, f32)> {
    let (tile, enemy) = grid.tiles.pair_mut(a, b)?;
    let air = tile.air.as_mut()?;
    let other = enemy.air.as_mut()?;
    let difference = air.share(other, adjacent_count, thresholds);
    Some((difference, air.last_share()))
}

/// Record the strongest outward push on a tile for the high pressure phase.
pub fn consider_pressure_difference(
    grid: &mut GridAtmosphere,
    coord: TileCoord,
    direction: AtmosDirection,
    difference: f32,
    threshold: f32,
) {
    if difference <= threshold {
        return;
    }
    let Some(tile) = grid.tile_mut(coord) else {
        return;
    };
    if !tile.is_simulated() {
        return;
    }
    if difference > tile.pressure_difference {
        tile.pressure_difference = difference;
        tile.pressure_direction = direction;
    }
    grid.high_pressure_delta.insert(coord);
}

/// Keep a group awake while meaningful amounts still move.
fn last_share_check(grid: &mut GridAtmosphere, coord: TileCoord, last_share: f32, thresholds: &GasThresholds) {
    let Some(group) = grid.excited_group_of(coord) else {
        return;
    };
    if last_share > thresholds.minimum_air_to_suspend {
        grid.excited_group_reset_cooldowns(group);
    } else if last_share > thresholds.minimum_moles_delta_to_move {
        grid.excited_group_reset_dismantle(group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridId;
    use crate::tile::TileKind;
    use atmosim_logic::constants::{CELL_VOLUME, T20C};
    use atmosim_logic::{Gas, GasMixture};

    fn pair(config: &AtmosConfig) -> GridAtmosphere {
        let mut grid = GridAtmosphere::new(
            GridId(0),
            GasMixture::standard_air(CELL_VOLUME, T20C),
            config.tiles,
        );
        let a = TileCoord::new(0, 0);
        let b = TileCoord::new(1, 0);
        grid.add_tile(a, TileKind::Floor);
        grid.add_tile_with_mixture(b, Some(GasMixture::with_temperature(CELL_VOLUME, T20C)));
        grid.update_adjacency(a);
        grid.add_active_tile(a);
        grid
    }

    #[test]
    fn test_share_activates_and_groups_neighbour() {
        let config = AtmosConfig::default();
        let mut grid = pair(&config);
        let a = TileCoord::new(0, 0);
        let b = TileCoord::new(1, 0);
        process_cell(&mut grid, a, &config);

        assert!(grid.is_active(b));
        assert!(grid.excited_group_of(a).is_some());
        assert_eq!(grid.excited_group_of(a), grid.excited_group_of(b));
        let pa = grid.tile(a).map(|t| t.pressure()).unwrap_or(0.0);
        let pb = grid.tile(b).map(|t| t.pressure()).unwrap_or(0.0);
        assert!((pa - pb).abs() < 1.0);
        assert!(grid.high_pressure_delta.contains(&a));
        assert_eq!(grid.tile(a).map(|t| t.pressure_direction), Some(AtmosDirection::EAST));
    }

    #[test]
    fn test_pair_shared_once_per_cycle() {
        let config = AtmosConfig::default();
        let mut grid = pair(&config);
        let a = TileCoord::new(0, 0);
        let b = TileCoord::new(1, 0);
        process_cell(&mut grid, a, &config);
        let after_first = grid.tile_mixture(b).map(|m| m.total_moles());
        process_cell(&mut grid, b, &config);
        assert_eq!(grid.tile_mixture(b).map(|m| m.total_moles()), after_first);
    }

    #[test]
    fn test_equal_tiles_settle_without_group() {
        let config = AtmosConfig::default();
        let mut grid = GridAtmosphere::new(
            GridId(0),
            GasMixture::standard_air(CELL_VOLUME, T20C),
            config.tiles,
        );
        let a = TileCoord::new(0, 0);
        grid.add_tile(a, TileKind::Floor);
        grid.add_tile(TileCoord::new(1, 0), TileKind::Floor);
        grid.update_adjacency(a);
        grid.add_active_tile(a);
        process_cell(&mut grid, a, &config);
        assert!(!grid.is_active(a));
        assert_eq!(grid.excited_group_count(), 0);
    }

    #[test]
    fn test_venting_into_space_keeps_tile_awake() {
        let config = AtmosConfig::default();
        let mut grid = GridAtmosphere::new(
            GridId(0),
            GasMixture::standard_air(CELL_VOLUME, T20C),
            config.tiles,
        );
        let a = TileCoord::new(0, 0);
        let space = TileCoord::new(0, 1);
        grid.add_tile(a, TileKind::Floor);
        grid.add_tile(space, TileKind::Space);
        grid.update_adjacency(a);
        grid.add_active_tile(a);
        let before = grid.tile_mixture(a).map(|m| m.total_moles()).unwrap_or(0.0);
        process_cell(&mut grid, a, &config);

        assert!(grid.is_active(a));
        assert!(!grid.is_active(space));
        assert!(grid.excited_group_of(space).is_none());
        assert!(grid.tile_mixture(a).map(|m| m.total_moles()).unwrap_or(0.0) < before);
        assert_eq!(grid.tile_mixture(space).map(|m| m.total_moles()), Some(0.0));
    }

    #[test]
    fn test_fuel_mix_is_flagged_reactive() {
        let config = AtmosConfig::default();
        let mut grid = pair(&config);
        let a = TileCoord::new(0, 0);
        if let Some(air) = grid.tile_mut(a).and_then(|t| t.air.as_mut()) {
            air.set_moles(Gas::Plasma, 20.0);
            air.set_temperature(600.0);
        }
        process_cell(&mut grid, a, &config);
        assert!(grid.reactive_tiles.contains(&a));
    }

    #[test]
    fn test_without_groups_exchanging_tile_stays_active() {
        let mut config = AtmosConfig::default();
        config.excited_groups.enabled = false;
        let mut grid = pair(&config);
        let a = TileCoord::new(0, 0);
        process_cell(&mut grid, a, &config);
        assert!(grid.is_active(a));
        assert_eq!(grid.excited_group_count(), 0);
    }
}
