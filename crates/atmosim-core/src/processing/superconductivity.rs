//! Superconductivity phase: heat crossing walls, windows and closed doors.
//!
//! Tiles hot enough join the superconducting set. Each cycle they push heat
//! through every direction air cannot flow (all four when the tile itself
//! is solid), into gas or solid on the far side. Tiles facing space also
//! radiate. A tile that cools below the minimum leaves the set.

use atmosim_logic::constants::{HEAT_CAPACITY_VACUUM, MINIMUM_TEMPERATURE_DELTA_TO_CONSIDER, T0C, TCMB, TMAX};
use atmosim_logic::AtmosDirection;

use super::{drain_tiles, start_run, PhaseContext, PhaseResult};
use crate::budget::ProcessingBudget;
use crate::config::{AtmosConfig, SuperconductionSettings};
use crate::grid::GridAtmosphere;
use crate::tile::{TileAtmosphere, TileCoord};

pub fn run(
    grid: &mut GridAtmosphere,
    ctx: &mut PhaseContext<'_>,
    budget: &mut ProcessingBudget,
    resumed: bool,
) -> PhaseResult {
    let snapshot: Vec<TileCoord> = grid.superconductivity_tiles.iter().copied().collect();
    start_run(grid, resumed, snapshot);
    let config = ctx.config;
    drain_tiles(grid, budget, |grid, coord| {
        superconduct(grid, coord, config);
        grid.stats.superconducted += 1;
    })
}

/// Add a tile to the superconducting set if it is hot enough. `starting`
/// uses the higher threshold a tile must pass to begin conducting.
pub fn consider_superconductivity(
    grid: &mut GridAtmosphere,
    coord: TileCoord,
    starting: bool,
    config: &AtmosConfig,
) -> bool {
    let settings = &config.superconduction;
    if !settings.enabled {
        return false;
    }
    let Some(tile) = grid.tile(coord) else {
        return false;
    };
    if tile.space || tile.thermal_conductivity <= 0.0 {
        return false;
    }
    let threshold = if starting {
        settings.start_temperature
    } else {
        settings.minimum_temperature
    };
    let hot_enough = match tile.air.as_ref() {
        Some(air) => air.temperature() >= threshold && air.heat_capacity() >= settings.minimum_heat_capacity,
        None => tile.temperature >= threshold,
    };
    if !hot_enough {
        return false;
    }
    grid.superconductivity_tiles.insert(coord);
    true
}

pub fn superconduct(grid: &mut GridAtmosphere, coord: TileCoord, config: &AtmosConfig) {
    let cycle = grid.update_counter;
    let Some(tile) = grid.tile_mut(coord) else {
        grid.superconductivity_tiles.remove(&coord);
        return;
    };
    if tile.archived_cycle < cycle {
        tile.archive(cycle);
    }
    let directions = conductivity_directions(tile);

    let mut space_exposed = false;
    for dir in directions.iter() {
        let neighbor = coord.offset(dir);
        let Some(adjacent) = grid.tile_mut(neighbor) else {
            continue;
        };
        if adjacent.space {
            space_exposed = true;
            continue;
        }
        if adjacent.thermal_conductivity <= 0.0 {
            continue;
        }
        if adjacent.archived_cycle < cycle {
            adjacent.archive(cycle);
        }
        conduct_with_source(grid, neighbor, coord, &config.superconduction);
        consider_superconductivity(grid, neighbor, false, config);
    }

    if space_exposed {
        if let Some(tile) = grid.tile_mut(coord) {
            radiate_to_space(tile);
        }
    }
    finish_superconduction(grid, coord, &config.superconduction);
}

/// Directions heat crosses without airflow.
fn conductivity_directions(tile: &TileAtmosphere) -> AtmosDirection {
    if tile.air.is_none() {
        return AtmosDirection::all();
    }
    AtmosDirection::all().difference(tile.adjacent_bits)
}

/// Move heat from `source` into `target` through whatever separates them.
pub fn conduct_with_source(
    grid: &mut GridAtmosphere,
    target: TileCoord,
    source: TileCoord,
    settings: &SuperconductionSettings,
) {
    let Some((tile, other)) = grid.tiles.pair_mut(target, source) else {
        return;
    };
    let target_has_air = tile.air.is_some();
    match (target_has_air, other.air.is_some()) {
        (false, true) => {
            if let Some(source_air) = other.air.as_mut() {
                tile.temperature = source_air.temperature_share_with_solid(
                    tile.thermal_conductivity,
                    tile.temperature,
                    tile.heat_capacity,
                );
            }
        }
        (false, false) => {
            let coefficient = tile.thermal_conductivity;
            temperature_share_mutual_solid(other, tile, coefficient);
        }
        (true, true) => {
            if let (Some(target_air), Some(source_air)) = (tile.air.as_mut(), other.air.as_mut()) {
                source_air.temperature_share(target_air, settings.window_heat_transfer_coefficient);
            }
        }
        (true, false) => {
            if let Some(target_air) = tile.air.as_mut() {
                other.temperature = target_air.temperature_share_with_solid(
                    other.thermal_conductivity,
                    other.temperature,
                    other.heat_capacity,
                );
            }
        }
    }
    if target_has_air {
        grid.add_active_tile(target);
    }
}

/// Solid to solid conduction, on archived temperatures.
pub fn temperature_share_mutual_solid(a: &mut TileAtmosphere, b: &mut TileAtmosphere, coefficient: f32) {
    let delta = a.temperature_archived - b.temperature_archived;
    if delta.abs() <= MINIMUM_TEMPERATURE_DELTA_TO_CONSIDER || a.heat_capacity <= 0.0 || b.heat_capacity <= 0.0 {
        return;
    }
    let heat = coefficient * delta * (a.heat_capacity * b.heat_capacity / (a.heat_capacity + b.heat_capacity));
    a.temperature = (a.temperature - heat / a.heat_capacity).clamp(TCMB, TMAX);
    b.temperature = (b.temperature + heat / b.heat_capacity).clamp(TCMB, TMAX);
}

/// Lose solid heat to vacuum. Only tiles warmer than 0°C radiate.
pub fn radiate_to_space(tile: &mut TileAtmosphere) {
    if tile.temperature <= T0C {
        return;
    }
    let delta = tile.temperature_archived - TCMB;
    if tile.heat_capacity <= 0.0 || delta.abs() <= MINIMUM_TEMPERATURE_DELTA_TO_CONSIDER {
        return;
    }
    let heat = tile.thermal_conductivity
        * delta
        * (tile.heat_capacity * HEAT_CAPACITY_VACUUM / (tile.heat_capacity + HEAT_CAPACITY_VACUUM));
    tile.temperature = (tile.temperature - heat / tile.heat_capacity).max(TCMB);
}

/// Share heat between the tile's air and its own solid, then drop the
/// tile from the set if it has cooled off.
fn finish_superconduction(grid: &mut GridAtmosphere, coord: TileCoord, settings: &SuperconductionSettings) {
    let Some(tile) = grid.tile_mut(coord) else {
        return;
    };
    if let Some(air) = tile.air.as_mut() {
        tile.temperature =
            air.temperature_share_with_solid(tile.thermal_conductivity, tile.temperature, tile.heat_capacity);
    }
    let temperature = tile.air.as_ref().map(|a| a.temperature()).unwrap_or(tile.temperature);
    if temperature < settings.minimum_temperature {
        grid.superconductivity_tiles.remove(&coord);
    }
}
