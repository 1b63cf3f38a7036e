//! Hotspots: fires sitting on tiles.
//!
//! A hotspot burns a slice of its tile's air at its own temperature. Once it
//! grows to cover the whole tile it "bypasses": the tile's own reaction
//! drives it, and above the spread temperature it ignites its neighbours.

use atmosim_logic::Gas;
use log::debug;

use super::{drain_tiles, start_run, PhaseContext, PhaseResult};
use crate::budget::ProcessingBudget;
use crate::config::FireSettings;
use crate::grid::GridAtmosphere;
use crate::tile::{Hotspot, TileCoord};

pub fn run(
    grid: &mut GridAtmosphere,
    ctx: &mut PhaseContext<'_>,
    budget: &mut ProcessingBudget,
    resumed: bool,
) -> PhaseResult {
    let snapshot: Vec<TileCoord> = grid.hotspot_tiles.iter().copied().collect();
    start_run(grid, resumed, snapshot);
    let fire = ctx.config.fire;
    drain_tiles(grid, budget, |grid, coord| {
        process_hotspot(grid, coord, &fire);
        grid.stats.hotspots_processed += 1;
    })
}

/// Expose a tile to heat. Ignites a hotspot when the air holds oxygen and
/// fuel and `exposed_temperature` is past ignition. With `soh` a live
/// hotspot is raised to the exposed temperature and volume.
/// Returns true when a hotspot was ignited or raised.
pub fn hotspot_expose(
    grid: &mut GridAtmosphere,
    coord: TileCoord,
    exposed_temperature: f32,
    exposed_volume: f32,
    soh: bool,
    fire: &FireSettings,
) -> bool {
    let cycle = grid.update_counter;
    let Some(tile) = grid.tile_mut(coord) else {
        return false;
    };
    if !tile.is_simulated() {
        return false;
    }
    let Some(air) = tile.air.as_ref() else {
        return false;
    };
    if air.moles(Gas::Oxygen) < fire.minimum_oxygen {
        return false;
    }
    let fuelled = has_fuel(air.moles(Gas::Plasma), air.moles(Gas::Tritium), fire);

    if tile.hotspot.valid {
        if soh && fuelled {
            tile.hotspot.temperature = tile.hotspot.temperature.max(exposed_temperature);
            tile.hotspot.volume = tile.hotspot.volume.max(exposed_volume);
            return true;
        }
        return false;
    }

    if exposed_temperature <= fire.ignition_temperature || !fuelled {
        return false;
    }

    tile.hotspot = Hotspot {
        valid: true,
        skipped_first_process: tile.current_cycle > cycle,
        bypassing: false,
        temperature: exposed_temperature,
        volume: exposed_volume * fire.hotspot_volume_scale,
        state: 1,
    };
    debug!("hotspot ignited at {:?} ({:.0} K)", coord, exposed_temperature);
    grid.add_active_tile(coord);
    grid.hotspot_tiles.insert(coord);
    true
}

/// Put a fire out. Returns whether there was one.
pub fn hotspot_extinguish(grid: &mut GridAtmosphere, coord: TileCoord) -> bool {
    let Some(tile) = grid.tile_mut(coord) else {
        return false;
    };
    let was_valid = tile.hotspot.valid;
    tile.hotspot = Hotspot::default();
    grid.hotspot_tiles.remove(&coord);
    was_valid
}

fn has_fuel(plasma: f32, tritium: f32, fire: &FireSettings) -> bool {
    plasma > fire.minimum_fuel || tritium > fire.minimum_fuel
}

pub fn process_hotspot(grid: &mut GridAtmosphere, coord: TileCoord, fire: &FireSettings) {
    let Some(tile) = grid.tile_mut(coord) else {
        grid.hotspot_tiles.remove(&coord);
        return;
    };
    if !tile.hotspot.valid {
        grid.hotspot_tiles.remove(&coord);
        return;
    }
    if !tile.hotspot.skipped_first_process {
        tile.hotspot.skipped_first_process = true;
        return;
    }

    let starved = match tile.air.as_ref() {
        Some(air) => {
            air.moles(Gas::Oxygen) < fire.minimum_oxygen
                || !has_fuel(air.moles(Gas::Plasma), air.moles(Gas::Tritium), fire)
        }
        None => true,
    };
    if tile.hotspot.temperature < fire.minimum_temperature_to_exist || tile.hotspot.volume <= 1.0 || starved {
        tile.hotspot = Hotspot::default();
        grid.hotspot_tiles.remove(&coord);
        debug!("hotspot at {:?} went out", coord);
        return;
    }

    if let Some(group) = grid.excited_group_of(coord) {
        grid.excited_group_reset_cooldowns(group);
    }

    perform_hotspot_exposure(grid, coord, fire);

    let Some(tile) = grid.tile_mut(coord) else {
        return;
    };
    let mut spread = None;
    if tile.hotspot.bypassing {
        tile.hotspot.state = 3;
        let air_temperature = tile.air.as_ref().map(|a| a.temperature()).unwrap_or(0.0);
        if air_temperature > fire.minimum_temperature_to_spread {
            spread = Some((air_temperature * fire.spread_radiosity_scale, tile.adjacent_bits));
        }
    } else {
        let volume = tile.air.as_ref().map(|a| a.volume()).unwrap_or(0.0);
        tile.hotspot.state = if tile.hotspot.volume > volume * 0.4 { 2 } else { 1 };
    }
    if tile.hotspot.temperature > tile.max_fire_temperature_sustained {
        tile.max_fire_temperature_sustained = tile.hotspot.temperature;
    }
    let spread_volume = tile.air.as_ref().map(|a| a.volume()).unwrap_or(0.0) / 4.0;

    grid.add_active_tile(coord);

    if let Some((radiated, open)) = spread {
        for dir in open.iter() {
            let neighbor = coord.offset(dir);
            let burning = grid.tile(neighbor).map(|t| t.hotspot.valid).unwrap_or(true);
            if !burning {
                hotspot_expose(grid, neighbor, radiated, spread_volume, false, fire);
            }
        }
    }
}

/// Burn the hotspot's share of the tile air, or follow the tile's own
/// reaction once the fire covers the tile. A bypassing hotspot never
/// reacts the air itself.
pub fn perform_hotspot_exposure(grid: &mut GridAtmosphere, coord: TileCoord, fire: &FireSettings) {
    let Some(tile) = grid.tile_mut(coord) else {
        return;
    };
    if !tile.hotspot.valid {
        return;
    }
    let hotspot = &mut tile.hotspot;
    let Some(air) = tile.air.as_mut() else {
        return;
    };

    if hotspot.bypassing {
        // The reactions phase already burned the tile air this cycle.
        hotspot.volume = air.fire_amount() * fire.growth_rate;
        hotspot.temperature = air.temperature();
    } else {
        let ratio = if air.volume() > 0.0 { hotspot.volume / air.volume() } else { 0.0 };
        let mut affected = air.remove_ratio(ratio);
        affected.set_temperature(hotspot.temperature);
        affected.react();
        let burned = affected.fire_amount();
        hotspot.temperature = affected.temperature();
        hotspot.volume = burned * fire.growth_rate;
        air.merge(&affected);

        if hotspot.skipped_first_process && hotspot.volume > air.volume() * 0.95 {
            // Tile air that has not reacted yet keeps the slice's burn.
            hotspot.volume = air.fire_amount().max(burned) * fire.growth_rate;
            hotspot.temperature = air.temperature();
        }
    }
    hotspot.bypassing = hotspot.skipped_first_process && hotspot.volume > air.volume() * 0.95;
}
