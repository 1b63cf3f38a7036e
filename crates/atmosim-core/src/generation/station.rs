//! Station generation - a walled grid of rooms floating in space

use std::collections::BTreeSet;

use atmosim_logic::{Gas, GasMixture};
use hecs::Entity;
use log::info;
use rand::Rng;

use crate::engine::AtmosphereEngine;
use crate::grid::GridId;
use crate::occupants::{Airtight, HeatConductor};
use crate::tile::{TileCoord, TileKind};

/// Configuration for station generation
#[derive(Debug, Clone)]
pub struct StationConfig {
    pub name: String,
    /// Interior width in tiles, hull included
    pub width: i32,
    /// Interior height in tiles, hull included
    pub height: i32,
    /// Spacing of internal walls
    pub room_size: i32,
    /// Width of the space ring around the hull
    pub space_margin: i32,
    /// Chance a door starts open
    pub open_door_chance: f32,
    /// Hull tiles left without a wall
    pub breaches: u32,
    /// Room tiles seeded with hot plasma
    pub plasma_leaks: u32,
    pub leak_moles: f32,
    pub leak_temperature: f32,
    pub wall_conductor: HeatConductor,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            name: "Outpost".to_string(),
            width: 24,
            height: 16,
            room_size: 6,
            space_margin: 1,
            open_door_chance: 0.5,
            breaches: 0,
            plasma_leaks: 0,
            leak_moles: 50.0,
            leak_temperature: 500.0,
            wall_conductor: HeatConductor {
                thermal_conductivity: 0.04,
                heat_capacity: 10_000.0,
            },
        }
    }
}

/// Inclusive bounds of a room's floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomBounds {
    pub min: TileCoord,
    pub max: TileCoord,
}

impl RoomBounds {
    pub fn contains(&self, coord: TileCoord) -> bool {
        (self.min.x..=self.max.x).contains(&coord.x) && (self.min.y..=self.max.y).contains(&coord.y)
    }

    pub fn area(&self) -> i32 {
        (self.max.x - self.min.x + 1) * (self.max.y - self.min.y + 1)
    }
}

/// What the generator built
#[derive(Debug, Clone)]
pub struct StationLayout {
    pub name: String,
    pub grid: GridId,
    pub rooms: Vec<RoomBounds>,
    pub walls: Vec<Entity>,
    pub doors: Vec<Entity>,
    pub breaches: Vec<TileCoord>,
    pub leaks: Vec<TileCoord>,
}

/// Wall line positions along one axis: both hull edges plus every
/// `room_size`-th interior line.
fn wall_lines(extent: i32, room_size: i32) -> Vec<i32> {
    let mut lines = vec![0];
    lines.extend((room_size..extent - 1).step_by(room_size as usize).filter(|v| extent - 1 - v > 1));
    lines.push(extent - 1);
    lines
}

/// Generate a station on a new grid of `engine`
pub fn generate_station(
    engine: &mut AtmosphereEngine,
    config: &StationConfig,
    rng: &mut impl Rng,
) -> StationLayout {
    let width = config.width.max(3);
    let height = config.height.max(3);
    let room_size = config.room_size.max(3);
    let grid = engine.add_grid();

    let columns = wall_lines(width, room_size);
    let rows = wall_lines(height, room_size);
    let on_hull = |c: TileCoord| c.x == 0 || c.y == 0 || c.x == width - 1 || c.y == height - 1;
    let on_wall_line = |c: TileCoord| columns.contains(&c.x) || rows.contains(&c.y);

    // Doors sit midway along each internal wall segment
    let mut door_tiles = BTreeSet::new();
    for &x in &columns[1..columns.len() - 1] {
        for pair in rows.windows(2) {
            if pair[1] - pair[0] > 1 {
                door_tiles.insert(TileCoord::new(x, (pair[0] + pair[1]) / 2));
            }
        }
    }
    for &y in &rows[1..rows.len() - 1] {
        for pair in columns.windows(2) {
            if pair[1] - pair[0] > 1 {
                door_tiles.insert(TileCoord::new((pair[0] + pair[1]) / 2, y));
            }
        }
    }

    // Breaches: hull tiles away from corners and wall junctions
    let mut candidates: Vec<TileCoord> = (0..width)
        .flat_map(|x| (0..height).map(move |y| TileCoord::new(x, y)))
        .filter(|&c| on_hull(c))
        .filter(|&c| !(columns.contains(&c.x) && rows.contains(&c.y)))
        .collect();
    let mut breaches = BTreeSet::new();
    for _ in 0..config.breaches {
        if candidates.is_empty() {
            break;
        }
        breaches.insert(candidates.swap_remove(rng.gen_range(0..candidates.len())));
    }

    let mut walls = Vec::new();
    let mut doors = Vec::new();
    let margin = config.space_margin.max(0);
    for x in -margin..width + margin {
        for y in -margin..height + margin {
            let coord = TileCoord::new(x, y);
            if x < 0 || y < 0 || x >= width || y >= height {
                engine.add_tile(grid, coord, TileKind::Space);
            } else if door_tiles.contains(&coord) {
                engine.add_tile(grid, coord, TileKind::Floor);
                if let Some(door) = engine.spawn_airtight(grid, coord, Airtight::door(), Some(config.wall_conductor)) {
                    if rng.gen::<f32>() < config.open_door_chance {
                        engine.set_airtight(door, false);
                    }
                    doors.push(door);
                }
            } else if on_wall_line(coord) && !breaches.contains(&coord) {
                engine.add_tile_with_mixture(grid, coord, None);
                if let Some(wall) = engine.spawn_airtight(grid, coord, Airtight::wall(), Some(config.wall_conductor)) {
                    walls.push(wall);
                }
            } else {
                engine.add_tile(grid, coord, TileKind::Floor);
            }
        }
    }

    let mut rooms = Vec::new();
    for xs in columns.windows(2) {
        for ys in rows.windows(2) {
            if xs[1] - xs[0] > 1 && ys[1] - ys[0] > 1 {
                rooms.push(RoomBounds {
                    min: TileCoord::new(xs[0] + 1, ys[0] + 1),
                    max: TileCoord::new(xs[1] - 1, ys[1] - 1),
                });
            }
        }
    }

    let mut leaks = Vec::new();
    if !rooms.is_empty() {
        let volume = engine.config.tiles.volume;
        for _ in 0..config.plasma_leaks {
            let room = rooms[rng.gen_range(0..rooms.len())];
            let coord = TileCoord::new(
                rng.gen_range(room.min.x..=room.max.x),
                rng.gen_range(room.min.y..=room.max.y),
            );
            let mut plasma = GasMixture::with_temperature(volume, config.leak_temperature);
            plasma.set_moles(Gas::Plasma, config.leak_moles);
            if engine.merge_into_tile(grid, coord, &plasma) {
                leaks.push(coord);
            }
        }
    }

    info!(
        "Generated station '{}': {} rooms, {} walls, {} doors, {} breaches, {} leaks",
        config.name,
        rooms.len(),
        walls.len(),
        doors.len(),
        breaches.len(),
        leaks.len()
    );

    StationLayout {
        name: config.name.clone(),
        grid,
        rooms,
        walls,
        doors,
        breaches: breaches.into_iter().collect(),
        leaks,
    }
}
