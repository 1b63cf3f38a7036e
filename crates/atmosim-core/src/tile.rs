//! Tiles: per-coordinate atmosphere containers and the arena that owns them.

use std::collections::HashMap;

use atmosim_logic::{AtmosDirection, GasMixture};
use serde::{Deserialize, Serialize};

use crate::config::TileDefaults;
use crate::grid::ExcitedGroupId;

/// Grid-local tile coordinate. North is +y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The coordinate one step in `direction`.
    pub fn offset(self, direction: AtmosDirection) -> TileCoord {
        let (dx, dy) = direction.offset();
        TileCoord::new(self.x + dx, self.y + dy)
    }

    /// The four cardinal neighbours with the direction leading to each.
    pub fn neighbors(self) -> impl Iterator<Item = (AtmosDirection, TileCoord)> {
        AtmosDirection::CARDINALS
            .into_iter()
            .map(move |dir| (dir, self.offset(dir)))
    }
}

/// What a new tile is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileKind {
    /// Gets a copy of the grid's default mixture.
    Floor,
    /// Gets the immutable space sentinel.
    Space,
}

/// Fire state on a tile.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hotspot {
    pub valid: bool,
    /// Fresh hotspots sit out one hotspot pass before burning.
    pub skipped_first_process: bool,
    /// Covers the whole tile; the tile's own reaction drives it.
    pub bypassing: bool,
    pub temperature: f32,
    pub volume: f32,
    /// 0 = none, 1 = small, 2 = large, 3 = tile-wide.
    pub state: u8,
}

/// Atmosphere of one tile.
#[derive(Debug, Clone)]
pub struct TileAtmosphere {
    pub coord: TileCoord,
    /// `None` when fully air-blocked (a wall). Such tiles take no part in
    /// diffusion but still conduct heat.
    pub air: Option<GasMixture>,
    /// Air is the immutable space sentinel.
    pub space: bool,
    /// OR of every anchored airtight occupant's directions.
    pub blocked_airflow: AtmosDirection,
    /// Directions with an existing, unblocked neighbour.
    pub adjacent_bits: AtmosDirection,
    pub excited: bool,
    pub excited_group: Option<ExcitedGroupId>,
    pub archived_cycle: u32,
    pub current_cycle: u32,
    pub hotspot: Hotspot,
    pub pressure_difference: f32,
    pub pressure_direction: AtmosDirection,
    pub last_pressure_direction: AtmosDirection,
    /// Solid body temperature, used by superconduction.
    pub temperature: f32,
    pub temperature_archived: f32,
    pub heat_capacity: f32,
    pub thermal_conductivity: f32,
    pub max_fire_temperature_sustained: f32,
}

impl TileAtmosphere {
    pub fn new(coord: TileCoord, air: Option<GasMixture>, space: bool, defaults: &TileDefaults) -> Self {
        Self {
            coord,
            air,
            space,
            blocked_airflow: AtmosDirection::empty(),
            adjacent_bits: AtmosDirection::empty(),
            excited: false,
            excited_group: None,
            archived_cycle: 0,
            current_cycle: 0,
            hotspot: Hotspot::default(),
            pressure_difference: 0.0,
            pressure_direction: AtmosDirection::empty(),
            last_pressure_direction: AtmosDirection::empty(),
            temperature: defaults.temperature,
            temperature_archived: defaults.temperature,
            heat_capacity: defaults.heat_capacity,
            thermal_conductivity: defaults.thermal_conductivity,
            max_fire_temperature_sustained: 0.0,
        }
    }

    /// Archive air and solid temperature for `cycle`.
    pub fn archive(&mut self, cycle: u32) {
        if let Some(air) = self.air.as_mut() {
            air.archive();
        }
        self.temperature_archived = self.temperature;
        self.archived_cycle = cycle;
    }

    /// Air pressure in kPa, zero for airless tiles.
    pub fn pressure(&self) -> f32 {
        self.air.as_ref().map(|a| a.pressure()).unwrap_or(0.0)
    }

    /// Can diffuse gas: has a mutable mixture.
    pub fn is_simulated(&self) -> bool {
        self.air.is_some() && !self.space
    }
}

/// Flat tile arena indexed by coordinate.
#[derive(Debug, Default)]
pub struct TileMap {
    tiles: Vec<TileAtmosphere>,
    index: HashMap<TileCoord, usize>,
}

impl TileMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.index.contains_key(coord)
    }

    pub fn get(&self, coord: &TileCoord) -> Option<&TileAtmosphere> {
        self.index.get(coord).map(|&i| &self.tiles[i])
    }

    pub fn get_mut(&mut self, coord: &TileCoord) -> Option<&mut TileAtmosphere> {
        match self.index.get(coord) {
            Some(&i) => Some(&mut self.tiles[i]),
            None => None,
        }
    }

    /// Insert or replace the tile at `tile.coord`.
    pub fn insert(&mut self, tile: TileAtmosphere) -> Option<TileAtmosphere> {
        if let Some(&i) = self.index.get(&tile.coord) {
            return Some(std::mem::replace(&mut self.tiles[i], tile));
        }
        self.index.insert(tile.coord, self.tiles.len());
        self.tiles.push(tile);
        None
    }

    pub fn remove(&mut self, coord: &TileCoord) -> Option<TileAtmosphere> {
        let i = self.index.remove(coord)?;
        let tile = self.tiles.swap_remove(i);
        if let Some(moved) = self.tiles.get(i) {
            self.index.insert(moved.coord, i);
        }
        Some(tile)
    }

    /// Two distinct tiles, both mutable.
    pub fn pair_mut(&mut self, a: TileCoord, b: TileCoord) -> Option<(&mut TileAtmosphere, &mut TileAtmosphere)> {
        let ia = *self.index.get(&a)?;
        let ib = *self.index.get(&b)?;
        if ia == ib {
            return None;
        }
        if ia < ib {
            let (left, right) = self.tiles.split_at_mut(ib);
            Some((&mut left[ia], &mut right[0]))
        } else {
            let (left, right) = self.tiles.split_at_mut(ia);
            Some((&mut right[0], &mut left[ib]))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileAtmosphere> {
        self.tiles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TileAtmosphere> {
        self.tiles.iter_mut()
    }

    pub fn coords(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.tiles.iter().map(|t| t.coord)
    }
}
