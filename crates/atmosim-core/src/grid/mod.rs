//! Per-grid atmosphere state.
//!
//! A [`GridAtmosphere`] owns every tile on one grid plus the bookkeeping
//! the phased processor needs: tracking sets (active, hotspot,
//! superconducting, high-pressure, reactive, invalidated), the excited
//! group arena, resumable queues and the current phase. Grids never share
//! tiles, so each one can be processed independently.

mod excited;

use std::collections::{BTreeSet, VecDeque};

use atmosim_logic::{AtmosDirection, GasMixture};
use serde::{Deserialize, Serialize};

use crate::config::TileDefaults;
use crate::devices::{AtmosDevice, DeviceId, TileGasAccess};
use crate::tile::{TileAtmosphere, TileCoord, TileKind, TileMap};

pub use excited::{ExcitedGroup, ExcitedGroupId, ExcitedGroups};

/// Identifies a grid within an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridId(pub u32);

/// Processing phases, in rotation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessingPhase {
    Revalidate,
    Equalize,
    ExcitedGroups,
    Reactions,
    Hotspots,
    Superconductivity,
    HighPressureDelta,
    AtmosDevices,
}

impl ProcessingPhase {
    pub const ORDER: [ProcessingPhase; 8] = [
        ProcessingPhase::Revalidate,
        ProcessingPhase::Equalize,
        ProcessingPhase::ExcitedGroups,
        ProcessingPhase::Reactions,
        ProcessingPhase::Hotspots,
        ProcessingPhase::Superconductivity,
        ProcessingPhase::HighPressureDelta,
        ProcessingPhase::AtmosDevices,
    ];

    /// The phase after this one, or `None` at the end of a cycle.
    pub fn next(self) -> Option<ProcessingPhase> {
        let i = Self::ORDER.iter().position(|p| *p == self)?;
        Self::ORDER.get(i + 1).copied()
    }
}

/// Work done during one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    pub revalidated: usize,
    pub equalized: usize,
    pub groups_processed: usize,
    pub reactions: usize,
    pub hotspots_processed: usize,
    pub superconducted: usize,
    pub pressure_movements: usize,
    pub devices_updated: usize,
}

/// Atmosphere of one grid.
pub struct GridAtmosphere {
    pub(crate) id: GridId,
    pub(crate) tiles: TileMap,
    pub(crate) default_mixture: GasMixture,
    pub(crate) tile_defaults: TileDefaults,

    pub(crate) active_tiles: BTreeSet<TileCoord>,
    pub(crate) excited_groups: ExcitedGroups,
    pub(crate) hotspot_tiles: BTreeSet<TileCoord>,
    pub(crate) superconductivity_tiles: BTreeSet<TileCoord>,
    pub(crate) high_pressure_delta: BTreeSet<TileCoord>,
    pub(crate) reactive_tiles: BTreeSet<TileCoord>,
    pub(crate) invalidated: BTreeSet<TileCoord>,

    pub(crate) devices: Vec<(DeviceId, Box<dyn AtmosDevice>)>,
    next_device_id: u32,

    pub(crate) current_run: VecDeque<TileCoord>,
    pub(crate) current_run_groups: VecDeque<ExcitedGroupId>,
    pub(crate) device_cursor: usize,
    pub(crate) phase: ProcessingPhase,
    pub(crate) paused: bool,
    pub(crate) update_counter: u32,
    pub(crate) timer: f32,
    pub(crate) simulated: bool,
    pub(crate) stats: CycleStats,
    pub(crate) last_cycle_stats: CycleStats,
}

impl std::fmt::Debug for GridAtmosphere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridAtmosphere")
            .field("id", &self.id)
            .field("tiles", &self.tiles.len())
            .field("active", &self.active_tiles.len())
            .field("groups", &self.excited_groups.len())
            .field("phase", &self.phase)
            .field("update_counter", &self.update_counter)
            .finish()
    }
}

impl GridAtmosphere {
    pub fn new(id: GridId, default_mixture: GasMixture, tile_defaults: TileDefaults) -> Self {
        Self {
            id,
            tiles: TileMap::new(),
            default_mixture,
            tile_defaults,
            active_tiles: BTreeSet::new(),
            excited_groups: ExcitedGroups::default(),
            hotspot_tiles: BTreeSet::new(),
            superconductivity_tiles: BTreeSet::new(),
            high_pressure_delta: BTreeSet::new(),
            reactive_tiles: BTreeSet::new(),
            invalidated: BTreeSet::new(),
            devices: Vec::new(),
            next_device_id: 0,
            current_run: VecDeque::new(),
            current_run_groups: VecDeque::new(),
            device_cursor: 0,
            phase: ProcessingPhase::Revalidate,
            paused: false,
            update_counter: 1,
            timer: 0.0,
            simulated: true,
            stats: CycleStats::default(),
            last_cycle_stats: CycleStats::default(),
        }
    }

    // ── Read access ─────────────────────────────────────────────────────

    pub fn id(&self) -> GridId {
        self.id
    }

    pub fn tile(&self, coord: TileCoord) -> Option<&TileAtmosphere> {
        self.tiles.get(&coord)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &TileAtmosphere> {
        self.tiles.iter()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile_mixture(&self, coord: TileCoord) -> Option<&GasMixture> {
        self.tiles.get(&coord).and_then(|t| t.air.as_ref())
    }

    pub fn default_mixture(&self) -> &GasMixture {
        &self.default_mixture
    }

    /// Neighbouring tiles. With `include_blocked` false only open
    /// (air-connected) neighbours are returned.
    pub fn adjacent_tiles(&self, coord: TileCoord, include_blocked: bool) -> Vec<&TileAtmosphere> {
        let Some(tile) = self.tiles.get(&coord) else {
            return Vec::new();
        };
        coord
            .neighbors()
            .filter(|(dir, _)| include_blocked || tile.adjacent_bits.contains(*dir))
            .filter_map(|(_, c)| self.tiles.get(&c))
            .collect()
    }

    /// Every tile that has a mixture.
    pub fn all_mixtures(&self) -> Vec<(TileCoord, &GasMixture)> {
        let mut out: Vec<_> = self
            .tiles
            .iter()
            .filter_map(|t| t.air.as_ref().map(|a| (t.coord, a)))
            .collect();
        out.sort_by_key(|(c, _)| *c);
        out
    }

    pub fn is_active(&self, coord: TileCoord) -> bool {
        self.active_tiles.contains(&coord)
    }

    pub fn active_tiles(&self) -> &BTreeSet<TileCoord> {
        &self.active_tiles
    }

    pub fn active_tile_count(&self) -> usize {
        self.active_tiles.len()
    }

    pub fn excited_group_count(&self) -> usize {
        self.excited_groups.len()
    }

    /// The live excited group `coord` belongs to. A stale id counts as none.
    pub fn excited_group_of(&self, coord: TileCoord) -> Option<ExcitedGroupId> {
        self.tiles
            .get(&coord)
            .and_then(|t| t.excited_group)
            .filter(|id| self.excited_groups.contains(*id))
    }

    pub fn is_hotspot_active(&self, coord: TileCoord) -> bool {
        self.tiles.get(&coord).map(|t| t.hotspot.valid).unwrap_or(false)
    }

    pub fn hotspot_count(&self) -> usize {
        self.hotspot_tiles.len()
    }

    pub fn is_superconducting(&self, coord: TileCoord) -> bool {
        self.superconductivity_tiles.contains(&coord)
    }

    pub fn pending_invalidations(&self) -> usize {
        self.invalidated.len()
    }

    pub fn phase(&self) -> ProcessingPhase {
        self.phase
    }

    /// A phase ran out of budget and will resume from its saved queue.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Completed cycles plus one.
    pub fn update_counter(&self) -> u32 {
        self.update_counter
    }

    /// Work done so far in the current cycle.
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn last_cycle_stats(&self) -> &CycleStats {
        &self.last_cycle_stats
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    pub fn set_simulated(&mut self, simulated: bool) {
        self.simulated = simulated;
    }

    /// Total moles and thermal energy over every mutable mixture.
    pub fn totals(&self) -> (f64, f64) {
        self.tiles
            .iter()
            .filter(|t| t.is_simulated())
            .filter_map(|t| t.air.as_ref())
            .fold((0.0, 0.0), |(m, e), a| {
                (m + a.total_moles() as f64, e + a.thermal_energy() as f64)
            })
    }

    // ── Tile lifecycle ──────────────────────────────────────────────────

    /// Create a tile. Floor tiles get a copy of the grid's default mixture.
    /// Returns false if the tile already exists.
    pub fn add_tile(&mut self, coord: TileCoord, kind: TileKind) -> bool {
        let air = match kind {
            TileKind::Floor => self.default_mixture.clone(),
            TileKind::Space => GasMixture::space(),
        };
        self.add_tile_with_mixture(coord, Some(air))
    }

    /// Create a tile with an explicit mixture (`None` for airless).
    pub fn add_tile_with_mixture(&mut self, coord: TileCoord, air: Option<GasMixture>) -> bool {
        if self.tiles.contains(&coord) {
            return false;
        }
        let space = air.as_ref().map(|a| a.is_immutable()).unwrap_or(false);
        self.tiles
            .insert(TileAtmosphere::new(coord, air, space, &self.tile_defaults));
        self.invalidate(coord);
        for (_, neighbor) in coord.neighbors() {
            if self.tiles.contains(&neighbor) {
                self.invalidate(neighbor);
            }
        }
        true
    }

    /// Remove a tile and purge it from every tracking set.
    pub fn remove_tile(&mut self, coord: TileCoord) -> Option<TileAtmosphere> {
        self.excited_group_remove_tile(coord);
        let tile = self.tiles.remove(&coord)?;
        self.active_tiles.remove(&coord);
        self.hotspot_tiles.remove(&coord);
        self.superconductivity_tiles.remove(&coord);
        self.high_pressure_delta.remove(&coord);
        self.reactive_tiles.remove(&coord);
        self.invalidated.remove(&coord);
        for (_, neighbor) in coord.neighbors() {
            if self.tiles.contains(&neighbor) {
                self.invalidate(neighbor);
            }
        }
        Some(tile)
    }

    /// Queue a tile for revalidation on the next revalidate phase.
    pub fn invalidate(&mut self, coord: TileCoord) {
        self.invalidated.insert(coord);
    }

    // ── Gas access ──────────────────────────────────────────────────────

    /// Merge `given` into a tile's air and wake it up.
    pub fn merge_into_tile(&mut self, coord: TileCoord, given: &GasMixture) -> bool {
        let Some(air) = self.tiles.get_mut(&coord).and_then(|t| t.air.as_mut()) else {
            return false;
        };
        air.merge(given);
        self.excite_tile(coord);
        true
    }

    /// Take `moles` out of a tile's air and wake it up.
    pub fn remove_from_tile(&mut self, coord: TileCoord, moles: f32) -> Option<GasMixture> {
        let air = self.tiles.get_mut(&coord)?.air.as_mut()?;
        let removed = air.remove(moles);
        self.excite_tile(coord);
        Some(removed)
    }

    /// Perturb a tile: dissolve its excited group and mark it and its open
    /// neighbours active.
    pub fn excite_tile(&mut self, coord: TileCoord) {
        let Some(tile) = self.tiles.get(&coord) else {
            return;
        };
        let open = tile.adjacent_bits;
        self.remove_active_tile(coord, true);
        self.add_active_tile(coord);
        for dir in open.iter() {
            self.add_active_tile(coord.offset(dir));
        }
    }

    // ── Active set ──────────────────────────────────────────────────────

    pub(crate) fn add_active_tile(&mut self, coord: TileCoord) {
        let Some(tile) = self.tiles.get_mut(&coord) else {
            return;
        };
        if !tile.is_simulated() {
            return;
        }
        tile.excited = true;
        self.active_tiles.insert(coord);
    }

    pub(crate) fn remove_active_tile(&mut self, coord: TileCoord, dispose_group: bool) {
        if let Some(tile) = self.tiles.get_mut(&coord) {
            tile.excited = false;
        }
        self.active_tiles.remove(&coord);
        if dispose_group {
            if let Some(group) = self.excited_group_of(coord) {
                self.excited_group_dispose(group);
            }
        }
    }

    // ── Adjacency ───────────────────────────────────────────────────────

    /// Recompute open directions for a tile and its neighbours.
    pub(crate) fn update_adjacency(&mut self, coord: TileCoord) {
        self.recompute_adjacent_bits(coord);
        for (_, neighbor) in coord.neighbors() {
            self.recompute_adjacent_bits(neighbor);
        }
    }

    fn recompute_adjacent_bits(&mut self, coord: TileCoord) {
        let Some(tile) = self.tiles.get(&coord) else {
            return;
        };
        let blocked = tile.blocked_airflow;
        let mut bits = AtmosDirection::empty();
        for (dir, neighbor) in coord.neighbors() {
            if blocked.contains(dir) {
                continue;
            }
            match self.tiles.get(&neighbor) {
                Some(other) if !other.blocked_airflow.contains(dir.opposite()) => bits |= dir,
                _ => {}
            }
        }
        if let Some(tile) = self.tiles.get_mut(&coord) {
            tile.adjacent_bits = bits;
        }
    }

    // ── Devices ─────────────────────────────────────────────────────────

    pub fn add_device(&mut self, device: Box<dyn AtmosDevice>) -> DeviceId {
        let id = DeviceId(self.next_device_id);
        self.next_device_id += 1;
        self.devices.push((id, device));
        id
    }

    pub fn remove_device(&mut self, id: DeviceId) -> Option<Box<dyn AtmosDevice>> {
        let i = self.devices.iter().position(|(d, _)| *d == id)?;
        if i < self.device_cursor {
            self.device_cursor -= 1;
        }
        Some(self.devices.remove(i).1)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub(crate) fn tile_mut(&mut self, coord: TileCoord) -> Option<&mut TileAtmosphere> {
        self.tiles.get_mut(&coord)
    }
}

impl TileGasAccess for GridAtmosphere {
    fn tile_mixture(&self, coord: TileCoord) -> Option<&GasMixture> {
        GridAtmosphere::tile_mixture(self, coord)
    }

    fn modify_tile_mixture(&mut self, coord: TileCoord, f: &mut dyn FnMut(&mut GasMixture)) -> bool {
        let Some(tile) = self.tiles.get_mut(&coord) else {
            return false;
        };
        if !tile.is_simulated() {
            return false;
        }
        if let Some(air) = tile.air.as_mut() {
            f(air);
        }
        self.excite_tile(coord);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atmosim_logic::constants::{CELL_VOLUME, T20C};

    fn grid() -> GridAtmosphere {
        GridAtmosphere::new(
            GridId(0),
            GasMixture::standard_air(CELL_VOLUME, T20C),
            TileDefaults::default(),
        )
    }

    #[test]
    fn test_add_tile_invalidates_neighbours() {
        let mut grid = grid();
        assert!(grid.add_tile(TileCoord::new(0, 0), TileKind::Floor));
        assert!(!grid.add_tile(TileCoord::new(0, 0), TileKind::Floor));
        grid.invalidated.clear();
        grid.add_tile(TileCoord::new(1, 0), TileKind::Floor);
        assert!(grid.invalidated.contains(&TileCoord::new(0, 0)));
        assert!(grid.invalidated.contains(&TileCoord::new(1, 0)));
    }

    #[test]
    fn test_floor_tiles_copy_default_mixture() {
        let mut grid = grid();
        grid.add_tile(TileCoord::new(0, 0), TileKind::Floor);
        grid.add_tile(TileCoord::new(1, 0), TileKind::Space);
        let floor = grid.tile_mixture(TileCoord::new(0, 0)).expect("floor air");
        assert_eq!(floor.moles_array(), grid.default_mixture().moles_array());
        let space = grid.tile(TileCoord::new(1, 0)).expect("space tile");
        assert!(space.space);
        assert!(!space.is_simulated());
    }

    #[test]
    fn test_adjacency_respects_blocking() {
        let mut grid = grid();
        let a = TileCoord::new(0, 0);
        let b = TileCoord::new(1, 0);
        grid.add_tile(a, TileKind::Floor);
        grid.add_tile(b, TileKind::Floor);
        grid.update_adjacency(a);
        assert!(grid.tile(a).map(|t| t.adjacent_bits) == Some(AtmosDirection::EAST));
        assert_eq!(grid.adjacent_tiles(a, false).len(), 1);

        if let Some(tile) = grid.tile_mut(b) {
            tile.blocked_airflow = AtmosDirection::WEST;
        }
        grid.update_adjacency(b);
        assert_eq!(grid.tile(a).map(|t| t.adjacent_bits), Some(AtmosDirection::empty()));
        assert!(grid.adjacent_tiles(a, false).is_empty());
        assert_eq!(grid.adjacent_tiles(a, true).len(), 1);
    }

    #[test]
    fn test_space_never_becomes_active() {
        let mut grid = grid();
        let c = TileCoord::new(0, 0);
        grid.add_tile(c, TileKind::Space);
        grid.add_active_tile(c);
        assert!(!grid.is_active(c));
    }

    #[test]
    fn test_remove_tile_purges_sets() {
        let mut grid = grid();
        let c = TileCoord::new(0, 0);
        grid.add_tile(c, TileKind::Floor);
        grid.add_active_tile(c);
        grid.hotspot_tiles.insert(c);
        grid.high_pressure_delta.insert(c);
        assert!(grid.remove_tile(c).is_some());
        assert!(!grid.is_active(c));
        assert_eq!(grid.hotspot_count(), 0);
        assert!(grid.high_pressure_delta.is_empty());
        assert!(grid.remove_tile(c).is_none());
    }

    #[test]
    fn test_merge_into_missing_tile_is_absent() {
        let mut grid = grid();
        let given = GasMixture::standard_air(CELL_VOLUME, T20C);
        assert!(!grid.merge_into_tile(TileCoord::new(5, 5), &given));
        assert!(grid.remove_from_tile(TileCoord::new(5, 5), 10.0).is_none());
    }

    #[test]
    fn test_phase_order_wraps_to_none() {
        assert_eq!(ProcessingPhase::Revalidate.next(), Some(ProcessingPhase::Equalize));
        assert_eq!(ProcessingPhase::AtmosDevices.next(), None);
    }
}
