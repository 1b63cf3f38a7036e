//! Excited groups: transient clusters of tiles that are still exchanging.
//!
//! Groups live in an arena keyed by [`ExcitedGroupId`]. Tiles keep only the
//! id; a tile whose id no longer resolves is simply groupless. Merging keeps
//! the larger group's id and folds the smaller one in.

use std::collections::{BTreeMap, BTreeSet};

use atmosim_logic::GasMixture;
use log::trace;
use serde::{Deserialize, Serialize};

use super::GridAtmosphere;
use crate::tile::TileCoord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExcitedGroupId(pub u32);

#[derive(Debug, Clone, Default)]
pub struct ExcitedGroup {
    pub tiles: BTreeSet<TileCoord>,
    pub breakdown_cooldown: u32,
    pub dismantle_cooldown: u32,
}

impl ExcitedGroup {
    pub fn reset_cooldowns(&mut self) {
        self.breakdown_cooldown = 0;
        self.dismantle_cooldown = 0;
    }
}

/// Arena of live groups.
#[derive(Debug, Default)]
pub struct ExcitedGroups {
    groups: BTreeMap<ExcitedGroupId, ExcitedGroup>,
    next_id: u32,
}

impl ExcitedGroups {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn contains(&self, id: ExcitedGroupId) -> bool {
        self.groups.contains_key(&id)
    }

    pub fn get(&self, id: ExcitedGroupId) -> Option<&ExcitedGroup> {
        self.groups.get(&id)
    }

    pub fn get_mut(&mut self, id: ExcitedGroupId) -> Option<&mut ExcitedGroup> {
        self.groups.get_mut(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = ExcitedGroupId> + '_ {
        self.groups.keys().copied()
    }

    fn create(&mut self) -> ExcitedGroupId {
        let id = ExcitedGroupId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.groups.insert(id, ExcitedGroup::default());
        id
    }

    fn remove(&mut self, id: ExcitedGroupId) -> Option<ExcitedGroup> {
        self.groups.remove(&id)
    }
}

impl GridAtmosphere {
    pub(crate) fn excited_group_create(&mut self) -> ExcitedGroupId {
        self.excited_groups.create()
    }

    /// Put a tile in a group, leaving any group it was in before.
    pub(crate) fn excited_group_add_tile(&mut self, group: ExcitedGroupId, coord: TileCoord) {
        if !self.excited_groups.contains(group) {
            return;
        }
        match self.excited_group_of(coord) {
            Some(current) if current == group => return,
            Some(_) => self.excited_group_remove_tile(coord),
            None => {}
        }
        let Some(tile) = self.tiles.get_mut(&coord) else {
            return;
        };
        tile.excited_group = Some(group);
        if let Some(g) = self.excited_groups.get_mut(group) {
            g.tiles.insert(coord);
            g.reset_cooldowns();
        }
    }

    /// Take a tile out of its group. Empty groups are dropped.
    pub(crate) fn excited_group_remove_tile(&mut self, coord: TileCoord) {
        let Some(group) = self.tiles.get_mut(&coord).and_then(|t| t.excited_group.take()) else {
            return;
        };
        let empty = match self.excited_groups.get_mut(group) {
            Some(g) => {
                g.tiles.remove(&coord);
                g.tiles.is_empty()
            }
            None => false,
        };
        if empty {
            self.excited_groups.remove(group);
        }
    }

    /// Merge two groups. The larger one survives and its cooldowns reset.
    pub(crate) fn excited_group_merge(&mut self, a: ExcitedGroupId, b: ExcitedGroupId) -> ExcitedGroupId {
        if a == b {
            return a;
        }
        let size = |id| self.excited_groups.get(id).map(|g| g.tiles.len()).unwrap_or(0);
        let (winner, loser) = if size(a) >= size(b) { (a, b) } else { (b, a) };
        let Some(absorbed) = self.excited_groups.remove(loser) else {
            return winner;
        };
        for coord in &absorbed.tiles {
            if let Some(tile) = self.tiles.get_mut(coord) {
                tile.excited_group = Some(winner);
            }
        }
        if let Some(g) = self.excited_groups.get_mut(winner) {
            g.tiles.extend(absorbed.tiles);
            g.reset_cooldowns();
        }
        winner
    }

    pub(crate) fn excited_group_reset_cooldowns(&mut self, group: ExcitedGroupId) {
        if let Some(g) = self.excited_groups.get_mut(group) {
            g.reset_cooldowns();
        }
    }

    pub(crate) fn excited_group_reset_dismantle(&mut self, group: ExcitedGroupId) {
        if let Some(g) = self.excited_groups.get_mut(group) {
            g.dismantle_cooldown = 0;
        }
    }

    /// Dissolve a group. Member tiles stay active.
    pub(crate) fn excited_group_dispose(&mut self, group: ExcitedGroupId) {
        self.excited_group_dismantle(group, false);
    }

    /// Dissolve a group; with `unexcite` its tiles also go to sleep.
    pub(crate) fn excited_group_dismantle(&mut self, group: ExcitedGroupId, unexcite: bool) {
        let Some(removed) = self.excited_groups.remove(group) else {
            return;
        };
        for coord in removed.tiles {
            if let Some(tile) = self.tiles.get_mut(&coord) {
                tile.excited_group = None;
            }
            if unexcite {
                self.remove_active_tile(coord, false);
            }
        }
    }

    /// Average every member's gas: merge into one pool, then hand each tile
    /// an equal share. Moles and energy are preserved.
    pub(crate) fn excited_group_self_breakdown(&mut self, group: ExcitedGroupId) {
        let Some(members) = self.excited_groups.get(group).map(|g| g.tiles.clone()) else {
            return;
        };
        let mut combined = GasMixture::new(self.tile_defaults.volume);
        let mut count = 0usize;
        for coord in &members {
            if let Some(air) = self.tiles.get(coord).filter(|t| t.is_simulated()).and_then(|t| t.air.as_ref()) {
                combined.merge(air);
                count += 1;
            }
        }
        if count > 0 {
            combined.multiply(1.0 / count as f32);
            for coord in &members {
                if let Some(tile) = self.tiles.get_mut(coord).filter(|t| t.is_simulated()) {
                    if let Some(air) = tile.air.as_mut() {
                        air.copy_from(&combined);
                    }
                }
            }
            trace!("group {:?} broke down over {} tiles", group, count);
        }
        if let Some(g) = self.excited_groups.get_mut(group) {
            g.breakdown_cooldown = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TileDefaults;
    use crate::grid::GridId;
    use crate::tile::TileKind;
    use atmosim_logic::constants::{CELL_VOLUME, T20C};
    use atmosim_logic::Gas;

    fn row(n: i32) -> GridAtmosphere {
        let mut grid = GridAtmosphere::new(
            GridId(0),
            GasMixture::standard_air(CELL_VOLUME, T20C),
            TileDefaults::default(),
        );
        for x in 0..n {
            grid.add_tile(TileCoord::new(x, 0), TileKind::Floor);
        }
        grid
    }

    #[test]
    fn test_larger_group_survives_merge() {
        let mut grid = row(4);
        let big = grid.excited_group_create();
        let small = grid.excited_group_create();
        grid.excited_group_add_tile(big, TileCoord::new(0, 0));
        grid.excited_group_add_tile(big, TileCoord::new(1, 0));
        grid.excited_group_add_tile(small, TileCoord::new(2, 0));
        if let Some(g) = grid.excited_groups.get_mut(big) {
            g.breakdown_cooldown = 3;
        }

        let winner = grid.excited_group_merge(small, big);
        assert_eq!(winner, big);
        assert_eq!(grid.excited_group_count(), 1);
        assert_eq!(grid.excited_group_of(TileCoord::new(2, 0)), Some(big));
        let group = grid.excited_groups.get(big).expect("group");
        assert_eq!(group.tiles.len(), 3);
        assert_eq!(group.breakdown_cooldown, 0);
    }

    #[test]
    fn test_moving_tile_between_groups_drops_empty_group() {
        let mut grid = row(2);
        let a = grid.excited_group_create();
        let b = grid.excited_group_create();
        grid.excited_group_add_tile(a, TileCoord::new(0, 0));
        grid.excited_group_add_tile(b, TileCoord::new(1, 0));
        grid.excited_group_add_tile(b, TileCoord::new(0, 0));
        assert!(!grid.excited_groups.contains(a));
        assert_eq!(grid.excited_group_count(), 1);
    }

    #[test]
    fn test_breakdown_averages_and_conserves() {
        let mut grid = row(3);
        if let Some(air) = grid.tile_mut(TileCoord::new(0, 0)).and_then(|t| t.air.as_mut()) {
            air.set_moles(Gas::Plasma, 30.0);
            air.set_temperature(600.0);
        }
        let group = grid.excited_group_create();
        for x in 0..3 {
            grid.excited_group_add_tile(group, TileCoord::new(x, 0));
        }
        let (moles_before, energy_before) = grid.totals();
        grid.excited_group_self_breakdown(group);
        let (moles_after, energy_after) = grid.totals();

        assert!((moles_before - moles_after).abs() / moles_before < 1e-5);
        assert!((energy_before - energy_after).abs() / energy_before < 1e-5);
        let plasma: Vec<f32> = (0..3)
            .filter_map(|x| grid.tile_mixture(TileCoord::new(x, 0)))
            .map(|a| a.moles(Gas::Plasma))
            .collect();
        assert!(plasma.iter().all(|p| (p - 10.0).abs() < 1e-3));
    }

    #[test]
    fn test_dismantle_unexcite_sleeps_tiles() {
        let mut grid = row(2);
        let group = grid.excited_group_create();
        for x in 0..2 {
            let c = TileCoord::new(x, 0);
            grid.add_active_tile(c);
            grid.excited_group_add_tile(group, c);
        }
        grid.excited_group_dismantle(group, true);
        assert_eq!(grid.active_tile_count(), 0);
        assert_eq!(grid.excited_group_count(), 0);
        assert!(grid.tile(TileCoord::new(0, 0)).and_then(|t| t.excited_group).is_none());
    }

    #[test]
    fn test_dispose_keeps_tiles_active() {
        let mut grid = row(2);
        let group = grid.excited_group_create();
        for x in 0..2 {
            let c = TileCoord::new(x, 0);
            grid.add_active_tile(c);
            grid.excited_group_add_tile(group, c);
        }
        grid.excited_group_dispose(group);
        assert_eq!(grid.active_tile_count(), 2);
        assert_eq!(grid.excited_group_count(), 0);
    }
}
