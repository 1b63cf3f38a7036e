//! Tile occupants: walls, doors, windows and anything else that blocks air
//! or conducts heat, held as entities in a `hecs` world.
//!
//! The world is indexed by tile so revalidation can recompute a tile's
//! blocked directions without scanning every entity.

use std::collections::HashMap;

use atmosim_logic::AtmosDirection;
use hecs::{Entity, EntityBuilder, World};
use serde::{Deserialize, Serialize};

use crate::grid::GridId;
use crate::tile::TileCoord;

// ── Components ─────────────────────────────────────────────────────────

/// Where an occupant sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePosition {
    pub grid: GridId,
    pub coord: TileCoord,
    /// Only anchored occupants affect the atmosphere.
    pub anchored: bool,
    /// Clockwise quarter turns applied to `Airtight::blocked_directions`.
    pub rotation: u8,
}

impl TilePosition {
    pub fn anchored(grid: GridId, coord: TileCoord) -> Self {
        Self {
            grid,
            coord,
            anchored: true,
            rotation: 0,
        }
    }
}

/// Blocks airflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airtight {
    pub air_blocked: bool,
    /// Unrotated directions this occupant seals.
    pub blocked_directions: AtmosDirection,
    /// A tile fully sealed by this occupant holds no air at all.
    pub no_air_when_fully_blocked: bool,
}

impl Airtight {
    /// Seals every side and removes the tile's air.
    pub fn wall() -> Self {
        Self {
            air_blocked: true,
            blocked_directions: AtmosDirection::all(),
            no_air_when_fully_blocked: true,
        }
    }

    /// Seals every side but keeps the tile's air (doors, windows).
    pub fn door() -> Self {
        Self {
            air_blocked: true,
            blocked_directions: AtmosDirection::all(),
            no_air_when_fully_blocked: false,
        }
    }

    /// Seals one side (thin windows, directional panes).
    pub fn directional(direction: AtmosDirection) -> Self {
        Self {
            air_blocked: true,
            blocked_directions: direction,
            no_air_when_fully_blocked: false,
        }
    }
}

/// Solid thermal properties an occupant gives its tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatConductor {
    pub thermal_conductivity: f32,
    pub heat_capacity: f32,
}

// ── Index ──────────────────────────────────────────────────────────────

/// The occupant world plus a per-tile entity index.
#[derive(Default)]
pub struct Occupants {
    world: World,
    by_tile: HashMap<(GridId, TileCoord), Vec<Entity>>,
}

impl Occupants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn len(&self) -> usize {
        self.world.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.world.len() == 0
    }

    pub fn spawn(
        &mut self,
        position: TilePosition,
        airtight: Option<Airtight>,
        conductor: Option<HeatConductor>,
    ) -> Entity {
        let mut builder = EntityBuilder::new();
        builder.add(position);
        if let Some(airtight) = airtight {
            builder.add(airtight);
        }
        if let Some(conductor) = conductor {
            builder.add(conductor);
        }
        let entity = self.world.spawn(builder.build());
        self.index(entity, &position);
        entity
    }

    /// Remove an occupant. Returns where it was.
    pub fn despawn(&mut self, entity: Entity) -> Option<TilePosition> {
        let position = self.position(entity)?;
        self.unindex(entity, &position);
        self.world.despawn(entity).ok()?;
        Some(position)
    }

    pub fn position(&self, entity: Entity) -> Option<TilePosition> {
        self.world.get::<&TilePosition>(entity).ok().map(|p| *p)
    }

    pub fn airtight(&self, entity: Entity) -> Option<Airtight> {
        self.world.get::<&Airtight>(entity).ok().map(|a| *a)
    }

    /// Replace an occupant's position. Returns the old one.
    pub fn set_position(&mut self, entity: Entity, position: TilePosition) -> Option<TilePosition> {
        let old = self.position(entity)?;
        if let Ok(mut p) = self.world.get::<&mut TilePosition>(entity) {
            *p = position;
        }
        if (old.grid, old.coord) != (position.grid, position.coord) {
            self.unindex(entity, &old);
            self.index(entity, &position);
        }
        Some(old)
    }

    /// Toggle air blocking (doors opening and closing). Returns the
    /// occupant's position when it has an [`Airtight`] component.
    pub fn set_air_blocked(&mut self, entity: Entity, blocked: bool) -> Option<TilePosition> {
        let position = self.position(entity)?;
        let mut airtight = self.world.get::<&mut Airtight>(entity).ok()?;
        airtight.air_blocked = blocked;
        Some(position)
    }

    pub fn entities_at(&self, grid: GridId, coord: TileCoord) -> &[Entity] {
        self.by_tile.get(&(grid, coord)).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// OR of every anchored, air-blocking occupant's rotated directions.
    pub fn blocked_directions(&self, grid: GridId, coord: TileCoord) -> AtmosDirection {
        let mut blocked = AtmosDirection::empty();
        for &entity in self.entities_at(grid, coord) {
            if let Some((position, airtight)) = self.anchored_airtight(entity) {
                blocked |= airtight.blocked_directions.rotate_clockwise(position.rotation);
            }
        }
        blocked
    }

    /// Whether the tile should hold no air: every side is sealed and at
    /// least one sealing occupant asks for it.
    pub fn no_air_when_fully_blocked(&self, grid: GridId, coord: TileCoord) -> bool {
        if self.blocked_directions(grid, coord) != AtmosDirection::all() {
            return false;
        }
        self.entities_at(grid, coord)
            .iter()
            .filter_map(|&e| self.anchored_airtight(e))
            .any(|(_, airtight)| airtight.no_air_when_fully_blocked)
    }

    /// Combined solid properties of anchored conductors on a tile: the
    /// lowest conductivity and the highest heat capacity.
    pub fn heat_conductor(&self, grid: GridId, coord: TileCoord) -> Option<HeatConductor> {
        let mut result: Option<HeatConductor> = None;
        for &entity in self.entities_at(grid, coord) {
            let anchored = self.position(entity).map(|p| p.anchored).unwrap_or(false);
            if !anchored {
                continue;
            }
            let Ok(conductor) = self.world.get::<&HeatConductor>(entity) else {
                continue;
            };
            result = Some(match result {
                Some(r) => HeatConductor {
                    thermal_conductivity: r.thermal_conductivity.min(conductor.thermal_conductivity),
                    heat_capacity: r.heat_capacity.max(conductor.heat_capacity),
                },
                None => *conductor,
            });
        }
        result
    }

    /// Despawn every occupant on a grid. Returns how many went.
    pub fn remove_grid(&mut self, grid: GridId) -> usize {
        let keys: Vec<_> = self.by_tile.keys().filter(|(g, _)| *g == grid).copied().collect();
        let mut removed = 0;
        for key in keys {
            for entity in self.by_tile.remove(&key).unwrap_or_default() {
                if self.world.despawn(entity).is_ok() {
                    removed += 1;
                }
            }
        }
        removed
    }

    fn anchored_airtight(&self, entity: Entity) -> Option<(TilePosition, Airtight)> {
        let position = self.position(entity)?;
        let airtight = self.airtight(entity)?;
        (position.anchored && airtight.air_blocked).then_some((position, airtight))
    }

    fn index(&mut self, entity: Entity, position: &TilePosition) {
        self.by_tile
            .entry((position.grid, position.coord))
            .or_default()
            .push(entity);
    }

    fn unindex(&mut self, entity: Entity, position: &TilePosition) {
        let key = (position.grid, position.coord);
        if let Some(list) = self.by_tile.get_mut(&key) {
            list.retain(|e| *e != entity);
            if list.is_empty() {
                self.by_tile.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: GridId = GridId(1);

    #[test]
    fn test_wall_blocks_everything() {
        let mut occupants = Occupants::new();
        let c = TileCoord::new(2, 3);
        occupants.spawn(TilePosition::anchored(GRID, c), Some(Airtight::wall()), None);
        assert_eq!(occupants.blocked_directions(GRID, c), AtmosDirection::all());
        assert!(occupants.no_air_when_fully_blocked(GRID, c));
        assert_eq!(occupants.blocked_directions(GRID, TileCoord::new(0, 0)), AtmosDirection::empty());
    }

    #[test]
    fn test_unanchored_occupant_is_ignored() {
        let mut occupants = Occupants::new();
        let c = TileCoord::new(0, 0);
        let mut position = TilePosition::anchored(GRID, c);
        position.anchored = false;
        occupants.spawn(position, Some(Airtight::wall()), None);
        assert_eq!(occupants.blocked_directions(GRID, c), AtmosDirection::empty());
    }

    #[test]
    fn test_rotation_turns_directional_blockers() {
        let mut occupants = Occupants::new();
        let c = TileCoord::new(0, 0);
        let mut position = TilePosition::anchored(GRID, c);
        position.rotation = 1;
        occupants.spawn(position, Some(Airtight::directional(AtmosDirection::NORTH)), None);
        assert_eq!(occupants.blocked_directions(GRID, c), AtmosDirection::EAST);
        assert!(!occupants.no_air_when_fully_blocked(GRID, c));
    }

    #[test]
    fn test_open_door_stops_blocking() {
        let mut occupants = Occupants::new();
        let c = TileCoord::new(0, 0);
        let door = occupants.spawn(TilePosition::anchored(GRID, c), Some(Airtight::door()), None);
        assert!(occupants.set_air_blocked(door, false).is_some());
        assert_eq!(occupants.blocked_directions(GRID, c), AtmosDirection::empty());
    }

    #[test]
    fn test_move_reindexes() {
        let mut occupants = Occupants::new();
        let from = TileCoord::new(0, 0);
        let to = TileCoord::new(1, 0);
        let wall = occupants.spawn(TilePosition::anchored(GRID, from), Some(Airtight::wall()), None);
        let old = occupants.set_position(wall, TilePosition::anchored(GRID, to));
        assert_eq!(old.map(|p| p.coord), Some(from));
        assert!(occupants.entities_at(GRID, from).is_empty());
        assert_eq!(occupants.entities_at(GRID, to), &[wall]);
    }

    #[test]
    fn test_conductors_combine() {
        let mut occupants = Occupants::new();
        let c = TileCoord::new(0, 0);
        let at = TilePosition::anchored(GRID, c);
        occupants.spawn(at, None, Some(HeatConductor { thermal_conductivity: 0.05, heat_capacity: 10_000.0 }));
        occupants.spawn(at, None, Some(HeatConductor { thermal_conductivity: 0.01, heat_capacity: 312_500.0 }));
        let combined = occupants.heat_conductor(GRID, c).expect("conductor");
        assert_eq!(combined.thermal_conductivity, 0.01);
        assert_eq!(combined.heat_capacity, 312_500.0);
    }

    #[test]
    fn test_remove_grid_despawns_only_that_grid() {
        let mut occupants = Occupants::new();
        occupants.spawn(TilePosition::anchored(GRID, TileCoord::new(0, 0)), Some(Airtight::wall()), None);
        occupants.spawn(TilePosition::anchored(GridId(2), TileCoord::new(0, 0)), Some(Airtight::wall()), None);
        assert_eq!(occupants.remove_grid(GRID), 1);
        assert_eq!(occupants.len(), 1);
        let despawned = occupants.despawn(Entity::DANGLING);
        assert!(despawned.is_none());
    }
}
