//! Atmosphere engine - main entry point for running the simulation

use std::collections::BTreeMap;

use atmosim_logic::{GasMixture, ReactionResult};
use hecs::{Entity, World};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::budget::ProcessingBudget;
use crate::config::AtmosConfig;
use crate::devices::{AtmosDevice, DeviceId};
use crate::generation::{generate_station, StationConfig, StationLayout};
use crate::grid::{GridAtmosphere, GridId};
use crate::occupants::{Airtight, HeatConductor, Occupants, TilePosition};
use crate::persistence::SaveError;
use crate::processing::hotspot;
use crate::processing::reactions;
use crate::processing::{advance_phase, process_phase, PhaseContext, PhaseResult, PressureListener};
use crate::tile::{TileAtmosphere, TileCoord, TileKind};

/// Main atmosphere engine
pub struct AtmosphereEngine {
    /// Tunables shared by every grid
    pub config: AtmosConfig,
    /// Airtight occupants (walls, doors, windows)
    occupants: Occupants,
    /// Grids by id; processed in id order
    grids: BTreeMap<GridId, GridAtmosphere>,
    next_grid_id: u32,
    listeners: Vec<Box<dyn PressureListener>>,

    // Resumable grid rotation
    run_queue: Vec<GridId>,
    run_index: usize,
    simulation_paused: bool,
}

impl Default for AtmosphereEngine {
    fn default() -> Self {
        Self::new(AtmosConfig::default())
    }
}

impl AtmosphereEngine {
    /// Create an engine with no grids
    pub fn new(config: AtmosConfig) -> Self {
        Self {
            config,
            occupants: Occupants::new(),
            grids: BTreeMap::new(),
            next_grid_id: 0,
            listeners: Vec::new(),
            run_queue: Vec::new(),
            run_index: 0,
            simulation_paused: false,
        }
    }

    // ── Ticking ─────────────────────────────────────────────────────────

    /// Advance the simulation by `frame_time` seconds under the configured
    /// wall-clock budget. Returns false if the budget ran out and the
    /// next call resumes where this one stopped.
    pub fn update(&mut self, frame_time: f32) -> bool {
        let mut budget = ProcessingBudget::for_tick(&self.config);
        self.update_with_budget(frame_time, &mut budget)
    }

    /// [`update`](Self::update) with an explicit budget.
    ///
    /// Each grid accrues `frame_time` on its timer and advances one phase
    /// per atmos tick it has banked. A grid paused mid-phase resumes
    /// without paying for another tick.
    pub fn update_with_budget(&mut self, frame_time: f32, budget: &mut ProcessingBudget) -> bool {
        if !self.simulation_paused {
            self.run_queue = self.grids.keys().copied().collect();
            self.run_index = 0;
        }
        self.simulation_paused = false;
        let atmos_time = self.config.atmos_time();

        while self.run_index < self.run_queue.len() {
            if budget.is_exhausted() {
                self.simulation_paused = true;
                return false;
            }
            let id = self.run_queue[self.run_index];
            let Some(grid) = self.grids.get_mut(&id) else {
                self.run_index += 1;
                continue;
            };
            if !grid.simulated {
                self.run_index += 1;
                continue;
            }
            if !grid.paused {
                grid.timer += frame_time;
                if grid.timer < atmos_time {
                    self.run_index += 1;
                    continue;
                }
                grid.timer -= atmos_time;
            }

            let mut ctx = PhaseContext {
                config: &self.config,
                occupants: &self.occupants,
                listeners: &mut self.listeners[..],
            };
            match process_phase(grid, &mut ctx, budget) {
                PhaseResult::Paused => {
                    grid.paused = true;
                    self.simulation_paused = true;
                    return false;
                }
                PhaseResult::Complete => {
                    advance_phase(grid, &self.config);
                }
            }
            self.run_index += 1;
        }
        true
    }

    /// Run one phase of one grid, ignoring its timer.
    pub fn step_phase(&mut self, grid: GridId, budget: &mut ProcessingBudget) -> Option<PhaseResult> {
        let atmosphere = self.grids.get_mut(&grid)?;
        let mut ctx = PhaseContext {
            config: &self.config,
            occupants: &self.occupants,
            listeners: &mut self.listeners[..],
        };
        let result = process_phase(atmosphere, &mut ctx, budget);
        match result {
            PhaseResult::Paused => atmosphere.paused = true,
            PhaseResult::Complete => {
                advance_phase(atmosphere, &self.config);
            }
        }
        Some(result)
    }

    /// Run one grid to the end of its current cycle with no budget.
    pub fn run_cycle(&mut self, grid: GridId) -> bool {
        loop {
            let Some(atmosphere) = self.grids.get_mut(&grid) else {
                return false;
            };
            let mut ctx = PhaseContext {
                config: &self.config,
                occupants: &self.occupants,
                listeners: &mut self.listeners[..],
            };
            process_phase(atmosphere, &mut ctx, &mut ProcessingBudget::unlimited());
            if advance_phase(atmosphere, &self.config) {
                return true;
            }
        }
    }

    /// Run every simulated grid through `cycles` full cycles.
    pub fn run_cycles(&mut self, cycles: u32) {
        let ids: Vec<GridId> = self
            .grids
            .values()
            .filter(|g| g.simulated)
            .map(|g| g.id)
            .collect();
        for _ in 0..cycles {
            for &id in &ids {
                self.run_cycle(id);
            }
        }
    }

    /// A grid is mid-phase waiting for budget.
    pub fn is_paused(&self) -> bool {
        self.simulation_paused
    }

    // ── Grids ───────────────────────────────────────────────────────────

    /// Add a grid whose floor tiles start with standard air.
    pub fn add_grid(&mut self) -> GridId {
        let tiles = self.config.tiles;
        self.add_grid_with_mixture(GasMixture::standard_air(tiles.volume, tiles.temperature))
    }

    pub fn add_grid_with_mixture(&mut self, default_mixture: GasMixture) -> GridId {
        let id = GridId(self.next_grid_id);
        self.next_grid_id += 1;
        self.grids
            .insert(id, GridAtmosphere::new(id, default_mixture, self.config.tiles));
        info!("grid {:?} added", id);
        id
    }

    /// Remove a grid, its tiles and every occupant on it.
    pub fn remove_grid(&mut self, id: GridId) -> Option<GridAtmosphere> {
        let grid = self.grids.remove(&id)?;
        let occupants = self.occupants.remove_grid(id);
        info!(
            "grid {:?} removed ({} tiles, {} occupants)",
            id,
            grid.tile_count(),
            occupants
        );
        Some(grid)
    }

    pub fn grid(&self, id: GridId) -> Option<&GridAtmosphere> {
        self.grids.get(&id)
    }

    pub fn grid_mut(&mut self, id: GridId) -> Option<&mut GridAtmosphere> {
        self.grids.get_mut(&id)
    }

    pub fn grids(&self) -> impl Iterator<Item = &GridAtmosphere> {
        self.grids.values()
    }

    pub fn grid_count(&self) -> usize {
        self.grids.len()
    }

    /// Pause or resume one grid.
    pub fn set_simulated(&mut self, grid: GridId, simulated: bool) -> bool {
        match self.grids.get_mut(&grid) {
            Some(g) => {
                g.set_simulated(simulated);
                true
            }
            None => false,
        }
    }

    // ── Tiles ───────────────────────────────────────────────────────────

    pub fn add_tile(&mut self, grid: GridId, coord: TileCoord, kind: TileKind) -> bool {
        self.grids
            .get_mut(&grid)
            .map(|g| g.add_tile(coord, kind))
            .unwrap_or(false)
    }

    pub fn add_tile_with_mixture(&mut self, grid: GridId, coord: TileCoord, air: Option<GasMixture>) -> bool {
        self.grids
            .get_mut(&grid)
            .map(|g| g.add_tile_with_mixture(coord, air))
            .unwrap_or(false)
    }

    pub fn remove_tile(&mut self, grid: GridId, coord: TileCoord) -> Option<TileAtmosphere> {
        self.grids.get_mut(&grid)?.remove_tile(coord)
    }

    /// Queue a tile for revalidation.
    pub fn invalidate(&mut self, grid: GridId, coord: TileCoord) {
        if let Some(g) = self.grids.get_mut(&grid) {
            g.invalidate(coord);
        }
    }

    // ── Gas access ──────────────────────────────────────────────────────

    pub fn get_tile_mixture(&self, grid: GridId, coord: TileCoord) -> Option<&GasMixture> {
        self.grids.get(&grid)?.tile_mixture(coord)
    }

    pub fn get_adjacent_tiles(
        &self,
        grid: GridId,
        coord: TileCoord,
        include_blocked: bool,
    ) -> impl Iterator<Item = &TileAtmosphere> {
        self.grids
            .get(&grid)
            .into_iter()
            .flat_map(move |g| g.adjacent_tiles(coord, include_blocked))
    }

    /// Every tile with air on a grid, in coordinate order.
    pub fn get_all_mixtures(&self, grid: GridId) -> Vec<(TileCoord, &GasMixture)> {
        self.grids
            .get(&grid)
            .map(|g| g.all_mixtures())
            .unwrap_or_default()
    }

    /// Merge `given` into a tile and wake it.
    pub fn merge_into_tile(&mut self, grid: GridId, coord: TileCoord, given: &GasMixture) -> bool {
        self.grids
            .get_mut(&grid)
            .map(|g| g.merge_into_tile(coord, given))
            .unwrap_or(false)
    }

    /// Take `moles` out of a tile and wake it.
    pub fn remove_from_tile(&mut self, grid: GridId, coord: TileCoord, moles: f32) -> Option<GasMixture> {
        self.grids.get_mut(&grid)?.remove_from_tile(coord, moles)
    }

    /// React a tile's air now instead of waiting for the reactions phase.
    pub fn react_tile(&mut self, grid: GridId, coord: TileCoord) -> ReactionResult {
        match self.grids.get_mut(&grid) {
            Some(g) => reactions::react_tile(g, coord, &self.config.fire),
            None => ReactionResult::NoReaction,
        }
    }

    // ── Fire ────────────────────────────────────────────────────────────

    /// Expose a tile to heat, possibly starting a fire. `source` is the
    /// entity responsible, if any.
    pub fn hotspot_expose(
        &mut self,
        grid: GridId,
        coord: TileCoord,
        exposed_temperature: f32,
        exposed_volume: f32,
        soh: bool,
        source: Option<Entity>,
    ) -> bool {
        let Some(g) = self.grids.get_mut(&grid) else {
            return false;
        };
        let ignited = hotspot::hotspot_expose(g, coord, exposed_temperature, exposed_volume, soh, &self.config.fire);
        if ignited {
            if let Some(source) = source {
                debug!("{:?} exposed {:?} on grid {:?}", source, coord, grid);
            }
        }
        ignited
    }

    pub fn hotspot_extinguish(&mut self, grid: GridId, coord: TileCoord) -> bool {
        self.grids
            .get_mut(&grid)
            .map(|g| hotspot::hotspot_extinguish(g, coord))
            .unwrap_or(false)
    }

    pub fn is_hotspot_active(&self, grid: GridId, coord: TileCoord) -> bool {
        self.grids
            .get(&grid)
            .map(|g| g.is_hotspot_active(coord))
            .unwrap_or(false)
    }

    // ── Hooks ───────────────────────────────────────────────────────────

    /// Receive every pressure movement the high-pressure phase reports.
    pub fn register_pressure_listener(&mut self, listener: Box<dyn PressureListener>) {
        self.listeners.push(listener);
    }

    pub fn add_device(&mut self, grid: GridId, device: Box<dyn AtmosDevice>) -> Option<DeviceId> {
        Some(self.grids.get_mut(&grid)?.add_device(device))
    }

    pub fn remove_device(&mut self, grid: GridId, id: DeviceId) -> Option<Box<dyn AtmosDevice>> {
        self.grids.get_mut(&grid)?.remove_device(id)
    }

    // ── Occupants ───────────────────────────────────────────────────────

    /// The occupant world.
    pub fn world(&self) -> &World {
        self.occupants.world()
    }

    pub fn occupants(&self) -> &Occupants {
        &self.occupants
    }

    /// Place an anchored airtight occupant and invalidate its tile.
    pub fn spawn_airtight(
        &mut self,
        grid: GridId,
        coord: TileCoord,
        airtight: Airtight,
        conductor: Option<HeatConductor>,
    ) -> Option<Entity> {
        if !self.grids.contains_key(&grid) {
            return None;
        }
        let position = TilePosition::anchored(grid, coord);
        let entity = self.occupants.spawn(position, Some(airtight), conductor);
        self.invalidate_position(position);
        Some(entity)
    }

    pub fn despawn_occupant(&mut self, entity: Entity) -> bool {
        match self.occupants.despawn(entity) {
            Some(position) => {
                self.invalidate_position(position);
                true
            }
            None => false,
        }
    }

    /// Set an occupant's rotation in clockwise quarter turns.
    pub fn rotate_occupant(&mut self, entity: Entity, rotation: u8) -> bool {
        self.update_position(entity, |p| p.rotation = rotation % 4)
    }

    pub fn set_occupant_anchored(&mut self, entity: Entity, anchored: bool) -> bool {
        self.update_position(entity, |p| p.anchored = anchored)
    }

    /// Move an occupant. Both the old and the new tile are invalidated.
    pub fn move_occupant(&mut self, entity: Entity, grid: GridId, coord: TileCoord) -> bool {
        if !self.grids.contains_key(&grid) {
            return false;
        }
        self.update_position(entity, |p| {
            p.grid = grid;
            p.coord = coord;
        })
    }

    /// Open or close an airtight occupant (doors).
    pub fn set_airtight(&mut self, entity: Entity, air_blocked: bool) -> bool {
        match self.occupants.set_air_blocked(entity, air_blocked) {
            Some(position) => {
                self.invalidate_position(position);
                true
            }
            None => false,
        }
    }

    fn update_position(&mut self, entity: Entity, change: impl FnOnce(&mut TilePosition)) -> bool {
        let Some(mut position) = self.occupants.position(entity) else {
            return false;
        };
        change(&mut position);
        let Some(old) = self.occupants.set_position(entity, position) else {
            return false;
        };
        self.invalidate_position(old);
        if (old.grid, old.coord) != (position.grid, position.coord) {
            self.invalidate_position(position);
        }
        true
    }

    fn invalidate_position(&mut self, position: TilePosition) {
        self.invalidate(position.grid, position.coord);
    }

    // ── Generation & persistence ────────────────────────────────────────

    /// Generate a station on a new grid. The same seed always builds the
    /// same station.
    pub fn generate_station(&mut self, config: &StationConfig, seed: u64) -> StationLayout {
        let mut rng = StdRng::seed_from_u64(seed);
        generate_station(self, config, &mut rng)
    }

    /// Save engine state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), SaveError> {
        crate::persistence::save_simulation(writer, &self.config, self.grids.values(), &self.occupants)
    }

    /// Load engine state from a reader, replacing every grid and occupant.
    /// Loaded tiles are invalidated and settle on the first cycle.
    pub fn load<R: std::io::Read>(&mut self, reader: R) -> Result<(), SaveError> {
        let loaded = crate::persistence::load_simulation(reader)?;

        self.config = loaded.config;
        self.occupants = loaded.occupants;
        self.grids = loaded.grids.into_iter().map(|g| (g.id, g)).collect();
        self.next_grid_id = self.grids.keys().last().map(|id| id.0 + 1).unwrap_or(0);

        // Start a fresh rotation
        self.run_queue.clear();
        self.run_index = 0;
        self.simulation_paused = false;

        info!("loaded {} grids, {} occupants", self.grids.len(), self.occupants.len());
        Ok(())
    }
}
