//! Phased processing.
//!
//! Each grid runs a fixed rotation of phases. A phase snapshots its work
//! into a queue when it starts fresh, then drains the queue under a
//! [`ProcessingBudget`]. Running out of budget leaves the rest of the
//! queue in place; the next call resumes from it instead of snapshotting
//! again.
//!
//! | Phase | Queue | Module |
//! |-------|-------|--------|
//! | Revalidate | invalidated coordinates | [`revalidate`] |
//! | Equalize | active tiles | [`equalize`] |
//! | ExcitedGroups | group ids | [`groups`] |
//! | Reactions | reactive tiles | [`reactions`] |
//! | Hotspots | hotspot tiles | [`hotspot`] |
//! | Superconductivity | superconducting tiles | [`superconductivity`] |
//! | HighPressureDelta | high pressure tiles | [`high_pressure`] |
//! | AtmosDevices | registered devices | [`devices`] |

pub mod devices;
pub mod equalize;
pub mod groups;
pub mod high_pressure;
pub mod hotspot;
pub mod reactions;
pub mod revalidate;
pub mod superconductivity;

use std::collections::VecDeque;

use log::debug;

use crate::budget::ProcessingBudget;
use crate::config::AtmosConfig;
use crate::grid::{GridAtmosphere, ProcessingPhase};
use crate::occupants::Occupants;
use crate::tile::TileCoord;

pub use high_pressure::{PressureListener, PressureMovement};

/// What a phase may touch besides its own grid.
pub struct PhaseContext<'a> {
    pub config: &'a AtmosConfig,
    pub occupants: &'a Occupants,
    pub listeners: &'a mut [Box<dyn PressureListener>],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseResult {
    Complete,
    /// Budget ran out; the queue holds what is left.
    Paused,
}

/// Whether `phase` runs under `config`.
pub fn phase_enabled(phase: ProcessingPhase, config: &AtmosConfig) -> bool {
    match phase {
        ProcessingPhase::ExcitedGroups => config.excited_groups.enabled,
        ProcessingPhase::Superconductivity => config.superconduction.enabled,
        _ => true,
    }
}

/// The next enabled phase after `phase`, or `None` when the cycle ends.
pub fn next_phase(phase: ProcessingPhase, config: &AtmosConfig) -> Option<ProcessingPhase> {
    let mut next = phase.next();
    while let Some(p) = next {
        if phase_enabled(p, config) {
            return Some(p);
        }
        next = p.next();
    }
    None
}

/// Run the grid's current phase.
pub fn process_phase(
    grid: &mut GridAtmosphere,
    ctx: &mut PhaseContext<'_>,
    budget: &mut ProcessingBudget,
) -> PhaseResult {
    let resumed = grid.paused;
    let result = match grid.phase {
        ProcessingPhase::Revalidate => revalidate::run(grid, ctx, budget, resumed),
        ProcessingPhase::Equalize => equalize::run(grid, ctx, budget, resumed),
        ProcessingPhase::ExcitedGroups => groups::run(grid, ctx, budget, resumed),
        ProcessingPhase::Reactions => reactions::run(grid, ctx, budget, resumed),
        ProcessingPhase::Hotspots => hotspot::run(grid, ctx, budget, resumed),
        ProcessingPhase::Superconductivity => superconductivity::run(grid, ctx, budget, resumed),
        ProcessingPhase::HighPressureDelta => high_pressure::run(grid, ctx, budget, resumed),
        ProcessingPhase::AtmosDevices => devices::run(grid, ctx, budget, resumed),
    };
    if result == PhaseResult::Paused {
        debug!(
            "grid {:?} paused in {:?} with {} queued",
            grid.id,
            grid.phase,
            grid.current_run.len() + grid.current_run_groups.len()
        );
    }
    result
}

/// Complete the current phase: move to the next enabled one, or wrap to a
/// new cycle. Returns true when a cycle finished.
pub fn advance_phase(grid: &mut GridAtmosphere, config: &AtmosConfig) -> bool {
    grid.paused = false;
    match next_phase(grid.phase, config) {
        Some(next) => {
            grid.phase = next;
            false
        }
        None => {
            grid.phase = ProcessingPhase::Revalidate;
            grid.update_counter = grid.update_counter.wrapping_add(1);
            grid.last_cycle_stats = std::mem::take(&mut grid.stats);
            true
        }
    }
}

/// Replace the tile queue with `coords` unless resuming.
pub(crate) fn start_run(grid: &mut GridAtmosphere, resumed: bool, coords: impl IntoIterator<Item = TileCoord>) {
    if !resumed {
        grid.current_run = coords.into_iter().collect::<VecDeque<_>>();
    }
}

/// Pop tiles off the queue until it empties or the budget runs out.
pub(crate) fn drain_tiles(
    grid: &mut GridAtmosphere,
    budget: &mut ProcessingBudget,
    mut process: impl FnMut(&mut GridAtmosphere, TileCoord),
) -> PhaseResult {
    while let Some(coord) = grid.current_run.pop_front() {
        process(grid, coord);
        if budget.tick() && !grid.current_run.is_empty() {
            return PhaseResult::Paused;
        }
    }
    PhaseResult::Complete
}
