//! Excited groups phase: age every group, average the ones that have
//! stalled, dissolve the ones that have gone quiet.

use super::{PhaseContext, PhaseResult};
use crate::budget::ProcessingBudget;
use crate::config::ExcitedGroupSettings;
use crate::grid::{ExcitedGroupId, GridAtmosphere};

pub fn run(
    grid: &mut GridAtmosphere,
    ctx: &mut PhaseContext<'_>,
    budget: &mut ProcessingBudget,
    resumed: bool,
) -> PhaseResult {
    if !resumed {
        grid.current_run_groups = grid.excited_groups.ids().collect();
    }
    let settings = ctx.config.excited_groups;
    while let Some(id) = grid.current_run_groups.pop_front() {
        process_group(grid, id, &settings);
        grid.stats.groups_processed += 1;
        if budget.tick() && !grid.current_run_groups.is_empty() {
            return PhaseResult::Paused;
        }
    }
    PhaseResult::Complete
}

pub fn process_group(grid: &mut GridAtmosphere, id: ExcitedGroupId, settings: &ExcitedGroupSettings) {
    let Some(group) = grid.excited_groups.get_mut(id) else {
        return;
    };
    group.breakdown_cooldown += 1;
    group.dismantle_cooldown += 1;

    if group.breakdown_cooldown > settings.breakdown_cycles {
        grid.excited_group_self_breakdown(id);
    } else if group.dismantle_cooldown > settings.dismantle_cycles {
        grid.excited_group_dismantle(id, true);
    }
}
