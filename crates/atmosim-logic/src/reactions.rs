//! Gas reactions: plasma and tritium combustion.
//!
//! Reactions run in priority order against a single mixture. Each one
//! checks its own requirements (temperature, reactant moles), mutates the
//! mixture, and adds to the mixture's fire amount. Whoever owns the
//! mixture decides what a fire means; a tile ignites a hotspot.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::gas::Gas;
use crate::mixture::GasMixture;

/// What a reaction pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionResult {
    NoReaction,
    Reacting,
    /// Halt further reactions this pass.
    StopReactions,
}

/// A known reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GasReaction {
    PlasmaFire,
    TritiumFire,
}

impl GasReaction {
    /// Reactions in the order they run.
    pub const ALL: [GasReaction; 2] = [GasReaction::PlasmaFire, GasReaction::TritiumFire];

    pub fn minimum_temperature(self) -> f32 {
        match self {
            GasReaction::PlasmaFire => PLASMA_MINIMUM_BURN_TEMPERATURE,
            GasReaction::TritiumFire => FIRE_MINIMUM_TEMPERATURE_TO_EXIST,
        }
    }

    /// Reactants and the minimum moles of each.
    pub fn requirements(self) -> [(Gas, f32); 2] {
        match self {
            GasReaction::PlasmaFire => [
                (Gas::Oxygen, MINIMUM_REACTANT_MOLES),
                (Gas::Plasma, MINIMUM_REACTANT_MOLES),
            ],
            GasReaction::TritiumFire => [
                (Gas::Oxygen, MINIMUM_REACTANT_MOLES),
                (Gas::Tritium, MINIMUM_REACTANT_MOLES),
            ],
        }
    }

    pub fn can_react(self, mixture: &GasMixture) -> bool {
        !mixture.is_immutable()
            && mixture.temperature() >= self.minimum_temperature()
            && self
                .requirements()
                .iter()
                .all(|(gas, minimum)| mixture.moles(*gas) >= *minimum)
    }

    pub fn react(self, mixture: &mut GasMixture) -> ReactionResult {
        match self {
            GasReaction::PlasmaFire => plasma_fire(mixture),
            GasReaction::TritiumFire => tritium_fire(mixture),
        }
    }
}

/// Whether any reaction could run on this mixture right now.
pub fn can_react(mixture: &GasMixture) -> bool {
    GasReaction::ALL.iter().any(|r| r.can_react(mixture))
}

/// Run all eligible reactions. Resets the mixture's fire amount first.
pub fn react(mixture: &mut GasMixture) -> ReactionResult {
    mixture.set_fire_amount(0.0);
    if mixture.is_immutable() {
        return ReactionResult::NoReaction;
    }

    let mut result = ReactionResult::NoReaction;
    for reaction in GasReaction::ALL {
        if !reaction.can_react(mixture) {
            continue;
        }
        match reaction.react(mixture) {
            ReactionResult::StopReactions => return ReactionResult::StopReactions,
            ReactionResult::Reacting => result = ReactionResult::Reacting,
            ReactionResult::NoReaction => {}
        }
    }
    result
}

/// Release `energy` joules into a mixture whose heat capacity was
/// `old_heat_capacity` at `temperature` before the burn.
fn release_energy(mixture: &mut GasMixture, temperature: f32, old_heat_capacity: f32, energy: f32) {
    if energy <= 0.0 {
        return;
    }
    let new_heat_capacity = mixture.heat_capacity();
    if new_heat_capacity > MINIMUM_HEAT_CAPACITY {
        mixture.set_temperature((temperature * old_heat_capacity + energy) / new_heat_capacity);
    }
}

fn plasma_fire(mixture: &mut GasMixture) -> ReactionResult {
    let old_heat_capacity = mixture.heat_capacity();
    let temperature = mixture.temperature();
    let mut energy_released = 0.0;

    let temperature_scale = if temperature > PLASMA_UPPER_TEMPERATURE {
        1.0
    } else {
        (temperature - PLASMA_MINIMUM_BURN_TEMPERATURE)
            / (PLASMA_UPPER_TEMPERATURE - PLASMA_MINIMUM_BURN_TEMPERATURE)
    };

    if temperature_scale > 0.0 {
        let oxygen_burn_rate = OXYGEN_BURN_RATE_BASE - temperature_scale;
        let initial_oxygen = mixture.moles(Gas::Oxygen);
        let initial_plasma = mixture.moles(Gas::Plasma);

        // Oxygen-rich fires produce tritium instead of carbon dioxide.
        let supersaturation = ((initial_oxygen / initial_plasma - SUPER_SATURATION_ENDS)
            / (SUPER_SATURATION_THRESHOLD - SUPER_SATURATION_ENDS))
            .clamp(0.0, 1.0);

        let mut plasma_burn_rate = if initial_oxygen > initial_plasma * PLASMA_OXYGEN_FULLBURN {
            initial_plasma * temperature_scale / PLASMA_BURN_RATE_DELTA
        } else {
            temperature_scale * (initial_oxygen / PLASMA_OXYGEN_FULLBURN) / PLASMA_BURN_RATE_DELTA
        };

        if plasma_burn_rate > MINIMUM_HEAT_CAPACITY {
            plasma_burn_rate = plasma_burn_rate.min(initial_plasma.min(initial_oxygen / oxygen_burn_rate));
            mixture.set_moles(Gas::Plasma, initial_plasma - plasma_burn_rate);
            mixture.set_moles(Gas::Oxygen, initial_oxygen - plasma_burn_rate * oxygen_burn_rate);
            mixture.adjust_moles(Gas::Tritium, plasma_burn_rate * supersaturation);
            mixture.adjust_moles(Gas::CarbonDioxide, plasma_burn_rate * (1.0 - supersaturation));

            energy_released += FIRE_PLASMA_ENERGY_RELEASED * plasma_burn_rate;
            mixture.add_fire_amount(plasma_burn_rate * (1.0 + oxygen_burn_rate));
        }
    }

    release_energy(mixture, temperature, old_heat_capacity, energy_released);

    if mixture.fire_amount() > 0.0 {
        ReactionResult::Reacting
    } else {
        ReactionResult::NoReaction
    }
}

fn tritium_fire(mixture: &mut GasMixture) -> ReactionResult {
    let old_heat_capacity = mixture.heat_capacity();
    let temperature = mixture.temperature();
    let initial_tritium = mixture.moles(Gas::Tritium);
    let initial_oxygen = mixture.moles(Gas::Oxygen);
    let mut energy_released = 0.0;
    let burned_fuel;

    if initial_oxygen < initial_tritium
        || MINIMUM_TRITIUM_OXYBURN_ENERGY > temperature * old_heat_capacity
    {
        burned_fuel = (initial_oxygen / TRITIUM_BURN_OXY_FACTOR).min(initial_tritium);
        mixture.adjust_moles(Gas::Tritium, -burned_fuel);
    } else {
        burned_fuel = initial_tritium;
        let remaining = initial_tritium * (1.0 - 1.0 / TRITIUM_BURN_TRIT_FACTOR);
        mixture.set_moles(Gas::Tritium, remaining);
        mixture.adjust_moles(Gas::Oxygen, -remaining);
        energy_released += FIRE_HYDROGEN_ENERGY_RELEASED * burned_fuel * (TRITIUM_BURN_TRIT_FACTOR - 1.0);
    }

    if burned_fuel > 0.0 {
        energy_released += FIRE_HYDROGEN_ENERGY_RELEASED * burned_fuel;
        mixture.adjust_moles(Gas::WaterVapor, burned_fuel);
        mixture.add_fire_amount(burned_fuel);
    }

    release_energy(mixture, temperature, old_heat_capacity, energy_released);

    if mixture.fire_amount() > 0.0 {
        ReactionResult::Reacting
    } else {
        ReactionResult::NoReaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fuel_mix(temperature: f32) -> GasMixture {
        let mut mixture = GasMixture::with_temperature(CELL_VOLUME, temperature);
        mixture.set_moles(Gas::Oxygen, 40.0);
        mixture.set_moles(Gas::Plasma, 10.0);
        mixture
    }

    #[test]
    fn test_cold_plasma_does_not_burn() {
        let mut mixture = fuel_mix(T20C);
        assert!(!can_react(&mixture));
        assert_eq!(react(&mut mixture), ReactionResult::NoReaction);
        assert_eq!(mixture.moles(Gas::Plasma), 10.0);
    }

    #[test]
    fn test_hot_plasma_burns_and_heats() {
        let mut mixture = fuel_mix(800.0);
        assert_eq!(react(&mut mixture), ReactionResult::Reacting);
        assert!(mixture.moles(Gas::Plasma) < 10.0);
        assert!(mixture.moles(Gas::Oxygen) < 40.0);
        assert!(mixture.moles(Gas::CarbonDioxide) > 0.0);
        assert!(mixture.temperature() > 800.0);
        assert!(mixture.fire_amount() > 0.0);
    }

    #[test]
    fn test_oxygen_rich_plasma_fire_makes_tritium() {
        let mut mixture = GasMixture::with_temperature(CELL_VOLUME, 1000.0);
        mixture.set_moles(Gas::Oxygen, 100.0);
        mixture.set_moles(Gas::Plasma, 1.0);
        react(&mut mixture);
        assert!(mixture.moles(Gas::Tritium) > 0.0);
    }

    #[test]
    fn test_tritium_burns_to_water() {
        let mut mixture = GasMixture::with_temperature(CELL_VOLUME, 500.0);
        mixture.set_moles(Gas::Oxygen, 20.0);
        mixture.set_moles(Gas::Tritium, 5.0);
        assert_eq!(react(&mut mixture), ReactionResult::Reacting);
        assert!(mixture.moles(Gas::WaterVapor) > 0.0);
        assert!(mixture.moles(Gas::Tritium) < 5.0);
    }

    #[test]
    fn test_space_never_reacts() {
        let mut space = GasMixture::space();
        assert_eq!(react(&mut space), ReactionResult::NoReaction);
    }
}
