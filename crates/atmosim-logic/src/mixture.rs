//! Gas mixtures: moles per species at a temperature in a volume.
//!
//! A [`GasMixture`] is the leaf of the simulation. Tiles, pipes and tanks
//! each own one; nothing ever holds a mutable reference to another owner's
//! mixture, so splitting gas always produces a fresh copy.
//!
//! Pressure and heat capacity are derived on demand. Every transfer here
//! (merge, remove, share, temperature share) conserves total moles and
//! thermal energy except where an immutable mixture is involved: the space
//! sentinel absorbs whatever is pushed into it and gives nothing back.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::gas::{Gas, GAS_COUNT, SPECIFIC_HEATS};
use crate::reactions::{self, ReactionResult};
use crate::thresholds::GasThresholds;

/// Outcome of [`GasMixture::compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasCompareResult {
    /// Close enough that neither gas nor heat needs to move.
    NoExchange,
    /// Moles match but temperatures differ.
    TemperatureExchange,
    /// This species differs enough to move gas.
    MolesDiffer(Gas),
}

/// Moles per species, temperature in kelvin, volume in litres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasMixture {
    moles: [f32; GAS_COUNT],
    temperature: f32,
    volume: f32,
    immutable: bool,
    #[serde(skip)]
    moles_archived: [f32; GAS_COUNT],
    #[serde(skip)]
    temperature_archived: f32,
    #[serde(skip)]
    last_share: f32,
    #[serde(skip)]
    fire_amount: f32,
}

impl Default for GasMixture {
    fn default() -> Self {
        Self::new(CELL_VOLUME)
    }
}

/// Sum of moles × specific heat with no floor applied.
fn raw_heat_capacity(moles: &[f32; GAS_COUNT]) -> f32 {
    moles
        .iter()
        .zip(SPECIFIC_HEATS.iter())
        .map(|(m, c)| m * c)
        .sum()
}

impl GasMixture {
    /// An empty mixture at the cosmic background temperature.
    pub fn new(volume: f32) -> Self {
        Self::with_temperature(volume, TCMB)
    }

    /// An empty mixture at `temperature`.
    pub fn with_temperature(volume: f32, temperature: f32) -> Self {
        Self {
            moles: [0.0; GAS_COUNT],
            temperature: temperature.clamp(TCMB, TMAX),
            volume: volume.max(0.0),
            immutable: false,
            moles_archived: [0.0; GAS_COUNT],
            temperature_archived: temperature.clamp(TCMB, TMAX),
            last_share: 0.0,
            fire_amount: 0.0,
        }
    }

    /// The immutable vacuum sentinel. Volume 0, never depleted, never filled.
    pub fn space() -> Self {
        let mut mixture = Self::new(0.0);
        mixture.immutable = true;
        mixture
    }

    /// Breathable air (21% O₂, 79% N₂) at one atmosphere.
    pub fn standard_air(volume: f32, temperature: f32) -> Self {
        let mut mixture = Self::with_temperature(volume, temperature);
        let total = ONE_ATMOSPHERE * mixture.volume / (R * mixture.temperature);
        mixture.moles[Gas::Oxygen.index()] = total * OXYGEN_STANDARD;
        mixture.moles[Gas::Nitrogen.index()] = total * NITROGEN_STANDARD;
        mixture
    }

    /// Rebuild a mixture from persisted fields.
    pub fn from_parts(moles: [f32; GAS_COUNT], temperature: f32, volume: f32, immutable: bool) -> Self {
        let mut mixture = Self::with_temperature(volume, TCMB);
        mixture.moles = moles.map(|m| if m.is_finite() { m.max(0.0) } else { 0.0 });
        if temperature.is_finite() {
            mixture.temperature = temperature;
        }
        mixture.immutable = immutable;
        mixture
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn moles(&self, gas: Gas) -> f32 {
        self.moles[gas.index()]
    }

    /// All moles, indexed by [`Gas::index`].
    pub fn moles_array(&self) -> &[f32; GAS_COUNT] {
        &self.moles
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn temperature_archived(&self) -> f32 {
        self.temperature_archived
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Absolute moles moved by the last [`GasMixture::share`].
    pub fn last_share(&self) -> f32 {
        self.last_share
    }

    /// Fire produced by the last [`GasMixture::react`].
    pub fn fire_amount(&self) -> f32 {
        self.fire_amount
    }

    pub(crate) fn set_fire_amount(&mut self, amount: f32) {
        self.fire_amount = amount;
    }

    pub(crate) fn add_fire_amount(&mut self, amount: f32) {
        self.fire_amount += amount;
    }

    pub fn total_moles(&self) -> f32 {
        self.moles.iter().sum()
    }

    /// True when every species is under [`GAS_MIN_MOLES`].
    pub fn is_empty(&self) -> bool {
        self.moles.iter().all(|m| *m < GAS_MIN_MOLES)
    }

    /// Heat capacity in J/K. An empty immutable mixture reports
    /// [`SPACE_HEAT_CAPACITY`] so that vacuum cools what it touches.
    pub fn heat_capacity(&self) -> f32 {
        let raw = raw_heat_capacity(&self.moles);
        if self.immutable && raw < MINIMUM_HEAT_CAPACITY {
            return SPACE_HEAT_CAPACITY;
        }
        raw.max(MINIMUM_HEAT_CAPACITY)
    }

    pub fn heat_capacity_archived(&self) -> f32 {
        let raw = raw_heat_capacity(&self.moles_archived);
        if self.immutable && raw < MINIMUM_HEAT_CAPACITY {
            return SPACE_HEAT_CAPACITY;
        }
        raw.max(MINIMUM_HEAT_CAPACITY)
    }

    /// Temperature × heat capacity, in joules.
    pub fn thermal_energy(&self) -> f32 {
        self.temperature * raw_heat_capacity(&self.moles)
    }

    /// Pressure in kPa. Zero for a mixture without volume.
    pub fn pressure(&self) -> f32 {
        if self.volume <= 0.0 {
            return 0.0;
        }
        self.total_moles() * R * self.temperature / self.volume
    }

    // ── Mutators ────────────────────────────────────────────────────────

    pub fn mark_immutable(&mut self) {
        self.immutable = true;
    }

    pub fn set_volume(&mut self, volume: f32) {
        if self.immutable {
            return;
        }
        self.volume = volume.max(0.0);
    }

    pub fn set_temperature(&mut self, temperature: f32) {
        if self.immutable {
            return;
        }
        if !temperature.is_finite() {
            warn!("ignoring non-finite temperature {}", temperature);
            return;
        }
        self.temperature = temperature.clamp(TCMB, TMAX);
    }

    /// Set moles of one species. Negative amounts clamp to zero.
    pub fn set_moles(&mut self, gas: Gas, quantity: f32) {
        if self.immutable {
            return;
        }
        if !quantity.is_finite() {
            warn!("ignoring non-finite {} moles {}", gas.name(), quantity);
            return;
        }
        if quantity < 0.0 {
            warn!("clamping negative {} moles {} to zero", gas.name(), quantity);
        }
        self.moles[gas.index()] = quantity.max(0.0);
    }

    /// Add (or with a negative delta, remove) moles of one species.
    pub fn adjust_moles(&mut self, gas: Gas, delta: f32) {
        if self.immutable {
            return;
        }
        if !delta.is_finite() {
            warn!("ignoring non-finite {} mole delta {}", gas.name(), delta);
            return;
        }
        let slot = &mut self.moles[gas.index()];
        *slot = (*slot + delta).max(0.0);
    }

    /// Snapshot moles and temperature for this processing cycle.
    pub fn archive(&mut self) {
        self.moles_archived = self.moles;
        self.temperature_archived = self.temperature;
    }

    /// Copy moles and temperature (not volume) from another mixture.
    pub fn copy_from(&mut self, other: &GasMixture) {
        if self.immutable {
            return;
        }
        self.moles = other.moles;
        self.temperature = other.temperature;
    }

    pub fn multiply(&mut self, factor: f32) {
        if self.immutable || !factor.is_finite() {
            return;
        }
        let factor = factor.max(0.0);
        for m in self.moles.iter_mut() {
            *m *= factor;
        }
    }

    pub fn clear(&mut self) {
        if self.immutable {
            return;
        }
        self.moles = [0.0; GAS_COUNT];
    }

    /// Combine `giver` into this mixture. The result temperature is the
    /// heat-capacity weighted mean, so energy is conserved.
    pub fn merge(&mut self, giver: &GasMixture) {
        if self.immutable {
            return;
        }
        let giver_heat_capacity = raw_heat_capacity(&giver.moles);
        let self_heat_capacity = raw_heat_capacity(&self.moles);
        let combined = giver_heat_capacity + self_heat_capacity;
        if combined > MINIMUM_HEAT_CAPACITY {
            self.temperature = ((giver.temperature * giver_heat_capacity
                + self.temperature * self_heat_capacity)
                / combined)
                .clamp(TCMB, TMAX);
        }
        for (m, g) in self.moles.iter_mut().zip(giver.moles.iter()) {
            *m += g;
        }
    }

    /// Split off `amount` moles, keeping species ratios and temperature.
    pub fn remove(&mut self, amount: f32) -> GasMixture {
        let total = self.total_moles();
        if total <= 0.0 || !amount.is_finite() {
            return self.remove_ratio(0.0);
        }
        self.remove_ratio(amount / total)
    }

    /// Split off `ratio` of every species. The ratio clamps to `[0, 1]`;
    /// removing everything leaves exactly zero behind.
    pub fn remove_ratio(&mut self, ratio: f32) -> GasMixture {
        let mut removed = GasMixture::with_temperature(self.volume, self.temperature);
        if !(ratio > 0.0) {
            return removed;
        }
        let ratio = ratio.min(1.0);
        for (source, taken) in self.moles.iter_mut().zip(removed.moles.iter_mut()) {
            let amount = if ratio >= 1.0 { *source } else { *source * ratio };
            *taken = amount;
            if !self.immutable {
                let left = *source - amount;
                *source = if left < GAS_MIN_MOLES { 0.0 } else { left };
            }
        }
        removed
    }

    /// Can this mixture exchange with `sample`? Looks for the first
    /// species whose delta is both absolutely and relatively significant,
    /// then for a significant temperature difference.
    pub fn compare(&self, sample: &GasMixture, thresholds: &GasThresholds) -> GasCompareResult {
        let mut moles = 0.0;
        for gas in Gas::ALL {
            let gas_moles = self.moles[gas.index()];
            let delta = (gas_moles - sample.moles[gas.index()]).abs();
            if delta > thresholds.minimum_moles_delta_to_move
                && delta > gas_moles * thresholds.minimum_air_ratio_to_move
            {
                return GasCompareResult::MolesDiffer(gas);
            }
            moles += gas_moles;
        }

        if moles > thresholds.minimum_moles_delta_to_move {
            let temperature_delta = (self.temperature - sample.temperature).abs();
            if temperature_delta > thresholds.minimum_temperature_delta_to_suspend {
                return GasCompareResult::TemperatureExchange;
            }
        }

        GasCompareResult::NoExchange
    }

    /// Move `(self - sharer) / (adjacent_tiles + 1)` of every species
    /// toward the emptier side, carrying its heat along.
    ///
    /// Returns the pressure difference (kPa, self minus sharer) that drove
    /// the transfer, or zero when too little moved to matter.
    pub fn share(&mut self, sharer: &mut GasMixture, adjacent_tiles: usize, thresholds: &GasThresholds) -> f32 {
        let divisor = (adjacent_tiles.max(1) + 1) as f32;
        let self_temperature = self.temperature;
        let sharer_temperature = sharer.temperature;
        let old_self_moles = self.total_moles();
        let old_sharer_moles = sharer.total_moles();
        let old_heat_capacity = raw_heat_capacity(&self.moles);
        let old_sharer_heat_capacity = raw_heat_capacity(&sharer.moles);

        let mut heat_capacity_to_sharer = 0.0;
        let mut heat_capacity_to_self = 0.0;
        let mut abs_moved_moles = 0.0;

        for gas in Gas::ALL {
            let i = gas.index();
            let delta = (self.moles[i] - sharer.moles[i]) / divisor;
            if delta.abs() < GAS_MIN_MOLES {
                continue;
            }
            let heat = delta * gas.specific_heat();
            if delta > 0.0 {
                heat_capacity_to_sharer += heat;
            } else {
                heat_capacity_to_self -= heat;
            }
            if !self.immutable {
                self.moles[i] = (self.moles[i] - delta).max(0.0);
            }
            if !sharer.immutable {
                sharer.moles[i] = (sharer.moles[i] + delta).max(0.0);
            }
            abs_moved_moles += delta.abs();
        }

        self.last_share = abs_moved_moles;

        let new_heat_capacity = old_heat_capacity - heat_capacity_to_sharer + heat_capacity_to_self;
        let new_sharer_heat_capacity =
            old_sharer_heat_capacity + heat_capacity_to_sharer - heat_capacity_to_self;

        if abs_moved_moles > 0.0 {
            let self_energy = old_heat_capacity * self_temperature
                - heat_capacity_to_sharer * self_temperature
                + heat_capacity_to_self * sharer_temperature;
            let sharer_energy = old_sharer_heat_capacity * sharer_temperature
                - heat_capacity_to_self * sharer_temperature
                + heat_capacity_to_sharer * self_temperature;
            if !self.immutable && new_heat_capacity > MINIMUM_HEAT_CAPACITY {
                self.set_temperature(self_energy / new_heat_capacity);
            }
            if !sharer.immutable && new_sharer_heat_capacity > MINIMUM_HEAT_CAPACITY {
                sharer.set_temperature(sharer_energy / new_sharer_heat_capacity);
            }
        }

        // Plain conduction only when the sharer's mass barely changed.
        let temperature_delta = self_temperature - sharer_temperature;
        if temperature_delta.abs() > thresholds.minimum_temperature_delta_to_consider {
            let mostly_still = sharer.immutable
                || (old_sharer_heat_capacity > MINIMUM_HEAT_CAPACITY
                    && (new_sharer_heat_capacity / old_sharer_heat_capacity - 1.0).abs() < 0.1);
            if mostly_still {
                self.temperature_share(sharer, thresholds.open_heat_transfer_coefficient);
            }
        }

        if temperature_delta.abs() > thresholds.minimum_temperature_to_move
            || abs_moved_moles > thresholds.minimum_moles_delta_to_move
        {
            if self.volume <= 0.0 {
                return 0.0;
            }
            return (self_temperature * old_self_moles - sharer_temperature * old_sharer_moles) * R
                / self.volume;
        }

        0.0
    }

    /// Conduct heat between two bodies of gas. Returns the sharer's new
    /// temperature.
    pub fn temperature_share(&mut self, sharer: &mut GasMixture, conduction_coefficient: f32) -> f32 {
        let temperature_delta = self.temperature - sharer.temperature;
        if temperature_delta.abs() > MINIMUM_TEMPERATURE_DELTA_TO_CONSIDER {
            let self_heat_capacity = self.heat_capacity();
            let sharer_heat_capacity = sharer.heat_capacity();
            let heat = conduction_coefficient
                * temperature_delta
                * (self_heat_capacity * sharer_heat_capacity
                    / (self_heat_capacity + sharer_heat_capacity));
            if !self.immutable {
                self.set_temperature(self.temperature - heat / self_heat_capacity);
            }
            if !sharer.immutable {
                sharer.set_temperature(sharer.temperature + heat / sharer_heat_capacity);
            }
        }
        sharer.temperature
    }

    /// Conduct heat between this gas and a solid body (a wall, a floor).
    /// Returns the solid's new temperature.
    pub fn temperature_share_with_solid(
        &mut self,
        conduction_coefficient: f32,
        solid_temperature: f32,
        solid_heat_capacity: f32,
    ) -> f32 {
        let temperature_delta = self.temperature - solid_temperature;
        if temperature_delta.abs() <= MINIMUM_TEMPERATURE_DELTA_TO_CONSIDER || solid_heat_capacity <= 0.0 {
            return solid_temperature;
        }
        let self_heat_capacity = self.heat_capacity();
        let heat = conduction_coefficient
            * temperature_delta
            * (self_heat_capacity * solid_heat_capacity / (self_heat_capacity + solid_heat_capacity));
        if !self.immutable {
            self.set_temperature(self.temperature - heat / self_heat_capacity);
        }
        (solid_temperature + heat / solid_heat_capacity).clamp(TCMB, TMAX)
    }

    /// Run every reaction whose requirements hold.
    pub fn react(&mut self) -> ReactionResult {
        reactions::react(self)
    }

    // ── Device helpers ──────────────────────────────────────────────────

    /// Pump gas into `output` until it reaches `target_pressure`.
    /// Returns false when nothing needed to move.
    pub fn pump_gas_to(&mut self, output: &mut GasMixture, target_pressure: f32) -> bool {
        let output_starting_pressure = output.pressure();
        if output_starting_pressure >= target_pressure {
            return false;
        }
        if self.total_moles() <= 0.0 || self.temperature <= 0.0 {
            return false;
        }
        let pressure_delta = target_pressure - output_starting_pressure;
        let transfer_moles = pressure_delta * output.volume / (self.temperature * R);
        let removed = self.remove(transfer_moles);
        output.merge(&removed);
        true
    }

    /// Passively release gas toward `target_pressure`, never pushing the
    /// output above half the pressure difference. `None` vents the gas.
    pub fn release_gas_to(&mut self, output: Option<&mut GasMixture>, target_pressure: f32) -> bool {
        let input_starting_pressure = self.pressure();
        let output_starting_pressure = output.as_ref().map(|o| o.pressure()).unwrap_or(0.0);
        if output_starting_pressure >= target_pressure.min(input_starting_pressure - 10.0) {
            return false;
        }
        if self.total_moles() <= 0.0 || self.temperature <= 0.0 {
            return false;
        }
        let pressure_delta = (target_pressure - output_starting_pressure)
            .min((input_starting_pressure - output_starting_pressure) / 2.0);
        let volume = output.as_ref().map(|o| o.volume).unwrap_or(self.volume);
        let transfer_moles = pressure_delta * volume / (self.temperature * R);
        let removed = self.remove(transfer_moles);
        if let Some(output) = output {
            output.merge(&removed);
        }
        true
    }

    /// Move every mole of `gases` into `destination`.
    pub fn scrub_into(&mut self, destination: &mut GasMixture, gases: &[Gas]) {
        let mut buffer = GasMixture::with_temperature(self.volume, self.temperature);
        for gas in gases {
            buffer.moles[gas.index()] = self.moles[gas.index()];
            if !self.immutable {
                self.moles[gas.index()] = 0.0;
            }
        }
        destination.merge(&buffer);
    }
}

/// Merge `given` into `target`. The one pipe-network contract: anything
/// that moves gas between owners goes through here.
pub fn merge(target: &mut GasMixture, given: &GasMixture) {
    target.merge(given);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn air() -> GasMixture {
        GasMixture::standard_air(CELL_VOLUME, T20C)
    }

    #[test]
    fn test_standard_air_is_one_atmosphere() {
        let mixture = air();
        assert!((mixture.pressure() - ONE_ATMOSPHERE).abs() < 0.01);
        assert!((mixture.total_moles() - MOLES_CELL_STANDARD).abs() < 0.01);
    }

    #[test]
    fn test_space_has_no_pressure() {
        let space = GasMixture::space();
        assert_eq!(space.pressure(), 0.0);
        assert_eq!(space.heat_capacity(), SPACE_HEAT_CAPACITY);
        assert!(space.is_immutable());
    }

    #[test]
    fn test_merge_blends_temperature() {
        let mut cold = GasMixture::with_temperature(CELL_VOLUME, 200.0);
        cold.set_moles(Gas::Nitrogen, 10.0);
        let mut hot = GasMixture::with_temperature(CELL_VOLUME, 400.0);
        hot.set_moles(Gas::Nitrogen, 10.0);
        cold.merge(&hot);
        assert_eq!(cold.moles(Gas::Nitrogen), 20.0);
        assert!((cold.temperature() - 300.0).abs() < 0.001);
    }

    #[test]
    fn test_merge_into_space_is_noop() {
        let mut space = GasMixture::space();
        space.merge(&air());
        assert_eq!(space.total_moles(), 0.0);
    }

    #[test]
    fn test_remove_ratio_clamps_to_everything() {
        let mut mixture = air();
        let total = mixture.total_moles();
        let removed = mixture.remove_ratio(3.0);
        assert_eq!(mixture.total_moles(), 0.0);
        assert!((removed.total_moles() - total).abs() < 0.001);
    }

    #[test]
    fn test_remove_more_than_present_leaves_zero() {
        let mut mixture = air();
        let removed = mixture.remove(10_000.0);
        for gas in Gas::ALL {
            assert_eq!(mixture.moles(gas), 0.0);
        }
        assert!(removed.total_moles() > 100.0);
    }

    #[test]
    fn test_remove_from_space_returns_nothing() {
        let mut space = GasMixture::space();
        let removed = space.remove(50.0);
        assert_eq!(removed.total_moles(), 0.0);
        assert_eq!(removed.pressure(), 0.0);
    }

    #[test]
    fn test_set_moles_rejects_garbage() {
        let mut mixture = air();
        let before = mixture.moles(Gas::Oxygen);
        mixture.set_moles(Gas::Oxygen, f32::NAN);
        assert_eq!(mixture.moles(Gas::Oxygen), before);
        mixture.set_moles(Gas::Oxygen, -5.0);
        assert_eq!(mixture.moles(Gas::Oxygen), 0.0);
        mixture.adjust_moles(Gas::Nitrogen, -1_000_000.0);
        assert_eq!(mixture.moles(Gas::Nitrogen), 0.0);
    }

    #[test]
    fn test_share_conserves_moles_and_energy() {
        let thresholds = GasThresholds::default();
        let mut a = GasMixture::with_temperature(CELL_VOLUME, 350.0);
        a.set_moles(Gas::Oxygen, 60.0);
        a.set_moles(Gas::Plasma, 5.0);
        let mut b = GasMixture::with_temperature(CELL_VOLUME, 250.0);
        b.set_moles(Gas::Nitrogen, 30.0);

        let moles_before = a.total_moles() + b.total_moles();
        let energy_before = a.thermal_energy() + b.thermal_energy();
        a.share(&mut b, 1, &thresholds);
        let moles_after = a.total_moles() + b.total_moles();
        let energy_after = a.thermal_energy() + b.thermal_energy();

        assert!((moles_before - moles_after).abs() < 1e-3);
        assert!((energy_before - energy_after).abs() / energy_before < 1e-4);
    }

    #[test]
    fn test_share_with_single_neighbour_equalizes() {
        let thresholds = GasThresholds::default();
        let mut full = air();
        let mut empty = GasMixture::with_temperature(CELL_VOLUME, T20C);
        let difference = full.share(&mut empty, 1, &thresholds);
        assert!(difference > 90.0);
        assert!((full.pressure() - empty.pressure()).abs() < 0.01);
    }

    #[test]
    fn test_share_into_space_vents() {
        let thresholds = GasThresholds::default();
        let mut tile = air();
        let mut space = GasMixture::space();
        tile.share(&mut space, 1, &thresholds);
        assert!(tile.total_moles() < MOLES_CELL_STANDARD * 0.6);
        assert_eq!(space.total_moles(), 0.0);
    }

    #[test]
    fn test_compare_detects_differences() {
        let thresholds = GasThresholds::default();
        let a = air();
        let b = air();
        assert_eq!(a.compare(&b, &thresholds), GasCompareResult::NoExchange);

        let mut hot = air();
        hot.set_temperature(T20C + 50.0);
        assert_eq!(a.compare(&hot, &thresholds), GasCompareResult::TemperatureExchange);

        let empty = GasMixture::new(CELL_VOLUME);
        assert_eq!(
            a.compare(&empty, &thresholds),
            GasCompareResult::MolesDiffer(Gas::Oxygen)
        );
    }

    #[test]
    fn test_temperature_share_conserves_energy() {
        let mut a = air();
        a.set_temperature(500.0);
        let mut b = air();
        let before = a.thermal_energy() + b.thermal_energy();
        a.temperature_share(&mut b, 0.4);
        let after = a.thermal_energy() + b.thermal_energy();
        assert!(a.temperature() < 500.0);
        assert!(b.temperature() > T20C);
        assert!((before - after).abs() / before < 1e-5);
    }

    #[test]
    fn test_temperature_share_with_solid() {
        let mut gas = air();
        gas.set_temperature(600.0);
        let solid = gas.temperature_share_with_solid(0.05, T20C, DEFAULT_TILE_HEAT_CAPACITY);
        assert!(solid > T20C);
        assert!(gas.temperature() < 600.0);
    }

    #[test]
    fn test_pump_reaches_target() {
        let mut tank = GasMixture::standard_air(CELL_VOLUME, T20C);
        tank.multiply(10.0);
        let mut room = GasMixture::with_temperature(CELL_VOLUME, T20C);
        assert!(tank.pump_gas_to(&mut room, ONE_ATMOSPHERE));
        assert!((room.pressure() - ONE_ATMOSPHERE).abs() < 0.5);
        assert!(!tank.pump_gas_to(&mut room, ONE_ATMOSPHERE - 1.0));
    }

    #[test]
    fn test_release_to_nothing_vents() {
        let mut tank = air();
        let before = tank.total_moles();
        assert!(tank.release_gas_to(None, ONE_ATMOSPHERE));
        assert!(tank.total_moles() < before);
    }

    #[test]
    fn test_scrub_moves_only_selected_gas() {
        let mut room = air();
        room.set_moles(Gas::CarbonDioxide, 4.0);
        let mut buffer = GasMixture::new(200.0);
        room.scrub_into(&mut buffer, &[Gas::CarbonDioxide]);
        assert_eq!(room.moles(Gas::CarbonDioxide), 0.0);
        assert_eq!(buffer.moles(Gas::CarbonDioxide), 4.0);
        assert_eq!(buffer.moles(Gas::Oxygen), 0.0);
    }
}
