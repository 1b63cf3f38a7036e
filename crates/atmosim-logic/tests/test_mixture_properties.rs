//! Integration tests for mixture-level conservation and guards.
//!
//! Exercises: merge → remove → share → react chains the way tiles and
//! pipe networks use them. All tests are pure logic, no grid.

use atmosim_logic::constants::{CELL_VOLUME, GAS_MIN_MOLES, T20C};
use atmosim_logic::{merge, Gas, GasMixture, GasThresholds};

// ── Helpers ────────────────────────────────────────────────────────────

fn mixed(temperature: f32) -> GasMixture {
    let mut mixture = GasMixture::with_temperature(CELL_VOLUME, temperature);
    mixture.set_moles(Gas::Oxygen, 30.0);
    mixture.set_moles(Gas::Nitrogen, 70.0);
    mixture.set_moles(Gas::CarbonDioxide, 3.5);
    mixture
}

fn totals(mixtures: &[&GasMixture]) -> (f32, f32) {
    let moles = mixtures.iter().map(|m| m.total_moles()).sum();
    let energy = mixtures.iter().map(|m| m.thermal_energy()).sum();
    (moles, energy)
}

// ── Conservation ───────────────────────────────────────────────────────

#[test]
fn merge_then_remove_conserves_moles_and_energy() {
    let mut a = mixed(T20C);
    let b = mixed(450.0);
    let (moles_before, energy_before) = totals(&[&a, &b]);

    merge(&mut a, &b);
    let (moles_merged, energy_merged) = totals(&[&a]);
    assert!((moles_before - moles_merged).abs() < 1e-3);
    assert!((energy_before - energy_merged).abs() / energy_before < 1e-5);

    let taken = a.remove(57.0);
    let (moles_split, energy_split) = totals(&[&a, &taken]);
    assert!((moles_before - moles_split).abs() < 1e-3);
    assert!((energy_before - energy_split).abs() / energy_before < 1e-5);
    assert_eq!(taken.temperature(), a.temperature());
}

#[test]
fn repeated_sharing_across_a_row_conserves_totals() {
    let thresholds = GasThresholds::default();
    let mut row: Vec<GasMixture> = (0..5).map(|_| GasMixture::with_temperature(CELL_VOLUME, T20C)).collect();
    row[0] = mixed(500.0);
    let before = {
        let refs: Vec<&GasMixture> = row.iter().collect();
        totals(&refs)
    };

    for _ in 0..200 {
        for i in 0..row.len() - 1 {
            let (left, right) = row.split_at_mut(i + 1);
            let adjacent = if i == 0 { 1 } else { 2 };
            left[i].share(&mut right[0], adjacent, &thresholds);
        }
    }

    let refs: Vec<&GasMixture> = row.iter().collect();
    let after = totals(&refs);
    assert!((before.0 - after.0).abs() / before.0 < 1e-4);
    assert!((before.1 - after.1).abs() / before.1 < 1e-3);
    let spread = row[0].pressure() - row[4].pressure();
    assert!(spread.abs() < 1.0, "row should flatten, spread {}", spread);
}

// ── Guards ─────────────────────────────────────────────────────────────

#[test]
fn over_removal_leaves_exact_zero_for_every_species() {
    let mut mixture = mixed(T20C);
    let _ = mixture.remove_ratio(1.0);
    for gas in Gas::ALL {
        assert_eq!(mixture.moles(gas), 0.0, "{} left behind", gas.name());
    }
    let again = mixture.remove(5.0);
    assert_eq!(again.total_moles(), 0.0);
}

#[test]
fn dust_is_snapped_to_zero_on_removal() {
    let mut mixture = GasMixture::with_temperature(CELL_VOLUME, T20C);
    mixture.set_moles(Gas::Oxygen, GAS_MIN_MOLES * 1.5);
    let _ = mixture.remove_ratio(0.5);
    assert_eq!(mixture.moles(Gas::Oxygen), 0.0);
}

#[test]
fn space_stays_empty_and_cold_through_everything() {
    let thresholds = GasThresholds::default();
    let mut space = GasMixture::space();
    let mut room = mixed(T20C);
    merge(&mut space, &room);
    room.share(&mut space, 1, &thresholds);
    space.set_temperature(5000.0);
    space.react();
    assert_eq!(space.total_moles(), 0.0);
    assert_eq!(space.pressure(), 0.0);
    assert_eq!(space.temperature(), GasMixture::space().temperature());
}
