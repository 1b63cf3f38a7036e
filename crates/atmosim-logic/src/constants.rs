//! Physical constants and default tunables for atmospherics.
//!
//! Values that a host may want to tweak at runtime are mirrored in
//! [`crate::thresholds::GasThresholds`] and the core crate's config; the
//! constants here are their defaults.

/// Ideal gas constant, J/(mol·K).
pub const R: f32 = 8.314_462_6;

/// One atmosphere in kPa.
pub const ONE_ATMOSPHERE: f32 = 101.325;

/// Cosmic microwave background temperature; the coldest anything gets.
pub const TCMB: f32 = 2.7;

/// 0 °C in kelvin.
pub const T0C: f32 = 273.15;

/// 20 °C in kelvin.
pub const T20C: f32 = 293.15;

/// Upper bound on any mixture temperature.
pub const TMAX: f32 = 200_000.0;

/// Volume of a single tile, in litres.
pub const CELL_VOLUME: f32 = 2500.0;

/// Moles in a standard tile at one atmosphere and 20 °C.
pub const MOLES_CELL_STANDARD: f32 = ONE_ATMOSPHERE * CELL_VOLUME / (T20C * R);

/// Fraction of standard air that is oxygen.
pub const OXYGEN_STANDARD: f32 = 0.21;

/// Fraction of standard air that is nitrogen.
pub const NITROGEN_STANDARD: f32 = 0.79;

/// Moles under this are treated as zero.
pub const GAS_MIN_MOLES: f32 = 0.000_000_05;

/// Heat capacity floor so temperatures stay finite in near-empty mixtures.
pub const MINIMUM_HEAT_CAPACITY: f32 = 0.0003;

/// Heat capacity reported by an empty immutable (space) mixture.
pub const SPACE_HEAT_CAPACITY: f32 = 7000.0;

/// Heat capacity of vacuum for solid radiation to space.
pub const HEAT_CAPACITY_VACUUM: f32 = 7000.0;

// ── Equalization defaults ───────────────────────────────────────────────

/// Smallest per-species delta worth moving between tiles.
pub const MINIMUM_MOLES_DELTA_TO_MOVE: f32 = MOLES_CELL_STANDARD * 0.001;

/// Relative delta (of the source's moles) required before gas moves.
pub const MINIMUM_AIR_RATIO_TO_MOVE: f32 = 0.001;

/// A share larger than this keeps an excited group fully awake.
pub const MINIMUM_AIR_TO_SUSPEND: f32 = MOLES_CELL_STANDARD * 0.1;

/// Temperature delta required to keep tiles exchanging heat.
pub const MINIMUM_TEMPERATURE_DELTA_TO_SUSPEND: f32 = 4.0;

/// Temperature delta under which heat is not blended.
pub const MINIMUM_TEMPERATURE_DELTA_TO_CONSIDER: f32 = 0.5;

/// Temperature delta that counts as movement for pressure reporting.
pub const MINIMUM_TEMPERATURE_TO_MOVE: f32 = T20C + 100.0;

/// Heat transfer coefficient between open tiles.
pub const OPEN_HEAT_TRANSFER_COEFFICIENT: f32 = 0.4;

/// Heat transfer coefficient between gas on either side of a window.
pub const WINDOW_HEAT_TRANSFER_COEFFICIENT: f32 = 0.1;

// ── Excited groups ──────────────────────────────────────────────────────

/// Cycles before an excited group averages its tiles.
pub const EXCITED_GROUP_BREAKDOWN_CYCLES: u32 = 4;

/// Cycles of stability before an excited group dissolves and sleeps.
pub const EXCITED_GROUP_DISMANTLE_CYCLES: u32 = 16;

// ── Superconduction ─────────────────────────────────────────────────────

/// A tile must be this hot to start superconducting.
pub const MINIMUM_TEMPERATURE_START_SUPERCONDUCTION: f32 = T20C + 200.0;

/// A superconducting tile stops below this temperature.
pub const MINIMUM_TEMPERATURE_FOR_SUPERCONDUCTION: f32 = T20C + 10.0;

/// Minimum heat capacity of tile air worth superconducting.
pub const M_CELL_WITH_RATIO: f32 = MOLES_CELL_STANDARD * 0.005;

/// Default thermal conductivity of a tile's solid body.
pub const DEFAULT_THERMAL_CONDUCTIVITY: f32 = 0.05;

/// Default heat capacity of a tile's solid body.
pub const DEFAULT_TILE_HEAT_CAPACITY: f32 = 10_000.0;

// ── Fire ────────────────────────────────────────────────────────────────

/// Hotspots below this temperature go out.
pub const FIRE_MINIMUM_TEMPERATURE_TO_EXIST: f32 = T0C + 100.0;

/// Hotspots above this temperature expose their neighbours.
pub const FIRE_MINIMUM_TEMPERATURE_TO_SPREAD: f32 = T0C + 150.0;

/// Fraction of hotspot temperature radiated to neighbours.
pub const FIRE_SPREAD_RADIOSITY_SCALE: f32 = 0.85;

/// Hotspot volume per unit of fire.
pub const FIRE_GROWTH_RATE: f32 = 40_000.0;

/// Hotspot volume multiplier applied on ignition.
pub const HOTSPOT_VOLUME_SCALE: f32 = 25.0;

/// Oxygen moles a tile needs to host a hotspot.
pub const HOTSPOT_MINIMUM_OXYGEN: f32 = 0.5;

/// Plasma or tritium moles a tile needs to host a hotspot.
pub const HOTSPOT_MINIMUM_FUEL: f32 = 0.5;

/// Energy released per mole of plasma burnt, in joules.
pub const FIRE_PLASMA_ENERGY_RELEASED: f32 = 160_000.0;

/// Energy released per mole of hydrogen (tritium) burnt, in joules.
pub const FIRE_HYDROGEN_ENERGY_RELEASED: f32 = 284_000.0;

/// Plasma starts burning above this temperature.
pub const PLASMA_MINIMUM_BURN_TEMPERATURE: f32 = 100.0 + T0C;

/// Plasma burns at its fastest above this temperature.
pub const PLASMA_UPPER_TEMPERATURE: f32 = 1370.0 + T0C;

/// Oxygen-to-plasma ratio at which plasma burns completely.
pub const PLASMA_OXYGEN_FULLBURN: f32 = 10.0;

/// Divisor applied to the plasma burn rate.
pub const PLASMA_BURN_RATE_DELTA: f32 = 9.0;

/// Oxygen consumed per mole of plasma at low temperature.
pub const OXYGEN_BURN_RATE_BASE: f32 = 1.4;

/// Oxygen/plasma ratio where plasma fires start producing tritium.
pub const SUPER_SATURATION_THRESHOLD: f32 = 96.0;

/// Oxygen/plasma ratio where tritium production saturates.
pub const SUPER_SATURATION_ENDS: f32 = SUPER_SATURATION_THRESHOLD / 3.0;

/// Tritium burns when oxygen exceeds this factor of tritium.
pub const TRITIUM_BURN_OXY_FACTOR: f32 = 100.0;

/// Fraction of tritium left after an oxygen-rich burn.
pub const TRITIUM_BURN_TRIT_FACTOR: f32 = 10.0;

/// Thermal energy a tritium mixture needs before it burns completely.
pub const MINIMUM_TRITIUM_OXYBURN_ENERGY: f32 = 2_000_000.0;

/// Minimum moles of each reactant for a fire reaction to run.
pub const MINIMUM_REACTANT_MOLES: f32 = 0.01;
