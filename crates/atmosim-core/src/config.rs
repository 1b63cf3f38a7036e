//! Engine configuration: every tunable, JSON loadable.

use std::path::Path;
use std::time::Duration;

use atmosim_logic::constants::*;
use atmosim_logic::GasThresholds;
use serde::{Deserialize, Serialize};

/// Error loading or validating an [`AtmosConfig`].
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid { field: &'static str, reason: String },
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Json(e) => write!(f, "JSON error: {}", e),
            ConfigError::Invalid { field, reason } => write!(f, "invalid {}: {}", field, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Excited-group lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcitedGroupSettings {
    pub enabled: bool,
    /// Cycles before a group averages its tiles.
    pub breakdown_cycles: u32,
    /// Quiet cycles before a group dissolves and its tiles sleep.
    pub dismantle_cycles: u32,
}

impl Default for ExcitedGroupSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            breakdown_cycles: EXCITED_GROUP_BREAKDOWN_CYCLES,
            dismantle_cycles: EXCITED_GROUP_DISMANTLE_CYCLES,
        }
    }
}

/// Hotspot and combustion tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireSettings {
    pub ignition_temperature: f32,
    pub minimum_temperature_to_exist: f32,
    pub minimum_temperature_to_spread: f32,
    pub spread_radiosity_scale: f32,
    pub growth_rate: f32,
    pub hotspot_volume_scale: f32,
    pub minimum_oxygen: f32,
    pub minimum_fuel: f32,
}

impl Default for FireSettings {
    fn default() -> Self {
        Self {
            ignition_temperature: PLASMA_MINIMUM_BURN_TEMPERATURE,
            minimum_temperature_to_exist: FIRE_MINIMUM_TEMPERATURE_TO_EXIST,
            minimum_temperature_to_spread: FIRE_MINIMUM_TEMPERATURE_TO_SPREAD,
            spread_radiosity_scale: FIRE_SPREAD_RADIOSITY_SCALE,
            growth_rate: FIRE_GROWTH_RATE,
            hotspot_volume_scale: HOTSPOT_VOLUME_SCALE,
            minimum_oxygen: HOTSPOT_MINIMUM_OXYGEN,
            minimum_fuel: HOTSPOT_MINIMUM_FUEL,
        }
    }
}

/// Heat conduction through walls and windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuperconductionSettings {
    pub enabled: bool,
    pub start_temperature: f32,
    pub minimum_temperature: f32,
    /// Tile air needs at least this heat capacity to conduct.
    pub minimum_heat_capacity: f32,
    pub window_heat_transfer_coefficient: f32,
}

impl Default for SuperconductionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            start_temperature: MINIMUM_TEMPERATURE_START_SUPERCONDUCTION,
            minimum_temperature: MINIMUM_TEMPERATURE_FOR_SUPERCONDUCTION,
            minimum_heat_capacity: M_CELL_WITH_RATIO,
            window_heat_transfer_coefficient: WINDOW_HEAT_TRANSFER_COEFFICIENT,
        }
    }
}

/// Pressure-driven movement reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighPressureSettings {
    /// Differentials (kPa) above this are reported to listeners.
    pub movement_threshold: f32,
}

impl Default for HighPressureSettings {
    fn default() -> Self {
        Self {
            movement_threshold: 20.0,
        }
    }
}

/// Properties given to newly created tiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileDefaults {
    pub volume: f32,
    pub temperature: f32,
    pub heat_capacity: f32,
    pub thermal_conductivity: f32,
}

impl Default for TileDefaults {
    fn default() -> Self {
        Self {
            volume: CELL_VOLUME,
            temperature: T20C,
            heat_capacity: DEFAULT_TILE_HEAT_CAPACITY,
            thermal_conductivity: DEFAULT_THERMAL_CONDUCTIVITY,
        }
    }
}

/// All engine tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtmosConfig {
    /// Phases advanced per second, per grid.
    pub tick_rate: f32,
    /// Wall-clock budget per `update` call.
    pub max_process_time_ms: f32,
    /// Items processed between clock reads.
    pub lag_check_iterations: u32,
    pub thresholds: GasThresholds,
    pub excited_groups: ExcitedGroupSettings,
    pub superconduction: SuperconductionSettings,
    pub fire: FireSettings,
    pub high_pressure: HighPressureSettings,
    pub tiles: TileDefaults,
}

impl Default for AtmosConfig {
    fn default() -> Self {
        Self {
            tick_rate: 15.0,
            max_process_time_ms: 3.0,
            lag_check_iterations: 30,
            thresholds: GasThresholds::default(),
            excited_groups: ExcitedGroupSettings::default(),
            superconduction: SuperconductionSettings::default(),
            fire: FireSettings::default(),
            high_pressure: HighPressureSettings::default(),
            tiles: TileDefaults::default(),
        }
    }
}

fn check(ok: bool, field: &'static str, reason: impl Into<String>) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: reason.into(),
        })
    }
}

impl AtmosConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: AtmosConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check(self.tick_rate > 0.0, "tick_rate", "must be positive")?;
        check(self.max_process_time_ms > 0.0, "max_process_time_ms", "must be positive")?;
        check(self.lag_check_iterations > 0, "lag_check_iterations", "must be at least 1")?;

        let t = &self.thresholds;
        check(t.minimum_moles_delta_to_move >= 0.0, "thresholds.minimum_moles_delta_to_move", "must not be negative")?;
        check(t.minimum_air_ratio_to_move >= 0.0, "thresholds.minimum_air_ratio_to_move", "must not be negative")?;
        check(
            (0.0..=0.5).contains(&t.open_heat_transfer_coefficient),
            "thresholds.open_heat_transfer_coefficient",
            "must be within [0, 0.5]",
        )?;

        check(self.excited_groups.breakdown_cycles > 0, "excited_groups.breakdown_cycles", "must be at least 1")?;
        check(self.excited_groups.dismantle_cycles > 0, "excited_groups.dismantle_cycles", "must be at least 1")?;

        let s = &self.superconduction;
        check(
            s.start_temperature >= s.minimum_temperature,
            "superconduction.start_temperature",
            format!("{} is below minimum_temperature {}", s.start_temperature, s.minimum_temperature),
        )?;
        check(
            (0.0..=0.5).contains(&s.window_heat_transfer_coefficient),
            "superconduction.window_heat_transfer_coefficient",
            "must be within [0, 0.5]",
        )?;

        let fire = &self.fire;
        check(fire.minimum_temperature_to_exist >= TCMB, "fire.minimum_temperature_to_exist", "must be at least TCMB")?;
        check(
            (0.0..=1.0).contains(&fire.spread_radiosity_scale),
            "fire.spread_radiosity_scale",
            "must be within [0, 1]",
        )?;
        check(fire.growth_rate > 0.0, "fire.growth_rate", "must be positive")?;

        check(self.high_pressure.movement_threshold >= 0.0, "high_pressure.movement_threshold", "must not be negative")?;

        let tiles = &self.tiles;
        check(tiles.volume > 0.0, "tiles.volume", "must be positive")?;
        check(tiles.temperature >= TCMB, "tiles.temperature", "must be at least TCMB")?;
        check(tiles.heat_capacity >= 0.0, "tiles.heat_capacity", "must not be negative")?;
        check(
            (0.0..=1.0).contains(&tiles.thermal_conductivity),
            "tiles.thermal_conductivity",
            "must be within [0, 1]",
        )?;
        Ok(())
    }

    /// Seconds per phase.
    pub fn atmos_time(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Seconds per full cycle: one tick per enabled phase.
    pub fn real_atmos_time(&self) -> f32 {
        let mut phases = 6;
        if self.excited_groups.enabled {
            phases += 1;
        }
        if self.superconduction.enabled {
            phases += 1;
        }
        self.atmos_time() * phases as f32
    }

    pub fn max_process_time(&self) -> Duration {
        Duration::from_secs_f32(self.max_process_time_ms / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AtmosConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = AtmosConfig::from_json(r#"{ "tick_rate": 30.0, "fire": { "growth_rate": 1000.0 } }"#)
            .expect("parse");
        assert_eq!(config.tick_rate, 30.0);
        assert_eq!(config.fire.growth_rate, 1000.0);
        assert_eq!(config.fire.minimum_oxygen, HOTSPOT_MINIMUM_OXYGEN);
        assert_eq!(config.tiles, TileDefaults::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = AtmosConfig::from_json(r#"{ "tick_rate": 0.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "tick_rate", .. }));

        let mut config = AtmosConfig::default();
        config.superconduction.start_temperature = 10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(AtmosConfig::from_json("{ nope"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AtmosConfig::default();
        let json = config.to_json().expect("serialize");
        assert_eq!(AtmosConfig::from_json(&json).expect("parse"), config);
    }

    #[test]
    fn test_real_atmos_time_counts_enabled_phases() {
        let mut config = AtmosConfig::default();
        let all = config.real_atmos_time();
        config.superconduction.enabled = false;
        assert!(config.real_atmos_time() < all);
        assert!((all - 8.0 / 15.0).abs() < 1e-6);
    }
}
