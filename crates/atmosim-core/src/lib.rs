//! Atmosim Core - Grid Atmospherics Engine
//!
//! Simulates gas on 2D tile grids: diffusion between neighbouring tiles,
//! fires, heat conduction through walls, and pressure-driven movement,
//! processed in budgeted phases so a large station never stalls a frame.
//!
//! # Architecture
//!
//! - **Grids** ([`grid::GridAtmosphere`]): own their tiles and every
//!   tracking set. Grids are independent.
//! - **Phases** ([`processing`]): a fixed rotation run one phase per atmos
//!   tick, each resumable when the budget runs out.
//! - **Occupants** ([`occupants`]): walls and doors live in a `hecs` world
//!   and decide which tile sides air can cross.
//!
//! Gas physics itself lives in `atmosim_logic`.
//!
//! # Example
//!
//! ```rust,no_run
//! use atmosim_core::prelude::*;
//! use atmosim_core::generation::StationConfig;
//!
//! let mut engine = AtmosphereEngine::new(AtmosConfig::default());
//!
//! // Generate a station
//! engine.generate_station(&StationConfig::default(), 42);
//!
//! // Run simulation
//! loop {
//!     engine.update(1.0 / 60.0); // 60 FPS
//! }
//! ```

pub mod budget;
pub mod config;
pub mod devices;
pub mod engine;
pub mod generation;
pub mod grid;
pub mod occupants;
pub mod persistence;
pub mod processing;
pub mod tile;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::budget::ProcessingBudget;
    pub use crate::config::AtmosConfig;
    pub use crate::devices::{AtmosDevice, DeviceId, TileGasAccess};
    pub use crate::engine::AtmosphereEngine;
    pub use crate::grid::{GridAtmosphere, GridId, ProcessingPhase};
    pub use crate::occupants::{Airtight, HeatConductor};
    pub use crate::processing::{PressureListener, PressureMovement};
    pub use crate::tile::{TileCoord, TileKind};
    pub use atmosim_logic::{AtmosDirection, Gas, GasMixture};
}
