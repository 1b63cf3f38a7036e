//! Pure gas physics for atmosim.
//!
//! This crate holds everything about atmospherics that does not need a
//! grid: gas species, the [`mixture::GasMixture`] leaf type with its
//! merge/remove/share/react operations, combustion reactions, and the
//! direction bitmask tiles use for adjacency. Functions take plain data
//! and return results, so they are unit-testable and reusable by pipe
//! networks, tanks, or anything else that owns gas.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`constants`] | Physical constants and default tunables |
//! | [`direction`] | Cardinal direction bitmask, rotation, offsets |
//! | [`gas`] | Gas species and specific heats |
//! | [`mixture`] | `GasMixture`: merge, remove, share, compare, pump, scrub |
//! | [`reactions`] | Plasma and tritium fires |
//! | [`thresholds`] | Tunable epsilons for sharing and comparison |

pub mod constants;
pub mod direction;
pub mod gas;
pub mod mixture;
pub mod reactions;
pub mod thresholds;

pub use direction::AtmosDirection;
pub use gas::{Gas, GAS_COUNT};
pub use mixture::{merge, GasCompareResult, GasMixture};
pub use reactions::{GasReaction, ReactionResult};
pub use thresholds::GasThresholds;
