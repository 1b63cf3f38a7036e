//! The gas capability external consumers get.
//!
//! Devices (vents, scrubbers, canisters) never see tiles or groups, only a
//! [`TileGasAccess`]: read a mixture, or modify one and let the grid wake
//! the tile up.

use atmosim_logic::GasMixture;
use serde::{Deserialize, Serialize};

use crate::tile::TileCoord;

/// Handle returned by `add_device`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

pub trait TileGasAccess {
    fn tile_mixture(&self, coord: TileCoord) -> Option<&GasMixture>;

    /// Run `f` on a tile's air and excite the tile. Returns false when the
    /// tile does not exist or cannot hold gas.
    fn modify_tile_mixture(&mut self, coord: TileCoord, f: &mut dyn FnMut(&mut GasMixture)) -> bool;
}

/// Something that exchanges gas with tiles once per processing cycle.
pub trait AtmosDevice {
    /// `dt` is the effective time between updates (one full cycle).
    fn update(&mut self, atmos: &mut dyn TileGasAccess, dt: f32);
}
