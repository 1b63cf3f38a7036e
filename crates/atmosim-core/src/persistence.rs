//! Save/load for grids and whole engines.
//!
//! A grid is stored as a list of unique mixtures plus, per tile, an
//! optional index into that list. Tiles sharing identical air (a freshly
//! generated station is mostly one mixture) cost one record between them.
//! Encoding is bincode; every float round-trips bit for bit.

use std::collections::HashMap;
use std::io::{Read, Write};

use atmosim_logic::{GasMixture, GAS_COUNT};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{AtmosConfig, TileDefaults};
use crate::grid::{GridAtmosphere, GridId};
use crate::occupants::{Airtight, HeatConductor, Occupants, TilePosition};
use crate::tile::TileCoord;

/// Current save format version
const SAVE_VERSION: u32 = 1;

/// A mixture as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureRecord {
    pub moles: [f32; GAS_COUNT],
    pub temperature: f32,
    pub volume: f32,
    pub immutable: bool,
}

impl MixtureRecord {
    pub fn capture(mixture: &GasMixture) -> Self {
        Self {
            moles: *mixture.moles_array(),
            temperature: mixture.temperature(),
            volume: mixture.volume(),
            immutable: mixture.is_immutable(),
        }
    }

    pub fn to_mixture(&self) -> GasMixture {
        GasMixture::from_parts(self.moles, self.temperature, self.volume, self.immutable)
    }

    /// Identity by bit pattern, so -0.0 and NaN payloads stay distinct.
    fn key(&self) -> ([u32; GAS_COUNT], u32, u32, bool) {
        (
            self.moles.map(f32::to_bits),
            self.temperature.to_bits(),
            self.volume.to_bits(),
            self.immutable,
        )
    }
}

/// One tile: where it is and which unique mixture it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    pub coord: TileCoord,
    /// Index into [`GridSnapshot::unique_mixtures`]; `None` for airless tiles.
    pub mixture: Option<u32>,
}

/// A grid's gas state in deduplicated form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub unique_mixtures: Vec<MixtureRecord>,
    pub tiles: Vec<TileRecord>,
}

impl GridSnapshot {
    /// Snapshot every tile of `grid`, in coordinate order.
    pub fn capture(grid: &GridAtmosphere) -> Self {
        let mut snapshot = GridSnapshot::default();
        let mut seen = HashMap::new();

        let mut tiles: Vec<_> = grid.tiles().collect();
        tiles.sort_by_key(|t| t.coord);
        for tile in tiles {
            let mixture = tile.air.as_ref().map(|air| {
                let record = MixtureRecord::capture(air);
                *seen.entry(record.key()).or_insert_with(|| {
                    snapshot.unique_mixtures.push(record);
                    (snapshot.unique_mixtures.len() - 1) as u32
                })
            });
            snapshot.tiles.push(TileRecord {
                coord: tile.coord,
                mixture,
            });
        }
        snapshot
    }

    /// Rebuild a grid. Every tile comes back invalidated, so the first
    /// cycle recomputes adjacency and wakes the tiles up.
    pub fn restore(
        &self,
        id: GridId,
        default_mixture: GasMixture,
        tile_defaults: TileDefaults,
    ) -> Result<GridAtmosphere, SaveError> {
        let mut grid = GridAtmosphere::new(id, default_mixture, tile_defaults);
        for tile in &self.tiles {
            let air = match tile.mixture {
                Some(index) => {
                    let record = self.unique_mixtures.get(index as usize).ok_or(
                        SaveError::MixtureIndexOutOfRange {
                            coord: tile.coord,
                            index,
                        },
                    )?;
                    Some(record.to_mixture())
                }
                None => None,
            };
            if !grid.add_tile_with_mixture(tile.coord, air) {
                warn!("snapshot for grid {:?} lists {:?} twice; keeping the first", id, tile.coord);
            }
        }
        Ok(grid)
    }
}

/// An occupant as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedOccupant {
    pub position: TilePosition,
    pub airtight: Option<Airtight>,
    pub conductor: Option<HeatConductor>,
}

/// One grid as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGrid {
    pub id: GridId,
    pub default_mixture: MixtureRecord,
    pub simulated: bool,
    pub snapshot: GridSnapshot,
}

/// Complete engine save
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub config: AtmosConfig,
    pub grids: Vec<SavedGrid>,
    pub occupants: Vec<SavedOccupant>,
}

fn save_grid_record(grid: &GridAtmosphere) -> SavedGrid {
    SavedGrid {
        id: grid.id(),
        default_mixture: MixtureRecord::capture(grid.default_mixture()),
        simulated: grid.is_simulated(),
        snapshot: GridSnapshot::capture(grid),
    }
}

fn load_grid_record(saved: &SavedGrid, tile_defaults: TileDefaults) -> Result<GridAtmosphere, SaveError> {
    let mut grid = saved
        .snapshot
        .restore(saved.id, saved.default_mixture.to_mixture(), tile_defaults)?;
    grid.set_simulated(saved.simulated);
    Ok(grid)
}

fn serialize_occupants(occupants: &Occupants) -> Vec<SavedOccupant> {
    let mut saved = Vec::new();
    for (entity, position) in occupants.world().query::<&TilePosition>().iter() {
        saved.push(SavedOccupant {
            position: *position,
            airtight: occupants.airtight(entity),
            conductor: occupants.world().get::<&HeatConductor>(entity).ok().map(|c| *c),
        });
    }
    saved.sort_by_key(|o| (o.position.grid, o.position.coord));
    saved
}

/// Save a single grid to a writer
pub fn save_grid<W: Write>(writer: W, grid: &GridAtmosphere) -> Result<(), SaveError> {
    let data = (SAVE_VERSION, save_grid_record(grid));
    bincode::serialize_into(writer, &data)?;
    Ok(())
}

/// Load a single grid from a reader
pub fn load_grid<R: Read>(reader: R, tile_defaults: TileDefaults) -> Result<GridAtmosphere, SaveError> {
    let (version, saved): (u32, SavedGrid) = bincode::deserialize_from(reader)?;
    if version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: version,
        });
    }
    load_grid_record(&saved, tile_defaults)
}

/// Save the complete engine state to a writer
pub fn save_simulation<'a, W: Write>(
    writer: W,
    config: &AtmosConfig,
    grids: impl IntoIterator<Item = &'a GridAtmosphere>,
    occupants: &Occupants,
) -> Result<(), SaveError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        config: config.clone(),
        grids: grids.into_iter().map(save_grid_record).collect(),
        occupants: serialize_occupants(occupants),
    };
    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Result of loading a simulation
pub struct LoadedSimulation {
    pub config: AtmosConfig,
    pub grids: Vec<GridAtmosphere>,
    pub occupants: Occupants,
}

/// Load an engine state from a reader
pub fn load_simulation<R: Read>(reader: R) -> Result<LoadedSimulation, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let grids = save_data
        .grids
        .iter()
        .map(|g| load_grid_record(g, save_data.config.tiles))
        .collect::<Result<Vec<_>, _>>()?;

    let mut occupants = Occupants::new();
    for o in save_data.occupants {
        occupants.spawn(o.position, o.airtight, o.conductor);
    }

    Ok(LoadedSimulation {
        config: save_data.config,
        grids,
        occupants,
    })
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
    MixtureIndexOutOfRange { coord: TileCoord, index: u32 },
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(f, "Version mismatch: expected {}, found {}", expected, found)
            }
            SaveError::MixtureIndexOutOfRange { coord, index } => {
                write!(f, "Tile {:?} refers to missing mixture {}", coord, index)
            }
        }
    }
}

impl std::error::Error for SaveError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileKind;
    use atmosim_logic::constants::{CELL_VOLUME, T20C};
    use atmosim_logic::Gas;

    fn sample_grid() -> GridAtmosphere {
        let mut grid = GridAtmosphere::new(
            GridId(7),
            GasMixture::standard_air(CELL_VOLUME, T20C),
            TileDefaults::default(),
        );
        for x in 0..4 {
            grid.add_tile(TileCoord::new(x, 0), TileKind::Floor);
        }
        grid.add_tile(TileCoord::new(4, 0), TileKind::Space);
        grid.add_tile_with_mixture(TileCoord::new(5, 0), None);
        let mut odd = GasMixture::with_temperature(CELL_VOLUME, 351.123_45);
        odd.set_moles(Gas::Plasma, 12.345_678);
        grid.add_tile_with_mixture(TileCoord::new(0, 1), Some(odd));
        grid
    }

    #[test]
    fn test_identical_mixtures_are_deduplicated() {
        let snapshot = GridSnapshot::capture(&sample_grid());
        // Standard air, space, the plasma tile.
        assert_eq!(snapshot.unique_mixtures.len(), 3);
        assert_eq!(snapshot.tiles.len(), 7);
        let airless = snapshot.tiles.iter().find(|t| t.coord == TileCoord::new(5, 0));
        assert_eq!(airless.map(|t| t.mixture), Some(None));
    }

    #[test]
    fn test_grid_round_trip_is_bit_identical() {
        let grid = sample_grid();
        let mut bytes = Vec::new();
        save_grid(&mut bytes, &grid).expect("save");
        let loaded = load_grid(bytes.as_slice(), TileDefaults::default()).expect("load");

        assert_eq!(loaded.id(), GridId(7));
        assert_eq!(loaded.tile_count(), grid.tile_count());
        for tile in grid.tiles() {
            let other = loaded.tile(tile.coord).expect("tile restored");
            match (&tile.air, &other.air) {
                (Some(a), Some(b)) => {
                    assert_eq!(a.moles_array().map(f32::to_bits), b.moles_array().map(f32::to_bits));
                    assert_eq!(a.temperature().to_bits(), b.temperature().to_bits());
                    assert_eq!(a.volume().to_bits(), b.volume().to_bits());
                    assert_eq!(a.is_immutable(), b.is_immutable());
                }
                (None, None) => {}
                _ => panic!("air presence changed at {:?}", tile.coord),
            }
        }
    }

    #[test]
    fn test_bad_mixture_index_is_an_error() {
        let snapshot = GridSnapshot {
            unique_mixtures: Vec::new(),
            tiles: vec![TileRecord {
                coord: TileCoord::new(0, 0),
                mixture: Some(3),
            }],
        };
        let result = snapshot.restore(GridId(0), GasMixture::space(), TileDefaults::default());
        assert!(matches!(
            result,
            Err(SaveError::MixtureIndexOutOfRange { index: 3, .. })
        ));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut bytes = Vec::new();
        let data = (SAVE_VERSION + 1, save_grid_record(&sample_grid()));
        bincode::serialize_into(&mut bytes, &data).expect("encode");
        let result = load_grid(bytes.as_slice(), TileDefaults::default());
        assert!(matches!(result, Err(SaveError::VersionMismatch { .. })));
    }
}
