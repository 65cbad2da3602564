pub mod biome;
pub mod climate;
pub mod config;
pub mod context;
pub mod continents;
pub mod error;
pub mod generator;
pub mod grid;
pub mod heightmap;
pub mod islands;
pub mod landmass;
pub mod postprocess;
pub mod relief;
pub mod rivers;
pub mod terrain;

pub use config::{Generator, IslandSettings, PostProcessSettings, Topology, WorldGenerationParams};
pub use continents::{RegionTable, Surrounder};
pub use error::{ConfigError, GenError, IslandError};
pub use generator::{MapSummary, WorldMap, generate_world};
pub use grid::{RegionId, Tile, TileGrid};
pub use terrain::{Specials, Terrain};
