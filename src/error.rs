//! Ошибки генератора
//!
//! Мягкие деградации (недоросший остров, недобранная длина рек, откат с островного
//! генератора) сюда не попадают: они только логируются. Здесь только то, что
//! останавливает проход целиком.

use std::collections::TryReserveError;
use std::path::PathBuf;

use crate::config::Generator;

/// Ошибка загрузки или проверки конфигурации
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("map size {width}x{height} is too small (minimum {min}x{min})")]
    MapTooSmall { width: u32, height: u32, min: u32 },

    #[error("{name} = {value} is out of range {min}..={max}")]
    OutOfRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("unknown generator id {0} (expected 1..=5)")]
    UnknownGenerator(u8),
}

/// Ошибка прохода генерации
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to allocate generation scratch: {0}")]
    ScratchAllocation(#[from] TryReserveError),

    #[error("tile ({x}, {y}) has no terrain after generation")]
    UnassignedTerrain { x: u32, y: u32 },

    #[error("{count} land tiles left unplaced after biome distribution")]
    UnplacedLand { count: usize },

    #[error("region sizes sum to {counted}, map has {tiles} tiles")]
    RegionSizeMismatch { counted: usize, tiles: usize },
}

/// Отказ островного генератора. Не ошибка прохода: генерация продолжается
/// случайным генератором.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IslandError {
    #[error("generator {generator:?} is unsuitable: {reason}")]
    Unsuitable {
        generator: Generator,
        reason: &'static str,
    },

    #[error("starter island {island} of mass {mass} could not be placed")]
    StarterFailed { island: i32, mass: i64 },

    #[error("could not make starter islands bigger than the secondary ones")]
    NoFairStart,
}
