//! Климат: широта, температурные пояса и условия размещения местности
//!
//! Колатитуда здесь — удалённость от климатического экватора (0 на экваторе,
//! `MAX_COLATITUDE` на полюсе). «Теплота» — обратная величина.

use serde::{Deserialize, Serialize};

use crate::config::ClimateSettings;
use crate::grid::TileGrid;
use crate::heightmap::HMAP_MAX_LEVEL;

pub const MAX_COLATITUDE: i32 = 1000;

/// Температурный пояс клетки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TemperatureBand {
    Frozen,
    Cold,
    #[default]
    Temperate,
    Tropical,
}

impl TemperatureBand {
    fn bit(self) -> u8 {
        match self {
            TemperatureBand::Frozen => 1,
            TemperatureBand::Cold => 1 << 1,
            TemperatureBand::Temperate => 1 << 2,
            TemperatureBand::Tropical => 1 << 3,
        }
    }
}

/// Маска допустимых температурных поясов
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempCondition(u8);

impl TempCondition {
    pub const FROZEN: TempCondition = TempCondition(1);
    pub const COLD: TempCondition = TempCondition(1 << 1);
    pub const TEMPERATE: TempCondition = TempCondition(1 << 2);
    pub const TROPICAL: TempCondition = TempCondition(1 << 3);
    pub const NFROZEN: TempCondition = TempCondition(0b1110);
    pub const HOT: TempCondition = TempCondition(0b1100);
    pub const NHOT: TempCondition = TempCondition(0b0011);
    pub const ALL: TempCondition = TempCondition(0b1111);

    #[must_use]
    pub fn allows(self, band: TemperatureBand) -> bool {
        self.0 & band.bit() != 0
    }
}

/// Условие по влажности
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WetCondition {
    All,
    Dry,
    NotDry,
}

/// Условие по высоте
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiscCondition {
    None,
    Low,
    NotLow,
}

/// Пороги температурных поясов, зависящие от глобальной температуры
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClimateLevels {
    pub cold: i32,
    pub tropical: i32,
    pub ice_base: i32,
    pub temperature: i32,
    pub all_temperate: bool,
}

impl ClimateLevels {
    #[must_use]
    pub fn new(settings: &ClimateSettings) -> Self {
        let t = settings.temperature as i32;
        let cold = (MAX_COLATITUDE * (60 * 7 - t * 6) / 700).max(0);
        let tropical = (MAX_COLATITUDE * 9 / 10).min(MAX_COLATITUDE * (143 * 7 - t * 10) / 700);
        let ice_base = if settings.all_temperate { 0 } else { cold / 2 };
        Self {
            cold,
            tropical,
            ice_base,
            temperature: t,
            all_temperate: settings.all_temperate,
        }
    }

    /// Есть ли на карте полюса
    #[must_use]
    pub fn has_poles(&self) -> bool {
        !self.all_temperate && self.ice_base > 0
    }

    /// Удалённость клетки от экватора, 0..=`MAX_COLATITUDE`
    #[must_use]
    pub fn colatitude(&self, grid: &TileGrid, idx: usize) -> i32 {
        if self.all_temperate {
            return MAX_COLATITUDE / 2;
        }
        let (x, y) = grid.coords(idx);
        // Если зациклена только ось Y, полюса лежат слева и справа
        let (pos, len) = if grid.topology.wrap_y && !grid.topology.wrap_x {
            (i64::from(x), i64::from(grid.width))
        } else {
            (i64::from(y), i64::from(grid.height))
        };
        let twice = (2 * pos + 1 - len).abs();
        (twice * i64::from(MAX_COLATITUDE) / len) as i32
    }

    #[must_use]
    pub fn warmth(&self, grid: &TileGrid, idx: usize) -> i32 {
        MAX_COLATITUDE - self.colatitude(grid, idx)
    }

    #[must_use]
    pub fn band_for(&self, temperature: i32) -> TemperatureBand {
        if temperature < self.ice_base {
            TemperatureBand::Frozen
        } else if temperature < self.cold {
            TemperatureBand::Cold
        } else if temperature >= self.tropical {
            TemperatureBand::Tropical
        } else {
            TemperatureBand::Temperate
        }
    }

    /// Температура клетки с поправками на высоту и близость моря
    #[must_use]
    pub fn temperature_at(&self, grid: &TileGrid, idx: usize, shore_level: i32) -> i32 {
        let warmth = self.warmth(grid, idx);
        let tile = &grid.tiles[idx];
        if tile.is_water() {
            return warmth;
        }
        let relief = HMAP_MAX_LEVEL - shore_level;
        let height = if relief > 0 {
            -0.3 * (tile.elevation - shore_level).max(0) as f32 / relief as f32
        } else {
            0.0
        };
        let ocean = grid.percent_near(idx, false, |t| t.is_water()).min(50);
        let temperate = 0.15
            * (self.temperature as f32 / 100.0 - warmth as f32 / MAX_COLATITUDE as f32)
            * 2.0
            * ocean as f32
            / 100.0;
        (warmth as f32 * (1.0 + temperate) * (1.0 + height)) as i32
    }
}

/// Назначает температурный пояс каждой клетке
pub fn assign_temperature_map(grid: &mut TileGrid, levels: &ClimateLevels, shore_level: i32) {
    let bands: Vec<TemperatureBand> = (0..grid.len())
        .map(|idx| levels.band_for(levels.temperature_at(grid, idx, shore_level)))
        .collect();
    for (tile, band) in grid.tiles.iter_mut().zip(bands) {
        tile.band = band;
    }
}

/// Назначает пояса только перечисленным клеткам (для свежепоставленного острова)
pub fn assign_bands_for(
    grid: &mut TileGrid,
    levels: &ClimateLevels,
    shore_level: i32,
    tiles: &[usize],
) {
    for &idx in tiles {
        let band = levels.band_for(levels.temperature_at(grid, idx, shore_level));
        grid.tiles[idx].band = band;
    }
}

/// Сухая клетка: не ледяная и мало воды вокруг
#[must_use]
pub fn is_dry(grid: &TileGrid, idx: usize) -> bool {
    grid.tiles[idx].band != TemperatureBand::Frozen
        && grid.percent_near(idx, false, |t| t.is_water()) <= 35
}

#[must_use]
pub fn test_wetness(grid: &TileGrid, idx: usize, condition: WetCondition) -> bool {
    match condition {
        WetCondition::All => true,
        WetCondition::Dry => is_dry(grid, idx),
        WetCondition::NotDry => !is_dry(grid, idx),
    }
}
