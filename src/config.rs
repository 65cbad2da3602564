// src/config.rs
//! Конфигурация генерации мира
//!
//! Этот модуль определяет все параметры, управляющие процедурной генерацией карты:
//! - Алгоритм генерации (случайные высоты, фрактал, три семейства островов)
//! - Топологию (зацикливание по X/Y)
//! - Климат (температура, влажность)
//! - Рельеф и доли типов местности
//! - Настройки островного распределителя и постобработки
//!
//! Все структуры поддерживают сериализацию в TOML/JSON для удобной настройки через конфигурационные файлы.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::climate::{ClimateLevels, MAX_COLATITUDE};
use crate::error::ConfigError;

/// Минимальная сторона карты
pub const MIN_MAP_SIDE: u32 = 8;

/// Алгоритм генерации
///
/// Номера совпадают с числовыми идентификаторами генераторов (1..=5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Generator {
    /// Случайный шум со сглаживанием
    #[default]
    Random,
    /// Фрактальный шум (FBm)
    Fractal,
    /// Равные острова для каждого игрока (70/20/10)
    FairIslands,
    /// Один крупный остров на игрока плюс острова случайного размера
    VariedIslands,
    /// Двое-трое игроков на одном острове
    SharedIslands,
}

impl Generator {
    #[must_use]
    pub fn id(self) -> u8 {
        match self {
            Generator::Random => 1,
            Generator::Fractal => 2,
            Generator::FairIslands => 3,
            Generator::VariedIslands => 4,
            Generator::SharedIslands => 5,
        }
    }

    /// Генераторы, раскладывающие сушу островами, а не порогом карты высот
    #[must_use]
    pub fn is_island_family(self) -> bool {
        matches!(
            self,
            Generator::FairIslands | Generator::VariedIslands | Generator::SharedIslands
        )
    }
}

impl TryFrom<u8> for Generator {
    type Error = ConfigError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Generator::Random),
            2 => Ok(Generator::Fractal),
            3 => Ok(Generator::FairIslands),
            4 => Ok(Generator::VariedIslands),
            5 => Ok(Generator::SharedIslands),
            other => Err(ConfigError::UnknownGenerator(other)),
        }
    }
}

/// Топология карты
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    /// Зацикливание по долготе (восток ↔ запад)
    #[serde(default = "default_wrap_x")]
    pub wrap_x: bool,

    /// Зацикливание по широте (север ↔ юг)
    #[serde(default)]
    pub wrap_y: bool,
}

fn default_wrap_x() -> bool {
    true
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            wrap_x: true,
            wrap_y: false,
        }
    }
}

/// Климатические настройки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimateSettings {
    /// Средняя температура мира (0 = ледниковый период, 100 = жара)
    #[serde(default = "default_percent_50")]
    pub temperature: u32,

    /// Влажность (0 = сухо, 100 = много лесов, болот и рек)
    #[serde(default = "default_percent_50")]
    pub wetness: u32,

    /// Вся карта умеренная: нет полюсов и экватора
    #[serde(default)]
    pub all_temperate: bool,
}

fn default_percent_50() -> u32 {
    50
}

impl Default for ClimateSettings {
    fn default() -> Self {
        Self {
            temperature: 50,
            wetness: 50,
            all_temperate: false,
        }
    }
}

/// Явные доли местности (в процентах от нераспределённой суши)
///
/// Если заданы, заменяют значения, выведенные из климата и крутизны.
/// `forest` — общая доля растительности, из которой выделяется джунглевая часть.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainOverrides {
    pub mountain: f32,
    pub forest: f32,
    pub swamp: f32,
    pub desert: f32,
    pub river: f32,
}

/// Настройки рельефа
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerrainSettings {
    /// Доля суши в процентах (15..=85)
    #[serde(default = "default_landmass")]
    pub landmass: u32,

    /// Крутизна: чем больше, тем больше холмов и гор (0..=100)
    #[serde(default = "default_steepness")]
    pub steepness: u32,

    /// Явные доли местности вместо выведенных
    #[serde(default)]
    pub overrides: Option<TerrainOverrides>,
}

fn default_landmass() -> u32 {
    30
}
fn default_steepness() -> u32 {
    30
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            landmass: 30,
            steepness: 30,
            overrides: None,
        }
    }
}

/// Настройки островного распределителя
///
/// Константы подобраны эмпирически; значения по умолчанию сохраняют исходное поведение.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IslandSettings {
    /// Остров меньше этой доли (в %) от запрошенной массы считается неудачей
    #[serde(default = "default_min_fraction_percent")]
    pub min_fraction_percent: u32,

    /// То же для стартовых островов игроков в генераторе честных островов
    #[serde(default = "default_starter_min_percent")]
    pub starter_min_percent: u32,
}

fn default_min_fraction_percent() -> u32 {
    10
}
fn default_starter_min_percent() -> u32 {
    95
}

impl Default for IslandSettings {
    fn default() -> Self {
        Self {
            min_fraction_percent: 10,
            starter_min_percent: 95,
        }
    }
}

/// Настройки постобработки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostProcessSettings {
    /// Превращать одиночные клетки суши в воду
    #[serde(default = "default_remove_tiny_islands")]
    pub remove_tiny_islands: bool,

    /// Внутренние водоёмы не больше этого размера становятся озёрами
    #[serde(default = "default_lake_max_size")]
    pub lake_max_size: usize,

    /// Расстояние от суши, начиная с которого океан становится глубоким
    #[serde(default = "default_deep_ocean_distance")]
    pub deep_ocean_distance: u32,
}

fn default_remove_tiny_islands() -> bool {
    true
}
fn default_lake_max_size() -> usize {
    2
}
fn default_deep_ocean_distance() -> u32 {
    3
}

impl Default for PostProcessSettings {
    fn default() -> Self {
        Self {
            remove_tiny_islands: true,
            lake_max_size: 2,
            deep_ocean_distance: 3,
        }
    }
}

/// Основные параметры генерации мира
///
/// Полная конфигурация для генерации одной карты. Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldGenerationParams {
    /// Сид генератора случайных чисел (детерминированная генерация)
    pub seed: u64,

    /// Ширина карты в клетках
    #[serde(default = "default_width")]
    pub width: u32,

    /// Высота карты в клетках
    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default)]
    pub topology: Topology,

    /// Алгоритм генерации (по умолчанию `Random`)
    #[serde(default)]
    pub generator: Generator,

    /// Количество игроков (влияет на островные генераторы и сглаживание)
    #[serde(default = "default_players")]
    pub players: u32,

    #[serde(default)]
    pub climate: ClimateSettings,

    #[serde(default)]
    pub terrain: TerrainSettings,

    /// Хижины на 1000 клеток
    #[serde(default = "default_huts")]
    pub huts: u32,

    /// Вероятность ресурса на клетке, в промилле
    #[serde(default = "default_resources")]
    pub resources: u32,

    #[serde(default)]
    pub islands: IslandSettings,

    #[serde(default)]
    pub postprocess: PostProcessSettings,
}

impl WorldGenerationParams {
    /// Загружает параметры из TOML-файла
    ///
    /// # Пример
    /// ```toml
    /// # world.toml
    /// seed = 42
    /// width = 80
    /// height = 50
    /// generator = "FairIslands"
    /// players = 4
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let params: Self = toml::from_str(&contents)?;
        params.validate()?;
        Ok(params)
    }

    /// Проверяет диапазоны параметров
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < MIN_MAP_SIDE || self.height < MIN_MAP_SIDE {
            return Err(ConfigError::MapTooSmall {
                width: self.width,
                height: self.height,
                min: MIN_MAP_SIDE,
            });
        }
        check_range("landmass", self.terrain.landmass, 15, 85)?;
        check_range("steepness", self.terrain.steepness, 0, 100)?;
        check_range("temperature", self.climate.temperature, 0, 100)?;
        check_range("wetness", self.climate.wetness, 0, 100)?;
        check_range("players", self.players, 1, 64)?;
        check_range("huts", self.huts, 0, 500)?;
        check_range("resources", self.resources, 0, 1000)?;
        check_range(
            "min_fraction_percent",
            self.islands.min_fraction_percent,
            1,
            100,
        )?;
        check_range(
            "starter_min_percent",
            self.islands.starter_min_percent,
            1,
            100,
        )?;
        Ok(())
    }

    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn check_range(name: &'static str, value: u32, min: u32, max: u32) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

fn default_width() -> u32 {
    80
}
fn default_height() -> u32 {
    50
}
fn default_players() -> u32 {
    4
}
fn default_huts() -> u32 {
    15
}
fn default_resources() -> u32 {
    100
}

impl Default for WorldGenerationParams {
    fn default() -> Self {
        Self {
            seed: 0,
            width: 80,
            height: 50,
            topology: Topology::default(),
            generator: Generator::Random,
            players: 4,
            climate: ClimateSettings::default(),
            terrain: TerrainSettings::default(),
            huts: 15,
            resources: 100,
            islands: IslandSettings::default(),
            postprocess: PostProcessSettings::default(),
        }
    }
}

/// Доли типов местности, выведенные из параметров
///
/// Все значения — проценты от пула нераспределённых клеток суши в момент,
/// когда соответствующий этап их расходует.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TerrainPercents {
    pub polar: i32,
    pub mountain: f32,
    pub forest: f32,
    pub jungle: f32,
    pub swamp: f32,
    pub desert: f32,
    pub river: f32,
}

impl TerrainPercents {
    /// Выводит доли из суши, крутизны, влажности и температуры
    #[must_use]
    pub fn derive(params: &WorldGenerationParams, levels: &ClimateLevels) -> Self {
        let land = params.terrain.landmass as i32;
        let steepness = params.terrain.steepness as f32;
        let wetness = params.climate.wetness as i32;
        let temperature = params.climate.temperature as f32;

        let polar = 2 * levels.ice_base * land / MAX_COLATITUDE;
        let factor = (100.0 - polar as f32 - steepness * 0.8) / 10000.0;

        let mut percents = Self {
            polar,
            mountain: factor * steepness * 90.0,
            forest: factor * (wetness as f32 * 60.0 + 1000.0),
            jungle: 0.0,
            swamp: factor * (wetness as f32 * 6.0 + temperature * 6.0),
            desert: factor * (temperature * 10.0 + (100 - wetness) as f32 * 10.0),
            river: ((100 - polar) * (3 + wetness / 12) / 100) as f32,
        };

        if let Some(overrides) = params.terrain.overrides {
            percents.mountain = overrides.mountain;
            percents.forest = overrides.forest;
            percents.swamp = overrides.swamp;
            percents.desert = overrides.desert;
            percents.river = overrides.river;
        }

        // Джунгли — тропическая часть общей растительности
        percents.jungle = percents.forest * (MAX_COLATITUDE - levels.tropical) as f32
            / (MAX_COLATITUDE * 2) as f32;
        percents.forest -= percents.jungle;
        percents
    }

    /// Делитель для бюджетов биомов: горы уже забрали свою долю
    #[must_use]
    pub fn non_mountain_share(&self) -> f32 {
        (100.0 - self.mountain).max(1.0)
    }

    /// Суммарная доля растительности до выделения джунглей
    #[must_use]
    pub fn forest_total(&self) -> f32 {
        self.forest + self.jungle
    }
}
