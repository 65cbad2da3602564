//! Контекст одного прохода генерации
//!
//! Всё временное состояние (ГСЧ, карта размещённых клеток, буферы высот, рек и
//! массы острова, остатки по биомам) живёт здесь и передаётся этапам по ссылке.
//! Контекст создаётся в начале прохода и уничтожается в конце.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::climate::ClimateLevels;
use crate::config::{TerrainPercents, WorldGenerationParams};
use crate::error::GenError;
use crate::grid::{RegionId, TileGrid};
use crate::heightmap::{HMAP_MAX_LEVEL, Heightmap};

/// Выделяет буфер заданной длины, не паникуя при нехватке памяти
pub fn scratch<T: Clone>(len: usize, value: T) -> Result<Vec<T>, GenError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)?;
    buf.resize(len, value);
    Ok(buf)
}

/// Уровни высот, от которых зависят суша, холмы и «низины»
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightLevels {
    pub shore: i32,
    pub mountain: i32,
}

impl HeightLevels {
    #[must_use]
    pub fn new(landmass: u32, steepness: u32) -> Self {
        let shore = HMAP_MAX_LEVEL * (100 - landmass as i32) / 100;
        let mountain = (HMAP_MAX_LEVEL - shore) * (100 - steepness as i32) / 100 + shore;
        Self { shore, mountain }
    }

    /// Уровни островной карты: высота острова отсчитывается от его берега
    #[must_use]
    pub fn for_islands(steepness: u32) -> Self {
        Self {
            shore: 0,
            mountain: HMAP_MAX_LEVEL * (100 - steepness as i32) / 100,
        }
    }

    /// Порог «низины» — середина между берегом и горами
    #[must_use]
    pub fn low(&self) -> i32 {
        (self.mountain + self.shore) / 2
    }
}

/// Отметки «уже размещено» для клеток
#[derive(Debug, Clone)]
pub struct PlacedMap(Vec<bool>);

impl PlacedMap {
    pub fn new(len: usize) -> Result<Self, GenError> {
        Ok(Self(scratch(len, false)?))
    }

    #[must_use]
    pub fn is_placed(&self, idx: usize) -> bool {
        self.0[idx]
    }

    pub fn set(&mut self, idx: usize) {
        self.0[idx] = true;
    }

    pub fn unset(&mut self, idx: usize) {
        self.0[idx] = false;
    }

    /// Вся вода считается размещённой
    pub fn mark_water(&mut self, grid: &TileGrid) {
        for (placed, tile) in self.0.iter_mut().zip(&grid.tiles) {
            if tile.is_water() {
                *placed = true;
            }
        }
    }

    #[must_use]
    pub fn unplaced_count(&self) -> usize {
        self.0.iter().filter(|&&p| !p).count()
    }
}

/// Буферы одной попытки проложить реку
#[derive(Debug, Clone)]
pub struct RiverScratch {
    blocked: Vec<bool>,
    path: Vec<bool>,
    touched: Vec<usize>,
    order: Vec<usize>,
}

impl RiverScratch {
    pub fn new(len: usize) -> Result<Self, GenError> {
        Ok(Self {
            blocked: scratch(len, false)?,
            path: scratch(len, false)?,
            touched: Vec::new(),
            order: Vec::new(),
        })
    }

    /// Сбрасывает только то, что трогала прошлая попытка
    pub fn reset(&mut self) {
        for &idx in &self.touched {
            self.blocked[idx] = false;
            self.path[idx] = false;
        }
        self.touched.clear();
        self.order.clear();
    }

    #[must_use]
    pub fn is_blocked(&self, idx: usize) -> bool {
        self.blocked[idx]
    }

    pub fn block(&mut self, idx: usize) {
        self.blocked[idx] = true;
        self.touched.push(idx);
    }

    pub fn mark_path(&mut self, idx: usize) {
        if !self.path[idx] {
            self.path[idx] = true;
            self.order.push(idx);
            self.touched.push(idx);
        }
    }

    /// Клетки текущей попытки в порядке прохождения
    #[must_use]
    pub fn path(&self) -> &[usize] {
        &self.order
    }
}

/// Остатки по типам местности, переносимые между островами
///
/// Начинаются со случайного отрицательного значения, чтобы округление не
/// накапливалось на первых островах.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerrainBuckets {
    pub river: i64,
    pub mountain: i64,
    pub desert: i64,
    pub forest: i64,
    pub swamp: i64,
}

impl TerrainBuckets {
    pub fn reset(&mut self, total_mass: i64, rng: &mut ChaCha8Rng) {
        let mass = total_mass.max(1);
        self.river = -rng.gen_range(0..mass);
        self.mountain = -rng.gen_range(0..mass);
        self.desert = -rng.gen_range(0..mass);
        self.forest = -rng.gen_range(0..mass);
        self.swamp = -rng.gen_range(0..mass);
    }
}

/// Ограничение области работы этапа
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Вся карта
    World,
    /// Только клетки одного региона (острова)
    Region(RegionId),
}

impl Scope {
    #[must_use]
    pub fn contains(self, grid: &TileGrid, idx: usize) -> bool {
        match self {
            Scope::World => true,
            Scope::Region(region) => grid.tiles[idx].region == region,
        }
    }
}

/// Временное состояние прохода генерации
#[derive(Debug)]
pub struct GenContext {
    pub rng: ChaCha8Rng,
    pub placed: PlacedMap,
    pub heights: Heightmap,
    /// Маска формы растущего острова
    pub island_mass: Vec<bool>,
    pub rivers: RiverScratch,
    pub buckets: TerrainBuckets,
    pub climate: ClimateLevels,
    pub percents: TerrainPercents,
    pub levels: HeightLevels,
}

impl GenContext {
    pub fn new(params: &WorldGenerationParams) -> Result<Self, GenError> {
        let len = params.tile_count();
        let climate = ClimateLevels::new(&params.climate);
        let mut heights = Heightmap {
            width: params.width,
            height: params.height,
            data: Vec::new(),
        };
        heights.data = scratch(len, 0)?;

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(params.seed),
            placed: PlacedMap::new(len)?,
            heights,
            island_mass: scratch(len, false)?,
            rivers: RiverScratch::new(len)?,
            buckets: TerrainBuckets::default(),
            climate,
            percents: TerrainPercents::derive(params, &climate),
            levels: HeightLevels::new(params.terrain.landmass, params.terrain.steepness),
        })
    }

    /// Случайное число в `0..n` (`n` > 0)
    pub fn rand(&mut self, n: i32) -> i32 {
        self.rng.gen_range(0..n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_levels() {
        let levels = HeightLevels::new(30, 30);
        assert_eq!(levels.shore, 700);
        assert_eq!(levels.mountain, 910);
        assert_eq!(levels.low(), 805);

        let islands = HeightLevels::for_islands(30);
        assert_eq!(islands.shore, 0);
        assert_eq!(islands.mountain, 700);
        assert_eq!(islands.low(), 350);
    }

    #[test]
    fn test_river_scratch_reset_clears_touched() {
        let mut scratch = RiverScratch::new(10).unwrap();
        scratch.mark_path(3);
        scratch.mark_path(3);
        scratch.block(4);
        assert_eq!(scratch.path(), &[3]);
        assert!(scratch.is_blocked(4));
        scratch.reset();
        assert!(scratch.path().is_empty());
        assert!(!scratch.is_blocked(4));
    }

    #[test]
    fn test_buckets_start_negative() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut buckets = TerrainBuckets::default();
        buckets.reset(500, &mut rng);
        for b in [
            buckets.river,
            buckets.mountain,
            buckets.desert,
            buckets.forest,
            buckets.swamp,
        ] {
            assert!((-499..=0).contains(&b));
        }
    }

    #[test]
    fn test_context_scratch_sized_to_map() {
        let params = WorldGenerationParams {
            width: 12,
            height: 10,
            ..WorldGenerationParams::default()
        };
        let ctx = GenContext::new(&params).unwrap();
        assert_eq!(ctx.heights.data.len(), 120);
        assert_eq!(ctx.island_mass.len(), 120);
        assert_eq!(ctx.placed.unplaced_count(), 120);
    }
}
