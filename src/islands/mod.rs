//! Островной распределитель
//!
//! Суша раскладывается островами заданной массы: каждый остров растёт маской
//! в центре карты, переносится в свободное море так, чтобы не касаться других
//! островов даже по диагонали, и сразу заполняется местностью и реками.
//! Не поместившийся остров уменьшается по клетке, пока не станет слишком мал.

mod fill;
pub(crate) mod plan;
mod shape;

pub use fill::{FillPass, TerrainChoice, take_quota};
pub use plan::{IslandReport, generate_islands};
pub use shape::{Rect, create_island};

use crate::context::GenContext;
use crate::grid::{RegionId, TileGrid};

/// Состояние раскладки островов одного прохода
#[derive(Debug, Clone)]
pub struct IslandState {
    /// Номер текущего острова (он же номер его региона)
    pub index: i32,
    /// Прямоугольник роста / положения текущего острова
    pub rect: Rect,
    /// Общая масса суши
    pub total_mass: i64,
    /// Сколько массы ещё не поставлено
    pub check_mass: i64,
    balance: i64,
    last_placed: i64,
    tile_factor: f32,
}

impl IslandState {
    /// Начинает раскладку: сбрасывает остатки по типам местности
    pub fn new(total_mass: i64, ctx: &mut GenContext) -> Self {
        let p = ctx.percents;
        let sum = p.river + p.mountain + p.desert + p.forest_total() + p.swamp;
        let divisor = if sum <= 90.0 { 100.0 } else { sum * 1.1 };
        ctx.buckets.reset(total_mass, &mut ctx.rng);

        if total_mass > 3000 {
            tracing::info!(total_mass, "большая масса суши, раскладка займёт время");
        }

        Self {
            index: 1,
            rect: Rect::default(),
            total_mass,
            check_mass: total_mass,
            balance: 0,
            last_placed: total_mass,
            tile_factor: total_mass as f32 / divisor,
        }
    }

    #[must_use]
    pub fn region(&self) -> RegionId {
        RegionId(self.index)
    }

    /// Сколько островов уже поставлено
    #[must_use]
    pub fn placed_islands(&self) -> usize {
        (self.index - 1).max(0) as usize
    }

    /// Случайная клетка в прямоугольнике текущего острова
    pub fn random_position(&self, grid: &TileGrid, ctx: &mut GenContext) -> Option<usize> {
        let r = self.rect;
        if r.width() <= 0 || r.height() <= 0 {
            return None;
        }
        let x = r.w + ctx.rand(r.width());
        let y = r.n + ctx.rand(r.height());
        grid.normalize(x, y)
    }

    /// Ограничивает запрошенную массу тем, что реально можно поставить
    fn corrected_mass(&self, mass: i64, grid: &TileGrid) -> i64 {
        let (w, h) = (i64::from(grid.width), i64::from(grid.height));
        (mass - self.balance)
            .min(self.last_placed + 1 + self.last_placed / 50)
            .min((h - 6) * (h - 6))
            .min((w - 2) * (w - 2))
    }
}

/// Ставит и заполняет один остров.
///
/// Масса поправляется на недобор прошлых островов. Если остров не помещается,
/// он уменьшается на клетку, пока не станет меньше `min_percent` % от
/// поправленной массы. Поставленный остров никогда не меньше этой доли.
/// Возвращает число поставленных клеток.
pub fn make_island(
    grid: &mut TileGrid,
    ctx: &mut GenContext,
    state: &mut IslandState,
    mass: i64,
    starters: u32,
    min_percent: u32,
) -> Option<usize> {
    let mass = state.corrected_mass(mass, grid);
    if mass <= 0 {
        return None;
    }
    let floor = mass * i64::from(min_percent) / 100;
    let min_mass = floor.max(1);

    let mut size = mass;
    let placed = loop {
        if let Some(count) = create_island(grid, ctx, state, size, min_mass) {
            break count;
        }
        if size <= floor || size <= 1 {
            tracing::debug!(island = state.index, mass, "остров не поместился");
            return None;
        }
        size -= 1;
    };

    let placed_mass = placed as i64;
    state.last_placed = placed_mass;
    state.balance = if placed_mass * 10 > mass {
        placed_mass - mass
    } else {
        0
    };
    tracing::debug!(
        island = state.index,
        starters,
        requested = mass,
        placed,
        balance = state.balance,
        left = state.check_mass,
        "остров поставлен"
    );

    let scaled = placed as f32 * state.tile_factor;
    let p = ctx.percents;
    let capacity = state.total_mass;

    ctx.buckets.mountain += (p.mountain * scaled) as i64;
    if let Some(quota) = take_quota(&mut ctx.buckets.mountain, capacity) {
        fill::fill_island(grid, ctx, state, &fill::MOUNTAINS, quota);
    }
    ctx.buckets.forest += (p.forest_total() * scaled) as i64;
    if let Some(quota) = take_quota(&mut ctx.buckets.forest, capacity) {
        fill::fill_island(grid, ctx, state, &fill::FOREST, quota);
    }
    ctx.buckets.desert += (p.desert * scaled) as i64;
    if let Some(quota) = take_quota(&mut ctx.buckets.desert, capacity) {
        fill::fill_island(grid, ctx, state, &fill::DESERT, quota);
    }
    ctx.buckets.swamp += (p.swamp * scaled) as i64;
    if let Some(quota) = take_quota(&mut ctx.buckets.swamp, capacity) {
        fill::fill_island(grid, ctx, state, &fill::SWAMP, quota);
    }
    ctx.buckets.river += (p.river * scaled) as i64;
    if let Some(quota) = take_quota(&mut ctx.buckets.river, capacity) {
        fill::fill_island_rivers(grid, ctx, state, quota);
    }

    state.index += 1;
    Some(placed)
}
