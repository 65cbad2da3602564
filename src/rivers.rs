//! Реки
//!
//! Река растёт от истока по кардинальным соседям. На каждом шаге кандидаты
//! проходят цепочку оценок: после каждой остаются только лучшие. Роковые
//! оценки обрывают попытку, если даже лучший кандидат плох. Река заканчивается
//! у моря, у другой реки или на холодном леднике; удачный путь переносится на
//! карту целиком, неудачный бесследно сбрасывается.

use crate::climate::TemperatureBand;
use crate::context::{GenContext, RiverScratch, Scope};
use crate::grid::TileGrid;
use crate::terrain::{Specials, Terrain};

/// Предел попыток проложить реку на всей карте
pub const RIVERS_MAXTRIES: u32 = 32767;

/// Делитель в формуле желаемой длины рек
const RIVER_LENGTH_DIVISOR: f32 = 5325.0;

/// Оценка направления. Меньше — лучше, 0 — идеально.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiverTest {
    /// Клетка занята этой же попыткой или зажата со всех сторон
    Blocked,
    /// Река образовала бы сетку из четырёх клеток
    RiverGrid,
    Highlands,
    AdjacentOcean,
    AdjacentRiver,
    AdjacentHighlands,
    Swamp,
    AdjacentSwamp,
    HeightMap,
}

impl RiverTest {
    /// Порядок применения оценок
    pub const ORDER: [RiverTest; 9] = [
        RiverTest::Blocked,
        RiverTest::RiverGrid,
        RiverTest::Highlands,
        RiverTest::AdjacentOcean,
        RiverTest::AdjacentRiver,
        RiverTest::AdjacentHighlands,
        RiverTest::Swamp,
        RiverTest::AdjacentSwamp,
        RiverTest::HeightMap,
    ];

    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, RiverTest::Blocked | RiverTest::RiverGrid)
    }

    #[must_use]
    pub fn score(self, grid: &TileGrid, scratch: &RiverScratch, idx: usize) -> i32 {
        let tile = &grid.tiles[idx];
        match self {
            RiverTest::Blocked => {
                let boxed_in = grid.cardinal(idx).all(|n| scratch.is_blocked(n));
                i32::from(scratch.is_blocked(idx) || boxed_in)
            }
            RiverTest::RiverGrid => {
                i32::from(grid.count_near(idx, true, |t| t.has(Specials::RIVER)) > 1)
            }
            RiverTest::Highlands => tile.terrain.mountainous(),
            RiverTest::AdjacentOcean => 100 - grid.percent_near(idx, true, |t| t.is_water()),
            RiverTest::AdjacentRiver => {
                100 - grid.percent_near(idx, true, |t| t.has(Specials::RIVER))
            }
            RiverTest::AdjacentHighlands => {
                grid.percent_near(idx, true, |t| t.terrain.mountainous() > 0)
            }
            RiverTest::Swamp => tile.terrain.wetness(),
            RiverTest::AdjacentSwamp => grid.percent_near(idx, true, |t| t.terrain.wetness() > 0),
            RiverTest::HeightMap => tile.elevation,
        }
    }
}

/// Дошла ли река до конца
fn is_river_end(grid: &TileGrid, ctx: &GenContext, idx: usize) -> bool {
    let tile = &grid.tiles[idx];
    grid.cardinal(idx)
        .any(|n| grid.tiles[n].is_water() || grid.tiles[n].has(Specials::RIVER))
        || (tile.terrain == Terrain::Glacier
            && (ctx.climate.warmth(grid, idx) as f32) < 0.8 * ctx.climate.cold as f32)
}

/// Прокладывает одну реку от `spring`. Возвращает длину, если река удалась.
pub fn make_river(grid: &mut TileGrid, ctx: &mut GenContext, spring: usize) -> Option<usize> {
    ctx.rivers.reset();
    let mut current = spring;

    loop {
        ctx.rivers.mark_path(current);
        if is_river_end(grid, ctx, current) {
            break;
        }

        // Порядок С, В, Ю, З фиксирован, случайность только при ничьей
        let mut candidates: Vec<usize> = grid.cardinal(current).collect();
        for test in RiverTest::ORDER {
            let scores: Vec<i32> = candidates
                .iter()
                .map(|&n| test.score(grid, &ctx.rivers, n))
                .collect();
            let best = *scores.iter().min()?;
            if test.is_fatal() && best > 0 {
                return None;
            }
            candidates = candidates
                .into_iter()
                .zip(scores)
                .filter_map(|(n, score)| (score == best).then_some(n))
                .collect();
        }
        if candidates.is_empty() {
            return None;
        }
        let next = candidates[ctx.rand(candidates.len() as i32) as usize];

        ctx.rivers.block(current);
        for n in grid.cardinal(current) {
            ctx.rivers.block(n);
        }
        current = next;
    }

    for &idx in ctx.rivers.path() {
        grid.tiles[idx].specials.insert(Specials::RIVER);
    }
    Some(ctx.rivers.path().len())
}

/// Можно ли начать реку с клетки на итерации `iter` из `max_tries`.
/// Чем больше попыток потрачено, тем меньше ограничений.
fn spring_allowed(grid: &TileGrid, idx: usize, iter: u32, max_tries: u32) -> bool {
    let tile = &grid.tiles[idx];
    let after = |tenths: u32| iter >= max_tries / 10 * tenths;

    !tile.is_water()
        && !tile.has(Specials::RIVER)
        && grid.count_near(idx, true, |t| t.has(Specials::RIVER) || t.is_water()) <= 1
        && (grid.percent_near(idx, true, |t| t.terrain.mountainous() > 0) < 90 || after(5))
        && (tile.terrain != Terrain::Hills || after(6))
        && (tile.terrain != Terrain::Mountains || after(7))
        && (tile.terrain != Terrain::Glacier || after(8))
        && (tile.terrain != Terrain::Desert || after(9))
}

/// Прокладывает реки в области, пока их суммарная длина меньше `target`.
/// Возвращает фактическую длину.
pub fn make_rivers_in(
    grid: &mut TileGrid,
    ctx: &mut GenContext,
    scope: Scope,
    target: usize,
    max_tries: u32,
) -> usize {
    let low = ctx.levels.low();
    let springs: Vec<usize> = (0..grid.len())
        .filter(|&idx| {
            let tile = &grid.tiles[idx];
            scope.contains(grid, idx)
                && tile.terrain.is_land()
                && !tile.has(Specials::RIVER)
                && tile.band != TemperatureBand::Frozen
                && tile.elevation >= low
        })
        .collect();
    if springs.is_empty() {
        return 0;
    }

    let mut length = 0;
    let mut iter = 0;
    while length < target && iter < max_tries {
        let spring = springs[ctx.rand(springs.len() as i32) as usize];
        if spring_allowed(grid, spring, iter, max_tries) {
            if let Some(n) = make_river(grid, ctx, spring) {
                tracing::trace!(spring, length = n, "река проложена");
                length += n;
            }
        }
        iter += 1;
    }
    ctx.rivers.reset();
    length
}

/// Желаемая длина рек на всей карте
#[must_use]
pub fn desired_river_length(river_percent: f32, tiles: usize, landmass: u32) -> usize {
    (river_percent * tiles as f32 * landmass as f32 / RIVER_LENGTH_DIVISOR).max(0.0) as usize
}

/// Прокладывает реки по всей карте
pub fn make_rivers(grid: &mut TileGrid, ctx: &mut GenContext, landmass: u32) -> usize {
    let target = desired_river_length(ctx.percents.river, grid.len(), landmass);
    let length = make_rivers_in(grid, ctx, Scope::World, target, RIVERS_MAXTRIES);

    if length < target {
        tracing::warn!(target, length, "реки короче желаемого");
    } else {
        tracing::debug!(target, length, "реки проложены");
    }
    length
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Topology, WorldGenerationParams};

    /// Суша с кольцом воды по краю и уклоном на восток
    fn setup(width: u32, height: u32) -> (TileGrid, GenContext) {
        let params = WorldGenerationParams {
            width,
            height,
            ..WorldGenerationParams::default()
        };
        let mut grid = TileGrid::new(
            width,
            height,
            Topology {
                wrap_x: false,
                wrap_y: false,
            },
            Terrain::Grassland,
        );
        for tile in &mut grid.tiles {
            if tile.x == 0 || tile.y == 0 || tile.x == width - 1 || tile.y == height - 1 {
                tile.terrain = Terrain::Ocean;
            }
            tile.elevation = 990 - 5 * tile.x as i32;
        }
        let ctx = GenContext::new(&params).unwrap();
        (grid, ctx)
    }

    fn river_tiles_are_connected(grid: &TileGrid, ctx: &GenContext) -> bool {
        (0..grid.len())
            .filter(|&idx| grid.tiles[idx].has(Specials::RIVER))
            .all(|idx| {
                grid.cardinal(idx)
                    .any(|n| grid.tiles[n].is_water() || grid.tiles[n].has(Specials::RIVER))
                    || is_river_end(grid, ctx, idx)
            })
    }

    #[test]
    fn test_order_and_fatality() {
        assert_eq!(RiverTest::ORDER[0], RiverTest::Blocked);
        assert_eq!(RiverTest::ORDER[8], RiverTest::HeightMap);
        let fatal: Vec<_> = RiverTest::ORDER.iter().filter(|t| t.is_fatal()).collect();
        assert_eq!(fatal, [&RiverTest::Blocked, &RiverTest::RiverGrid]);
    }

    #[test]
    fn test_scores() {
        let (mut grid, ctx) = setup(8, 8);
        let idx = grid.index(1, 3);
        // Запад — вода
        assert_eq!(RiverTest::AdjacentOcean.score(&grid, &ctx.rivers, idx), 75);
        assert_eq!(RiverTest::HeightMap.score(&grid, &ctx.rivers, idx), 985);

        grid.tiles[idx].terrain = Terrain::Mountains;
        assert_eq!(RiverTest::Highlands.score(&grid, &ctx.rivers, idx), 100);
        let right = grid.index(2, 3);
        assert_eq!(RiverTest::AdjacentHighlands.score(&grid, &ctx.rivers, right), 25);

        let (n, s) = (grid.index(2, 2), grid.index(2, 4));
        grid.tiles[n].specials.insert(Specials::RIVER);
        assert_eq!(RiverTest::RiverGrid.score(&grid, &ctx.rivers, right), 0);
        grid.tiles[s].specials.insert(Specials::RIVER);
        assert_eq!(RiverTest::RiverGrid.score(&grid, &ctx.rivers, right), 1);
        assert_eq!(RiverTest::AdjacentRiver.score(&grid, &ctx.rivers, right), 50);
    }

    #[test]
    fn test_blocked_score() {
        let (grid, mut ctx) = setup(8, 8);
        let idx = grid.index(3, 3);
        assert_eq!(RiverTest::Blocked.score(&grid, &ctx.rivers, idx), 0);
        ctx.rivers.block(idx);
        assert_eq!(RiverTest::Blocked.score(&grid, &ctx.rivers, idx), 1);
        ctx.rivers.reset();
        for n in grid.cardinal(idx).collect::<Vec<_>>() {
            ctx.rivers.block(n);
        }
        assert_eq!(RiverTest::Blocked.score(&grid, &ctx.rivers, idx), 1);
    }

    #[test]
    fn test_river_follows_slope_to_sea() {
        let (mut grid, mut ctx) = setup(10, 5);
        // Вода только в восточном столбце
        for tile in &mut grid.tiles {
            tile.terrain = if tile.x == 9 {
                Terrain::Ocean
            } else {
                Terrain::Grassland
            };
        }
        let spring = grid.index(2, 2);
        let length = make_river(&mut grid, &mut ctx, spring);
        // Прямо на восток до клетки у воды в x = 8
        assert_eq!(length, Some(7));
        for x in 2..=8 {
            assert!(grid.get(x, 2).has(Specials::RIVER));
        }
        assert!(!grid.get(2, 1).has(Specials::RIVER));
        assert!(river_tiles_are_connected(&grid, &ctx));
    }

    #[test]
    fn test_glacier_near_pole_ends_river() {
        let (mut grid, mut ctx) = setup(10, 20);
        for tile in &mut grid.tiles {
            tile.terrain = Terrain::Grassland;
        }
        // Ближе к экватору ледник не конец, а воды и рек нет вовсе
        let temperate = grid.index(4, 5);
        grid.tiles[temperate].terrain = Terrain::Glacier;
        assert_eq!(make_river(&mut grid, &mut ctx, temperate), None);
        assert!(!grid.tiles[temperate].has(Specials::RIVER));

        // Ряд 0: теплота 50 < 0.8 × 171
        let polar = grid.index(4, 0);
        grid.tiles[polar].terrain = Terrain::Glacier;
        assert_eq!(make_river(&mut grid, &mut ctx, polar), Some(1));
        assert!(grid.tiles[polar].has(Specials::RIVER));
    }

    #[test]
    fn test_make_rivers_reaches_target() {
        let (mut grid, mut ctx) = setup(20, 20);
        let length = make_rivers_in(&mut grid, &mut ctx, Scope::World, 10, 1000);
        assert!(length >= 10);
        assert_eq!(grid.count_special(Specials::RIVER), length);
        assert!(river_tiles_are_connected(&grid, &ctx));
    }

    #[test]
    fn test_frozen_tiles_are_not_springs() {
        let (mut grid, mut ctx) = setup(12, 12);
        for tile in &mut grid.tiles {
            tile.band = TemperatureBand::Frozen;
        }
        assert_eq!(make_rivers_in(&mut grid, &mut ctx, Scope::World, 10, 500), 0);
        assert_eq!(grid.count_special(Specials::RIVER), 0);
    }

    #[test]
    fn test_desired_length() {
        assert_eq!(desired_river_length(6.0, 4000, 30), 135);
        assert_eq!(desired_river_length(0.0, 4000, 30), 0);
    }
}
