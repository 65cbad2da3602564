//! Распределение биомов по суше
//!
//! Каждый тип местности получает бюджет клеток. Бюджеты тратятся раундами:
//! случайная подходящая клетка становится семенем пятна, которое растёт по
//! кардинальным соседям, пока позволяют бюджет, климат и перепад высот.
//! Неизрасходованный бюджет переходит к запасному типу, остаток — равнинам.

use rand::seq::SliceRandom;

use crate::climate::{MiscCondition, TempCondition, TemperatureBand, WetCondition, test_wetness};
use crate::context::{GenContext, Scope};
use crate::grid::TileGrid;
use crate::terrain::Terrain;

/// Шаг широты, дающий единицу «разницы» при росте пятна
const L_UNIT: i32 = 25;
/// Шаг высоты, дающий единицу «разницы»
const H_UNIT: i32 = 50;

/// Условия, при которых клетка подходит для типа местности
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementRule {
    pub temp: TempCondition,
    pub wet: WetCondition,
    pub misc: MiscCondition,
}

impl PlacementRule {
    pub const ANY: PlacementRule = PlacementRule::new(
        TempCondition::ALL,
        WetCondition::All,
        MiscCondition::None,
    );

    #[must_use]
    pub const fn new(temp: TempCondition, wet: WetCondition, misc: MiscCondition) -> Self {
        Self { temp, wet, misc }
    }

    #[must_use]
    pub fn allows(&self, grid: &TileGrid, ctx: &GenContext, idx: usize) -> bool {
        let tile = &grid.tiles[idx];
        if !self.temp.allows(tile.band) {
            return false;
        }
        let low = tile.elevation < ctx.levels.low();
        let misc_ok = match self.misc {
            MiscCondition::None => true,
            MiscCondition::Low => low,
            MiscCondition::NotLow => !low,
        };
        misc_ok && test_wetness(grid, idx, self.wet)
    }
}

const FOREST_RULE: PlacementRule =
    PlacementRule::new(TempCondition::NFROZEN, WetCondition::All, MiscCondition::None);
const JUNGLE_RULE: PlacementRule =
    PlacementRule::new(TempCondition::TROPICAL, WetCondition::All, MiscCondition::None);
const SWAMP_RULE: PlacementRule =
    PlacementRule::new(TempCondition::HOT, WetCondition::NotDry, MiscCondition::Low);
const DESERT_RULE: PlacementRule =
    PlacementRule::new(TempCondition::NFROZEN, WetCondition::Dry, MiscCondition::NotLow);
const ALT_DESERT_RULE: PlacementRule =
    PlacementRule::new(TempCondition::NFROZEN, WetCondition::All, MiscCondition::NotLow);

fn is_free_land(grid: &TileGrid, ctx: &GenContext, idx: usize, scope: Scope) -> bool {
    grid.tiles[idx].terrain.is_land() && !ctx.placed.is_placed(idx) && scope.contains(grid, idx)
}

/// Случайная неразмещённая клетка суши, подходящая под правило
pub fn random_unplaced(
    grid: &TileGrid,
    ctx: &mut GenContext,
    rule: PlacementRule,
    scope: Scope,
) -> Option<usize> {
    let candidates: Vec<usize> = (0..grid.len())
        .filter(|&idx| is_free_land(grid, ctx, idx, scope) && rule.allows(grid, ctx, idx))
        .collect();
    candidates.choose(&mut ctx.rng).copied()
}

/// Выращивает пятно местности из `seed`.
///
/// `diff` — запас «разницы»: каждый шаг к соседу тратит единицу плюс перепад
/// широты и высоты. Рост идёт в глубину: следующий сосед клетки проверяется
/// только после того, как выросло всё поддерево предыдущего. Рост
/// останавливается, когда `remaining` доходит до нуля.
/// Возвращает число поставленных клеток.
#[allow(clippy::too_many_arguments)]
pub fn grow_patch(
    grid: &mut TileGrid,
    ctx: &mut GenContext,
    seed: usize,
    terrain: Terrain,
    diff: i32,
    remaining: &mut i64,
    rule: PlacementRule,
    scope: Scope,
) -> usize {
    let mut place = |grid: &mut TileGrid, ctx: &mut GenContext, idx: usize| -> bool {
        if *remaining <= 0 {
            return false;
        }
        grid.tiles[idx].terrain = terrain;
        ctx.placed.set(idx);
        *remaining -= 1;
        true
    };

    if !place(grid, ctx, seed) {
        return 0;
    }
    let mut placed = 1;
    // Кадр: клетка, её запас и номер следующего соседа для проверки
    let mut stack = vec![(seed, diff, 0)];

    while let Some(&(idx, diff, next)) = stack.last() {
        let Some(n) = grid.cardinal(idx).nth(next) else {
            stack.pop();
            continue;
        };
        if let Some(top) = stack.last_mut() {
            top.2 += 1;
        }

        let delta = (ctx.climate.colatitude(grid, n) - ctx.climate.colatitude(grid, idx)).abs()
            / L_UNIT
            + (grid.tiles[n].elevation - grid.tiles[idx].elevation).abs() / H_UNIT;
        if is_free_land(grid, ctx, n, scope)
            && rule.allows(grid, ctx, n)
            && delta < diff
            && ctx.rand(10) > 4
            && place(grid, ctx, n)
        {
            placed += 1;
            stack.push((n, diff - 1 - delta, 0));
        }
    }
    placed
}

/// Равнина по поясу: лёд, тундра или луга/равнины пополам
pub fn make_plain(grid: &mut TileGrid, ctx: &mut GenContext, idx: usize) {
    let terrain = match grid.tiles[idx].band {
        TemperatureBand::Frozen => Terrain::Glacier,
        TemperatureBand::Cold => Terrain::Tundra,
        TemperatureBand::Temperate | TemperatureBand::Tropical => {
            if ctx.rand(10) > 4 {
                Terrain::Grassland
            } else {
                Terrain::Plains
            }
        }
    };
    grid.tiles[idx].terrain = terrain;
    ctx.placed.set(idx);
}

/// Превращает в равнины всю неразмещённую сушу области
pub fn make_plains(grid: &mut TileGrid, ctx: &mut GenContext, scope: Scope) -> usize {
    let mut count = 0;
    for idx in 0..grid.len() {
        if is_free_land(grid, ctx, idx, scope) {
            make_plain(grid, ctx, idx);
            count += 1;
        }
    }
    count
}

/// Местность по умолчанию для клетки, не получившей биом
#[must_use]
pub fn default_for_band(band: TemperatureBand) -> Terrain {
    match band {
        TemperatureBand::Frozen => Terrain::Glacier,
        TemperatureBand::Cold => Terrain::Tundra,
        TemperatureBand::Temperate => Terrain::Grassland,
        TemperatureBand::Tropical => Terrain::Plains,
    }
}

/// Бюджеты клеток по типам местности
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BiomeBudgets {
    pub forest: i64,
    pub jungle: i64,
    pub swamp: i64,
    pub desert: i64,
    pub alt_desert: i64,
    pub plains: i64,
}

impl BiomeBudgets {
    /// Делит `total` клеток по долям; равнины забирают остаток
    #[must_use]
    pub fn new(total: i64, ctx: &GenContext) -> Self {
        let p = &ctx.percents;
        let share = p.non_mountain_share();
        let mut left = total;
        let mut claim = |pct: f32| -> i64 {
            let want = (total as f32 * pct / share) as i64;
            let n = want.clamp(0, left);
            left -= n;
            n
        };
        let forest = claim(p.forest);
        let jungle = claim(p.jungle);
        let swamp = claim(p.swamp);
        let desert = claim(p.desert);
        Self {
            forest,
            jungle,
            swamp,
            desert,
            alt_desert: 0,
            plains: left,
        }
    }

    #[must_use]
    pub fn sum(&self) -> i64 {
        self.forest + self.jungle + self.swamp + self.desert + self.alt_desert + self.plains
    }

    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.sum() == 0
    }
}

/// Один раунд для одного бюджета: пятно или перенос бюджета в запасной
fn place_one_type(
    grid: &mut TileGrid,
    ctx: &mut GenContext,
    count: &mut i64,
    fallback: &mut i64,
    terrain: Terrain,
    rule: PlacementRule,
    weight: i32,
) {
    if *count <= 0 {
        return;
    }
    match random_unplaced(grid, ctx, rule, Scope::World) {
        Some(seed) => {
            grow_patch(grid, ctx, seed, terrain, weight, count, rule, Scope::World);
        }
        None => {
            *fallback += *count;
            *count = 0;
        }
    }
}

/// Раскладывает биомы по всей неразмещённой суше
pub fn make_terrains(grid: &mut TileGrid, ctx: &mut GenContext) -> BiomeBudgets {
    let total = (0..grid.len())
        .filter(|&idx| is_free_land(grid, ctx, idx, Scope::World))
        .count() as i64;
    let initial = BiomeBudgets::new(total, ctx);
    let mut b = initial;
    let no_forest = ctx.percents.forest_total() <= 0.0;

    tracing::debug!(
        total,
        forest = b.forest,
        jungle = b.jungle,
        swamp = b.swamp,
        desert = b.desert,
        plains = b.plains,
        "бюджеты биомов"
    );

    while !b.is_spent() {
        place_one_type(grid, ctx, &mut b.forest, &mut b.plains, Terrain::Forest, FOREST_RULE, 60);

        let jungle_fallback = if no_forest { &mut b.plains } else { &mut b.forest };
        place_one_type(grid, ctx, &mut b.jungle, jungle_fallback, Terrain::Jungle, JUNGLE_RULE, 50);

        let swamp_fallback = if no_forest { &mut b.plains } else { &mut b.forest };
        place_one_type(grid, ctx, &mut b.swamp, swamp_fallback, Terrain::Swamp, SWAMP_RULE, 50);

        place_one_type(grid, ctx, &mut b.desert, &mut b.alt_desert, Terrain::Desert, DESERT_RULE, 80);
        place_one_type(
            grid,
            ctx,
            &mut b.alt_desert,
            &mut b.plains,
            Terrain::Desert,
            ALT_DESERT_RULE,
            40,
        );

        if b.plains > 0 {
            match random_unplaced(grid, ctx, PlacementRule::ANY, Scope::World) {
                Some(idx) => {
                    make_plain(grid, ctx, idx);
                    b.plains -= 1;
                }
                None => b.plains = 0,
            }
        }
    }

    let mut defaulted = 0;
    for idx in 0..grid.len() {
        if is_free_land(grid, ctx, idx, Scope::World) {
            grid.tiles[idx].terrain = default_for_band(grid.tiles[idx].band);
            ctx.placed.set(idx);
            defaulted += 1;
        }
    }
    if defaulted > 0 {
        tracing::warn!(tiles = defaulted, "клетки без биома получили местность по поясу");
    }

    initial
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TerrainOverrides, Topology, WorldGenerationParams};

    fn setup(overrides: Option<TerrainOverrides>) -> (TileGrid, GenContext) {
        let mut params = WorldGenerationParams {
            width: 16,
            height: 16,
            ..WorldGenerationParams::default()
        };
        params.terrain.overrides = overrides;
        let mut grid = TileGrid::new(16, 16, Topology::default(), Terrain::Grassland);
        // Кольцо воды по краю, суша внутри
        for tile in &mut grid.tiles {
            if tile.x == 0 || tile.y == 0 || tile.x == 15 || tile.y == 15 {
                tile.terrain = Terrain::Ocean;
            }
            tile.elevation = 700 + (tile.x as i32 * 13 + tile.y as i32 * 7) % 200;
        }
        let mut ctx = GenContext::new(&params).unwrap();
        ctx.placed.mark_water(&grid);
        (grid, ctx)
    }

    #[test]
    fn test_budgets_sum_to_total() {
        let (_, ctx) = setup(None);
        let b = BiomeBudgets::new(500, &ctx);
        assert_eq!(b.sum(), 500);
        assert_eq!(b.alt_desert, 0);
        assert!(b.forest > 0 && b.plains > 0);
    }

    #[test]
    fn test_budgets_are_clamped() {
        let (_, ctx) = setup(Some(TerrainOverrides {
            mountain: 0.0,
            forest: 80.0,
            swamp: 50.0,
            desert: 50.0,
            river: 0.0,
        }));
        let b = BiomeBudgets::new(100, &ctx);
        assert_eq!(b.sum(), 100);
        assert_eq!(b.plains, 0);
        assert_eq!(b.desert, 0);
    }

    #[test]
    fn test_make_terrains_places_all_land() {
        let (mut grid, mut ctx) = setup(None);
        make_terrains(&mut grid, &mut ctx);
        assert_eq!(ctx.placed.unplaced_count(), 0);
        assert!(grid.tiles.iter().all(|t| t.terrain.is_known()));
    }

    #[test]
    fn test_zero_forest_means_no_forest_or_jungle() {
        let (mut grid, mut ctx) = setup(Some(TerrainOverrides {
            mountain: 10.0,
            forest: 0.0,
            swamp: 30.0,
            desert: 10.0,
            river: 0.0,
        }));
        for tile in &mut grid.tiles {
            tile.band = TemperatureBand::Tropical;
        }
        make_terrains(&mut grid, &mut ctx);
        assert_eq!(grid.count_terrain(Terrain::Forest), 0);
        assert_eq!(grid.count_terrain(Terrain::Jungle), 0);
    }

    #[test]
    fn test_patch_respects_budget() {
        let (mut grid, mut ctx) = setup(None);
        let seed = grid.index(8, 8);
        let mut remaining = 3;
        let placed = grow_patch(
            &mut grid,
            &mut ctx,
            seed,
            Terrain::Forest,
            100,
            &mut remaining,
            FOREST_RULE,
            Scope::World,
        );
        assert!(placed <= 3);
        assert_eq!(remaining, 3 - placed as i64);
        assert_eq!(grid.tiles[seed].terrain, Terrain::Forest);
    }

    #[test]
    fn test_patch_stays_in_region_scope() {
        let (mut grid, mut ctx) = setup(None);
        for tile in &mut grid.tiles {
            tile.region = crate::grid::RegionId(if tile.x < 8 { 1 } else { 2 });
        }
        let seed = grid.index(4, 8);
        let mut remaining = 1000;
        grow_patch(
            &mut grid,
            &mut ctx,
            seed,
            Terrain::Forest,
            1000,
            &mut remaining,
            PlacementRule::ANY,
            Scope::Region(crate::grid::RegionId(1)),
        );
        assert!(grid
            .tiles
            .iter()
            .filter(|t| t.terrain == Terrain::Forest)
            .all(|t| t.x < 8));
    }

    /// Рекурсивный рост: соседа проверяют, когда до него дошла очередь
    #[allow(clippy::too_many_arguments)]
    fn grow_recursive(
        grid: &mut TileGrid,
        ctx: &mut GenContext,
        idx: usize,
        terrain: Terrain,
        diff: i32,
        remaining: &mut i64,
        rule: PlacementRule,
        scope: Scope,
    ) -> usize {
        if *remaining <= 0 {
            return 0;
        }
        grid.tiles[idx].terrain = terrain;
        ctx.placed.set(idx);
        *remaining -= 1;
        let mut placed = 1;
        let neighbours: Vec<usize> = grid.cardinal(idx).collect();
        for n in neighbours {
            let delta = (ctx.climate.colatitude(grid, n) - ctx.climate.colatitude(grid, idx))
                .abs()
                / L_UNIT
                + (grid.tiles[n].elevation - grid.tiles[idx].elevation).abs() / H_UNIT;
            if is_free_land(grid, ctx, n, scope)
                && rule.allows(grid, ctx, n)
                && delta < diff
                && ctx.rand(10) > 4
            {
                placed += grow_recursive(
                    grid,
                    ctx,
                    n,
                    terrain,
                    diff - 1 - delta,
                    remaining,
                    rule,
                    scope,
                );
            }
        }
        placed
    }

    #[test]
    fn test_patch_grows_depth_first() {
        for (diff, budget) in [(3, 100), (6, 40), (12, 1000)] {
            let (mut grid, mut ctx) = setup(None);
            let (mut expected_grid, mut expected_ctx) = setup(None);
            let seed = grid.index(8, 8);
            let mut remaining = budget;
            let mut expected_remaining = budget;

            let placed = grow_patch(
                &mut grid,
                &mut ctx,
                seed,
                Terrain::Forest,
                diff,
                &mut remaining,
                PlacementRule::ANY,
                Scope::World,
            );
            let expected = grow_recursive(
                &mut expected_grid,
                &mut expected_ctx,
                seed,
                Terrain::Forest,
                diff,
                &mut expected_remaining,
                PlacementRule::ANY,
                Scope::World,
            );
            assert_eq!(placed, expected);
            assert_eq!(remaining, expected_remaining);
            assert_eq!(grid, expected_grid);
        }
    }

    #[test]
    fn test_make_plain_by_band() {
        let (mut grid, mut ctx) = setup(None);
        let idx = grid.index(3, 3);
        grid.tiles[idx].band = TemperatureBand::Frozen;
        make_plain(&mut grid, &mut ctx, idx);
        assert_eq!(grid.tiles[idx].terrain, Terrain::Glacier);

        grid.tiles[idx].band = TemperatureBand::Cold;
        make_plain(&mut grid, &mut ctx, idx);
        assert_eq!(grid.tiles[idx].terrain, Terrain::Tundra);

        grid.tiles[idx].band = TemperatureBand::Tropical;
        make_plain(&mut grid, &mut ctx, idx);
        assert!(matches!(
            grid.tiles[idx].terrain,
            Terrain::Grassland | Terrain::Plains
        ));
        assert!(ctx.placed.is_placed(idx));
    }

    #[test]
    fn test_default_for_band() {
        assert_eq!(default_for_band(TemperatureBand::Frozen), Terrain::Glacier);
        assert_eq!(default_for_band(TemperatureBand::Tropical), Terrain::Plains);
    }
}
