//! Заполнение поставленного острова местностью и реками

use super::IslandState;
use crate::biome::{PlacementRule, grow_patch};
use crate::climate::{MiscCondition, TempCondition, WetCondition};
use crate::context::{GenContext, Scope};
use crate::grid::TileGrid;
use crate::rivers::make_rivers_in;
use crate::terrain::Terrain;

/// Вариант местности с весом и условиями
#[derive(Debug, Clone, Copy)]
pub struct TerrainChoice {
    pub terrain: Terrain,
    pub weight: i32,
    pub rule: PlacementRule,
}

const fn choice(
    terrain: Terrain,
    weight: i32,
    temp: TempCondition,
    wet: WetCondition,
    misc: MiscCondition,
) -> TerrainChoice {
    TerrainChoice {
        terrain,
        weight,
        rule: PlacementRule::new(temp, wet, misc),
    }
}

/// Проход заполнения: вероятность (в %) занять береговую клетку, запас роста пятна и варианты
#[derive(Debug, Clone, Copy)]
pub struct FillPass {
    pub coast: i32,
    pub patch: i32,
    pub choices: &'static [TerrainChoice],
}

pub const MOUNTAINS: FillPass = FillPass {
    coast: 20,
    patch: 20,
    choices: &[
        choice(Terrain::Hills, 2, TempCondition::ALL, WetCondition::All, MiscCondition::None),
        choice(Terrain::Mountains, 1, TempCondition::ALL, WetCondition::All, MiscCondition::None),
    ],
};

pub const FOREST: FillPass = FillPass {
    coast: 60,
    patch: 60,
    choices: &[
        choice(Terrain::Forest, 3, TempCondition::NFROZEN, WetCondition::All, MiscCondition::None),
        choice(Terrain::Jungle, 1, TempCondition::TROPICAL, WetCondition::All, MiscCondition::None),
    ],
};

pub const DESERT: FillPass = FillPass {
    coast: 80,
    patch: 80,
    choices: &[
        choice(Terrain::Desert, 3, TempCondition::NFROZEN, WetCondition::Dry, MiscCondition::NotLow),
        choice(Terrain::Tundra, 1, TempCondition::COLD, WetCondition::All, MiscCondition::None),
        choice(Terrain::Glacier, 1, TempCondition::FROZEN, WetCondition::All, MiscCondition::None),
    ],
};

pub const SWAMP: FillPass = FillPass {
    coast: 95,
    patch: 50,
    choices: &[choice(Terrain::Swamp, 1, TempCondition::HOT, WetCondition::NotDry, MiscCondition::Low)],
};

/// Забирает из остатка целое число клеток: `остаток / ёмкость + 1`.
/// Остаток уходит в минус и копится на следующих островах.
pub fn take_quota(bucket: &mut i64, capacity: i64) -> Option<i64> {
    if *bucket <= 0 {
        return None;
    }
    let capacity = capacity.max(1);
    let quota = *bucket / capacity + 1;
    *bucket -= quota * capacity;
    Some(quota)
}

/// Раскладывает до `quota` клеток местности прохода по текущему острову
pub fn fill_island(
    grid: &mut TileGrid,
    ctx: &mut GenContext,
    state: &IslandState,
    pass: &FillPass,
    quota: i64,
) -> usize {
    let total_weight: i32 = pass.choices.iter().map(|c| c.weight).sum();
    if pass.choices.is_empty() || total_weight <= 0 {
        return 0;
    }
    let scope = Scope::Region(state.region());
    let mut left = quota;
    let mut failsafe = (quota * state.rect.area()).abs();
    let mut placed = 0;

    while left > 0 && failsafe > 0 {
        failsafe -= 1;
        let Some(idx) = state.random_position(grid, ctx) else {
            continue;
        };
        if !scope.contains(grid, idx) || ctx.placed.is_placed(idx) {
            continue;
        }
        let pick = pass.choices[ctx.rand(pass.choices.len() as i32) as usize];
        if ctx.rand(total_weight) > pick.weight || !pick.rule.allows(grid, ctx, idx) {
            continue;
        }

        // Первое условие делает местность сплошнее, второе уводит её от берега
        let clustered = left * 3 > quota * 2
            || ctx.rand(100) < 50
            || grid.adjacent(idx).any(|n| grid.tiles[n].terrain == pick.terrain);
        let inland = !grid.is_card_adjacent_to_water(idx) || ctx.rand(100) < pass.coast;
        if clustered && inland {
            placed += grow_patch(
                grid,
                ctx,
                idx,
                pick.terrain,
                pass.patch,
                &mut left,
                pick.rule,
                scope,
            );
        }
    }
    placed
}

/// Реки острова суммарной длиной до `quota`
pub fn fill_island_rivers(
    grid: &mut TileGrid,
    ctx: &mut GenContext,
    state: &IslandState,
    quota: i64,
) -> usize {
    let tries = (quota * state.rect.area()).clamp(1, i64::from(u32::MAX)) as u32;
    make_rivers_in(
        grid,
        ctx,
        Scope::Region(state.region()),
        quota.max(0) as usize,
        tries,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_draws_bucket_negative() {
        let mut bucket = 250;
        assert_eq!(take_quota(&mut bucket, 100), Some(3));
        assert_eq!(bucket, -50);
        assert_eq!(take_quota(&mut bucket, 100), None);

        let mut small = 1;
        assert_eq!(take_quota(&mut small, 100), Some(1));
        assert_eq!(small, -99);
    }

    #[test]
    fn test_pass_weights_are_positive() {
        for pass in [MOUNTAINS, FOREST, DESERT, SWAMP] {
            assert!(pass.choices.iter().all(|c| c.weight > 0));
            assert!((0..=100).contains(&pass.coast));
        }
    }
}
