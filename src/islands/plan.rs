//! Планы раскладки островов для трёх островных генераторов

use serde::Serialize;

use super::{IslandState, make_island};
use crate::biome::make_plains;
use crate::climate::assign_temperature_map;
use crate::config::{Generator, WorldGenerationParams};
use crate::context::{GenContext, HeightLevels, Scope};
use crate::error::IslandError;
use crate::grid::{RegionId, TileGrid};
use crate::terrain::{Specials, Terrain};

/// Сколько неудач подряд терпит цикл дополнительных островов
const FILLER_FAILURE_LIMIT: u32 = 20;

/// Итог островной раскладки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IslandReport {
    /// Число островов. `generate_world` пересчитывает его по итоговой
    /// таблице регионов, то есть после удаления крошечных островов.
    pub islands: usize,
    pub unplaced_mass: i64,
}

/// Заливает карту океаном и готовит состояние раскладки
pub(crate) fn init_world(
    grid: &mut TileGrid,
    ctx: &mut GenContext,
    params: &WorldGenerationParams,
) -> IslandState {
    for tile in &mut grid.tiles {
        tile.terrain = Terrain::Ocean;
        tile.elevation = 0;
        tile.region = RegionId::UNASSIGNED;
        tile.specials = Specials::NONE;
    }
    for idx in 0..grid.len() {
        ctx.placed.set(idx);
    }
    ctx.levels = HeightLevels::for_islands(params.terrain.steepness);
    assign_temperature_map(grid, &ctx.climate, ctx.levels.shore);

    let (w, h) = (i64::from(grid.width), i64::from(grid.height));
    let polar = i64::from(ctx.percents.polar);
    let land = i64::from(params.terrain.landmass);
    let total_mass = ((h - 6 - polar) * land * (w - 2) / 100).max(0);
    IslandState::new(total_mass, ctx)
}

/// Раскладывает сушу островами выбранного генератора.
///
/// Ошибка означает, что генератор не справился и карту надо строить заново
/// другим способом; карта в этом случае остаётся в промежуточном состоянии.
pub fn generate_islands(
    grid: &mut TileGrid,
    ctx: &mut GenContext,
    params: &WorldGenerationParams,
) -> Result<IslandReport, IslandError> {
    let state = match params.generator {
        Generator::FairIslands => fair_islands(grid, ctx, params)?,
        Generator::VariedIslands => varied_islands(grid, ctx, params)?,
        Generator::SharedIslands => shared_islands(grid, ctx, params)?,
        generator => {
            return Err(IslandError::Unsuitable {
                generator,
                reason: "not an island generator",
            });
        }
    };

    let plains = make_plains(grid, ctx, Scope::World);
    let report = IslandReport {
        islands: state.placed_islands(),
        unplaced_mass: state.check_mass.max(0),
    };
    tracing::info!(
        generator = ?params.generator,
        islands = report.islands,
        unplaced_mass = report.unplaced_mass,
        plains,
        "острова разложены"
    );
    Ok(report)
}

/// Одинаковые стартовые острова 70/20/10 на игрока
fn fair_islands(
    grid: &mut TileGrid,
    ctx: &mut GenContext,
    params: &WorldGenerationParams,
) -> Result<IslandState, IslandError> {
    if params.terrain.landmass > 85 {
        return Err(IslandError::Unsuitable {
            generator: Generator::FairIslands,
            reason: "too much land for separate islands",
        });
    }
    let players = params.players;
    let total_weight = 100.0 * players as f32;
    let starter_min = params.islands.starter_min_percent;
    let min_fraction = params.islands.min_fraction_percent;

    let (mut big, mut mid, mut small) = (70.0_f32, 20.0_f32, 10.0_f32);
    let mut state = init_world(grid, ctx, params);
    loop {
        if big <= mid {
            return Err(IslandError::NoFairStart);
        }
        let mass = (big * state.total_mass as f32 / total_weight) as i64;
        let all_placed = (0..players)
            .all(|_| make_island(grid, ctx, &mut state, mass, 1, starter_min).is_some());
        if all_placed {
            break;
        }
        tracing::debug!(big, mid, small, "стартовый остров мал, уменьшаем все стартовые");
        mid += big * 0.01;
        small += big * 0.04;
        big *= 0.95;
        state = init_world(grid, ctx, params);
    }

    for fraction in [mid, small] {
        let mass = (fraction * state.total_mass as f32 / total_weight) as i64;
        for _ in 0..players {
            make_island(grid, ctx, &mut state, mass, 0, min_fraction);
        }
    }
    Ok(state)
}

/// Базовая масса стартового острова в генераторе разных островов
fn varied_island_mass(width: u32, height: u32, landmass: u32, players: u32) -> i64 {
    let (w, h, p) = (i64::from(width), i64::from(height), i64::from(players));
    let mut landmass = w * (h - 6) * i64::from(landmass) / 100;
    // Минус полярные полосы
    if landmass > 3 * h + 3 * p {
        landmass -= 3 * h;
    }
    let mut mass = landmass / (3 * p);
    if mass < 80 {
        mass = landmass / (2 * p);
    }
    if mass < 60 && 2 * p < landmass {
        mass = landmass / p;
    }
    mass.clamp(2, 120)
}

/// По крупному острову на игрока, остальное — острова случайного размера
fn varied_islands(
    grid: &mut TileGrid,
    ctx: &mut GenContext,
    params: &WorldGenerationParams,
) -> Result<IslandState, IslandError> {
    if params.width < 40 || params.height < 40 {
        return Err(IslandError::Unsuitable {
            generator: Generator::VariedIslands,
            reason: "map is smaller than 40x40",
        });
    }
    if params.terrain.landmass > 80 {
        return Err(IslandError::Unsuitable {
            generator: Generator::VariedIslands,
            reason: "too much land for separate islands",
        });
    }
    let players = params.players as usize;
    let min_fraction = params.islands.min_fraction_percent;
    let mut island_mass = varied_island_mass(
        params.width,
        params.height,
        params.terrain.landmass,
        params.players,
    );

    let mut state = init_world(grid, ctx, params);
    let mut tries = 0;
    let mut failures = 0;
    while state.placed_islands() < players
        && state.check_mass > island_mass
        && tries < 500
        && failures < FILLER_FAILURE_LIMIT
    {
        tries += 1;
        match make_island(grid, ctx, &mut state, island_mass, 1, min_fraction) {
            Some(_) => failures = 0,
            None => failures += 1,
        }
    }
    if state.placed_islands() < players {
        return Err(IslandError::StarterFailed {
            island: state.index,
            mass: island_mass,
        });
    }

    island_mass = (island_mass * 11 / 8).max(2);
    failures = 0;
    while state.check_mass > island_mass && tries < 1500 && failures < FILLER_FAILURE_LIMIT {
        tries += 1;
        let spread = i64::from(ctx.rand(((island_mass + 1) / 2 + 1) as i32));
        let size = if tries < 1000 {
            spread + island_mass / 2
        } else {
            spread
        };
        match make_island(grid, ctx, &mut state, size.max(2), 0, min_fraction) {
            Some(_) => failures = 0,
            None => failures += 1,
        }
    }
    if state.check_mass > island_mass {
        tracing::debug!(left = state.check_mass, tries, "часть массы островов не поставлена");
    }
    Ok(state)
}

/// Стартовые острова на двоих-троих игроков
fn shared_islands(
    grid: &mut TileGrid,
    ctx: &mut GenContext,
    params: &WorldGenerationParams,
) -> Result<IslandState, IslandError> {
    let players = params.players;
    if players < 2 {
        return Err(IslandError::Unsuitable {
            generator: Generator::SharedIslands,
            reason: "needs at least two players",
        });
    }
    let land = params.terrain.landmass;
    if land > 80 {
        return Err(IslandError::Unsuitable {
            generator: Generator::SharedIslands,
            reason: "too much land for separate islands",
        });
    }
    let big_weight: i64 = if land > 60 {
        30
    } else if land > 40 {
        50
    } else {
        70
    };
    let spares = (land - 5) / 30;
    let total_weight = (30 + big_weight) * i64::from(players);
    let min_fraction = params.islands.min_fraction_percent;

    let mut state = init_world(grid, ctx, params);
    let total = state.total_mass;

    let mut starters = Vec::new();
    let mut pairs = players / 2;
    if players % 2 == 1 {
        starters.push((3, big_weight * 3 * total / total_weight));
    } else {
        pairs += 1;
    }
    while pairs > 1 {
        pairs -= 1;
        starters.push((2, big_weight * 2 * total / total_weight));
    }
    for (count, mass) in starters {
        if make_island(grid, ctx, &mut state, mass, count, min_fraction).is_none() {
            return Err(IslandError::StarterFailed {
                island: state.index,
                mass,
            });
        }
    }

    for _ in 0..players + spares {
        make_island(grid, ctx, &mut state, 20 * total / total_weight, 0, min_fraction);
    }
    for _ in 0..players {
        make_island(grid, ctx, &mut state, 10 * total / total_weight, 0, min_fraction);
    }
    Ok(state)
}
