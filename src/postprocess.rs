//! Постобработка готовой карты
//!
//! Убирает одиночные клетки суши, находит озёра и глубокий океан, рассыпает
//! ресурсы и хижины, после чего заново нумерует регионы и проверяет, что
//! карта целостна.

use serde::Serialize;

use crate::climate::TemperatureBand;
use crate::config::WorldGenerationParams;
use crate::context::GenContext;
use crate::continents::{RegionTable, assign_region_ids};
use crate::error::GenError;
use crate::grid::TileGrid;
use crate::terrain::{Specials, Terrain};

/// Радиус, внутри которого не бывает двух хижин
const HUT_SPACING: i32 = 3;

/// Что изменила постобработка
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PostProcessReport {
    pub removed_islands: usize,
    pub lakes: usize,
    pub deep_ocean: usize,
    pub resources: usize,
    pub huts: usize,
}

/// Одиночная суша без соседей-суши по восьми направлениям уходит под воду
pub fn remove_tiny_islands(grid: &mut TileGrid) -> usize {
    let lonely: Vec<usize> = (0..grid.len())
        .filter(|&idx| {
            grid.tiles[idx].terrain.is_land()
                && grid.adjacent(idx).all(|n| grid.tiles[n].is_water())
        })
        .collect();
    for &idx in &lonely {
        let tile = &mut grid.tiles[idx];
        tile.terrain = Terrain::Ocean;
        tile.specials = Specials::NONE;
    }
    lonely.len()
}

/// Малые океаны внутри одного континента становятся озёрами
pub fn regenerate_lakes(grid: &mut TileGrid, table: &RegionTable, max_size: usize) -> usize {
    let mut lakes = 0;
    for tile in &mut grid.tiles {
        if tile.terrain != Terrain::Ocean {
            continue;
        }
        let Some(ocean) = table.ocean(tile.region) else {
            continue;
        };
        if ocean.size <= max_size && table.lake_surrounder(tile.region).is_some() {
            tile.terrain = Terrain::Lake;
            lakes += 1;
        }
    }
    lakes
}

/// Океан не ближе `distance` шагов к суше становится глубоким
pub fn assign_water_depth(grid: &mut TileGrid, distance: u32) -> usize {
    let from_land = grid.distance_from(|t| t.terrain.is_land());
    let mut deep = 0;
    for (tile, &d) in grid.tiles.iter_mut().zip(&from_land) {
        if tile.terrain == Terrain::Ocean && d >= distance {
            tile.terrain = Terrain::DeepOcean;
            deep += 1;
        }
    }
    deep
}

fn resource_allowed(grid: &TileGrid, idx: usize) -> bool {
    let tile = &grid.tiles[idx];
    if grid.adjacent(idx).any(|n| grid.tiles[n].has(Specials::RESOURCE)) {
        return false;
    }
    !tile.is_water() || grid.adjacent(idx).any(|n| grid.tiles[n].terrain.is_land())
}

/// Ресурсы с вероятностью `per_mille` ‰ на клетку, не вплотную друг к другу.
/// На воде — только у берега.
pub fn place_resources(grid: &mut TileGrid, ctx: &mut GenContext, per_mille: u32) -> usize {
    if per_mille == 0 {
        return 0;
    }
    let mut placed = 0;
    for idx in 0..grid.len() {
        if ctx.rand(1000) < per_mille as i32 && resource_allowed(grid, idx) {
            grid.tiles[idx].specials.insert(Specials::RESOURCE);
            placed += 1;
        }
    }
    placed
}

fn hut_allowed(grid: &TileGrid, idx: usize) -> bool {
    let tile = &grid.tiles[idx];
    tile.terrain.is_land()
        && tile.band != TemperatureBand::Frozen
        && grid
            .square(idx, HUT_SPACING)
            .all(|n| !grid.tiles[n].has(Specials::HUT))
}

/// Хижины: `per_thousand` на 1000 клеток, не на льду и не теснее радиуса 3
pub fn place_huts(grid: &mut TileGrid, ctx: &mut GenContext, per_thousand: u32) -> usize {
    let wanted = per_thousand as usize * grid.len() / 1000;
    let mut placed = 0;
    let mut tries = grid.len() * 2;
    while placed < wanted && tries > 0 {
        tries -= 1;
        let idx = ctx.rand(grid.len() as i32) as usize;
        if hut_allowed(grid, idx) {
            grid.tiles[idx].specials.insert(Specials::HUT);
            placed += 1;
        }
    }
    if placed < wanted {
        tracing::debug!(wanted, placed, "не все хижины нашли место");
    }
    placed
}

/// Проверяет целостность готовой карты
pub fn validate(grid: &TileGrid, table: &RegionTable) -> Result<(), GenError> {
    if let Some(tile) = grid.tiles.iter().find(|t| !t.terrain.is_known()) {
        return Err(GenError::UnassignedTerrain {
            x: tile.x,
            y: tile.y,
        });
    }
    let counted = table.total_size();
    if counted != grid.len() {
        return Err(GenError::RegionSizeMismatch {
            counted,
            tiles: grid.len(),
        });
    }
    Ok(())
}

/// Полный проход постобработки. Возвращает итоговую таблицу регионов.
pub fn finish_world(
    grid: &mut TileGrid,
    ctx: &mut GenContext,
    params: &WorldGenerationParams,
) -> Result<(RegionTable, PostProcessReport), GenError> {
    let settings = &params.postprocess;
    let mut report = PostProcessReport::default();

    if settings.remove_tiny_islands {
        report.removed_islands = remove_tiny_islands(grid);
    }
    let table = assign_region_ids(grid);
    report.lakes = regenerate_lakes(grid, &table, settings.lake_max_size);
    report.deep_ocean = assign_water_depth(grid, settings.deep_ocean_distance);
    report.resources = place_resources(grid, ctx, params.resources);
    report.huts = place_huts(grid, ctx, params.huts);

    let table = assign_region_ids(grid);
    validate(grid, &table)?;

    tracing::debug!(
        removed_islands = report.removed_islands,
        lakes = report.lakes,
        deep_ocean = report.deep_ocean,
        resources = report.resources,
        huts = report.huts,
        "постобработка завершена"
    );
    Ok((table, report))
}
