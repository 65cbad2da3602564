//! Разделение суши и моря по уровню берега и полярные шапки

use crate::climate::{TemperatureBand, assign_temperature_map};
use crate::context::GenContext;
use crate::grid::{RegionId, TileGrid};
use crate::terrain::{Specials, Terrain};

/// Временная местность суши до распределения биомов
pub const LAND_FILL: Terrain = Terrain::Grassland;

/// Переносит высоты из контекста на карту и делит её на сушу и море.
///
/// Клетки ниже уровня берега становятся океаном, остальные — сушей-заготовкой,
/// которую позже заменят рельеф и биомы. Пояса температур считаются сразу, так как
/// зависят от близости моря.
pub fn make_land(grid: &mut TileGrid, ctx: &mut GenContext) {
    let shore = ctx.levels.shore;
    for (tile, &h) in grid.tiles.iter_mut().zip(&ctx.heights.data) {
        tile.elevation = h;
        tile.terrain = if h < shore { Terrain::Ocean } else { LAND_FILL };
        tile.specials = Specials::NONE;
        tile.region = RegionId::UNASSIGNED;
    }

    assign_temperature_map(grid, &ctx.climate, shore);

    tracing::debug!(
        shore_level = shore,
        mountain_level = ctx.levels.mountain,
        land = grid.land_count(),
        "суша отделена от моря"
    );
}

/// Покрывает полярную сушу ледником и отмечает её размещённой
pub fn make_polar(grid: &mut TileGrid, ctx: &mut GenContext) -> usize {
    let mut glaciers = 0;
    for idx in 0..grid.len() {
        let tile = &grid.tiles[idx];
        if tile.is_water() || ctx.placed.is_placed(idx) {
            continue;
        }
        let frozen = match tile.band {
            TemperatureBand::Frozen => true,
            TemperatureBand::Cold => {
                ctx.rand(10) > 7
                    && grid
                        .adjacent(idx)
                        .any(|n| grid.tiles[n].band == TemperatureBand::Frozen)
            }
            _ => false,
        };
        if frozen {
            grid.tiles[idx].terrain = Terrain::Glacier;
            ctx.placed.set(idx);
            glaciers += 1;
        }
    }
    glaciers
}
