//! Холмы и горы
//!
//! Клетка выше уровня гор поднимается в рельеф, если соседи не слишком ниже
//! неё (иначе только с вероятностью). Локальные вершины на слишком ровной
//! местности тоже получают рельеф, чтобы равнины не были пустыми.

use crate::climate::TemperatureBand;
use crate::context::GenContext;
use crate::grid::TileGrid;
use crate::heightmap::HMAP_MAX_LEVEL;
use crate::terrain::Terrain;

/// Есть ли рядом клетка, которая сильно ниже `height`
fn terrain_is_too_high(grid: &TileGrid, idx: usize, mountain_level: i32, height: i32) -> bool {
    let step = (HMAP_MAX_LEVEL - mountain_level) / 5;
    grid.square(idx, 1)
        .any(|n| grid.tiles[n].elevation + step < height)
}

/// Окрестность радиуса 2 слишком ровная и клетка в ней — вершина
fn area_is_too_flat(grid: &TileGrid, idx: usize, shore: i32, mountain_level: i32, height: i32) -> bool {
    let (x, y) = grid.coords(idx);
    let mut higher = 0;

    for dy in -2i32..=2 {
        for dx in -2i32..=2 {
            let Some(n) = grid.normalize(x as i32 + dx, y as i32 + dy) else {
                continue;
            };
            let h = grid.tiles[n].elevation;
            if h > mountain_level {
                return false;
            }
            if h > height {
                if dx.abs() <= 1 && dy.abs() <= 1 {
                    return false;
                }
                higher += 1;
                if higher > 2 {
                    return false;
                }
            }
        }
    }

    (mountain_level - shore) * higher <= (height - shore) * 4
}

fn relief_for(band: TemperatureBand, ctx: &mut GenContext) -> Terrain {
    match band {
        TemperatureBand::Temperate | TemperatureBand::Tropical => {
            if ctx.rand(10) < 7 {
                Terrain::Hills
            } else {
                Terrain::Mountains
            }
        }
        TemperatureBand::Frozen | TemperatureBand::Cold => Terrain::Mountains,
    }
}

/// Поднимает холмы и горы на неразмещённой суше. Возвращает число клеток рельефа.
pub fn make_relief(grid: &mut TileGrid, ctx: &mut GenContext) -> usize {
    let shore = ctx.levels.shore;
    let mountain_level = ctx.levels.mountain;
    let mut placed = 0;

    for idx in 0..grid.len() {
        if grid.tiles[idx].is_water() || ctx.placed.is_placed(idx) {
            continue;
        }
        let height = grid.tiles[idx].elevation;

        let raised = (mountain_level < height
            && (ctx.rand(10) > 5 || !terrain_is_too_high(grid, idx, mountain_level, height)))
            || area_is_too_flat(grid, idx, shore, mountain_level, height);

        if raised {
            let terrain = relief_for(grid.tiles[idx].band, ctx);
            grid.tiles[idx].terrain = terrain;
            ctx.placed.set(idx);
            placed += 1;
        }
    }

    tracing::debug!(tiles = placed, "рельеф поднят");
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Topology, WorldGenerationParams};

    fn setup(elevation: i32) -> (TileGrid, GenContext) {
        let params = WorldGenerationParams {
            width: 8,
            height: 8,
            ..WorldGenerationParams::default()
        };
        let mut grid = TileGrid::new(
            8,
            8,
            Topology {
                wrap_x: false,
                wrap_y: false,
            },
            Terrain::Grassland,
        );
        for tile in &mut grid.tiles {
            tile.elevation = elevation;
        }
        let ctx = GenContext::new(&params).unwrap();
        (grid, ctx)
    }

    #[test]
    fn test_high_plateau_becomes_relief() {
        // shore = 700, mountain = 910
        let (mut grid, mut ctx) = setup(950);
        let count = make_relief(&mut grid, &mut ctx);
        assert_eq!(count, 64);
        assert!(grid
            .tiles
            .iter()
            .all(|t| matches!(t.terrain, Terrain::Hills | Terrain::Mountains)));
        assert_eq!(ctx.placed.unplaced_count(), 0);
    }

    #[test]
    fn test_lowland_slope_stays_flat() {
        let (mut grid, mut ctx) = setup(750);
        // Строгий уклон по x: у каждой клетки, кроме правого столбца, есть более высокий сосед
        for tile in &mut grid.tiles {
            tile.elevation = 720 + tile.x as i32 * 10;
        }
        let count = make_relief(&mut grid, &mut ctx);
        // Правый столбец — вершины: выше них никого нет
        assert_eq!(count, 8);
        assert_eq!(grid.get(0, 3).terrain, Terrain::Grassland);
        assert!(matches!(
            grid.get(7, 3).terrain,
            Terrain::Hills | Terrain::Mountains
        ));
    }

    #[test]
    fn test_cold_relief_is_mountains() {
        let (mut grid, mut ctx) = setup(950);
        for tile in &mut grid.tiles {
            tile.band = TemperatureBand::Cold;
        }
        make_relief(&mut grid, &mut ctx);
        assert_eq!(grid.count_terrain(Terrain::Mountains), 64);
    }

    #[test]
    fn test_placed_and_water_tiles_are_skipped() {
        let (mut grid, mut ctx) = setup(950);
        grid.tiles[0].terrain = Terrain::Ocean;
        ctx.placed.set(1);
        let count = make_relief(&mut grid, &mut ctx);
        assert_eq!(count, 62);
        assert_eq!(grid.tiles[0].terrain, Terrain::Ocean);
        assert_eq!(grid.tiles[1].terrain, Terrain::Grassland);
    }
}
