//! Полный проход генерации мира
//!
//! Высоты → суша и море → полюса → регионы → рельеф → биомы → реки →
//! постобработка. Островные генераторы заменяют середину цепочки раскладкой
//! островов; если они не справились, карта строится заново случайным генератором.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::biome::make_terrains;
use crate::config::{Generator, WorldGenerationParams};
use crate::context::GenContext;
use crate::continents::{RegionTable, assign_region_ids, region_graph};
use crate::error::GenError;
use crate::grid::TileGrid;
use crate::heightmap::generate_heightmap;
use crate::islands::{IslandReport, generate_islands};
use crate::landmass::{make_land, make_polar};
use crate::postprocess::{PostProcessReport, finish_world};
use crate::relief::make_relief;
use crate::rivers::make_rivers;
use crate::terrain::{Specials, Terrain};

/// Готовая карта
#[derive(Debug, Clone)]
pub struct WorldMap {
    pub grid: TileGrid,
    pub regions: RegionTable,
    /// Генератор, которым карта построена на самом деле (с учётом отката)
    pub generator: Generator,
    pub river_tiles: usize,
    pub islands: Option<IslandReport>,
    pub postprocess: PostProcessReport,
}

/// Сводка карты для сохранения в JSON
#[derive(Debug, Clone, Serialize)]
pub struct MapSummary {
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub requested_generator: Generator,
    pub generator: Generator,
    pub land_tiles: usize,
    pub continents: Vec<usize>,
    pub oceans: usize,
    /// Пары соседних регионов
    pub region_links: usize,
    pub lakes: usize,
    pub river_tiles: usize,
    pub huts: usize,
    pub resources: usize,
    pub terrain: BTreeMap<Terrain, usize>,
    pub islands: Option<IslandReport>,
    pub postprocess: PostProcessReport,
}

impl WorldMap {
    #[must_use]
    pub fn summary(&self, params: &WorldGenerationParams) -> MapSummary {
        let mut terrain = BTreeMap::new();
        for tile in &self.grid.tiles {
            *terrain.entry(tile.terrain).or_insert(0) += 1;
        }
        MapSummary {
            seed: params.seed,
            width: self.grid.width,
            height: self.grid.height,
            requested_generator: params.generator,
            generator: self.generator,
            land_tiles: self.grid.land_count(),
            continents: self.regions.continents.clone(),
            oceans: self.regions.ocean_count(),
            region_links: region_graph(&self.grid).edge_count(),
            lakes: self.grid.count_terrain(Terrain::Lake),
            river_tiles: self.river_tiles,
            huts: self.grid.count_special(Specials::HUT),
            resources: self.grid.count_special(Specials::RESOURCE),
            terrain,
            islands: self.islands,
            postprocess: self.postprocess,
        }
    }
}

/// Суша по порогу карты высот: генераторы `Random` и `Fractal`
fn generate_terrain(grid: &mut TileGrid, ctx: &mut GenContext, params: &WorldGenerationParams) {
    generate_heightmap(grid, params, &ctx.climate, &mut ctx.rng, &mut ctx.heights);
    make_land(grid, ctx);
    ctx.placed.mark_water(grid);
    let glaciers = make_polar(grid, ctx);

    let regions = assign_region_ids(grid);
    tracing::debug!(
        glaciers,
        continents = regions.continent_count(),
        oceans = regions.ocean_count(),
        "регионы размечены"
    );

    let relief = make_relief(grid, ctx);
    let budgets = make_terrains(grid, ctx);
    let rivers = make_rivers(grid, ctx, params.terrain.landmass);
    tracing::info!(
        land = grid.land_count(),
        relief,
        left_plains = budgets.plains,
        rivers,
        "рельеф, биомы и реки готовы"
    );
}

fn unplaced_land(grid: &TileGrid, ctx: &GenContext) -> usize {
    (0..grid.len())
        .filter(|&idx| grid.tiles[idx].terrain.is_land() && !ctx.placed.is_placed(idx))
        .count()
}

/// Строит карту целиком. Одинаковые параметры дают одинаковую карту.
pub fn generate_world(params: &WorldGenerationParams) -> Result<WorldMap, GenError> {
    params.validate()?;
    tracing::info!(
        seed = params.seed,
        width = params.width,
        height = params.height,
        generator = ?params.generator,
        "генерация мира"
    );

    let mut grid = TileGrid::new(params.width, params.height, params.topology, Terrain::Unknown);
    let mut ctx = GenContext::new(params)?;
    let mut generator = params.generator;
    let mut islands = None;

    if generator.is_island_family() {
        match generate_islands(&mut grid, &mut ctx, params) {
            Ok(report) => islands = Some(report),
            Err(err) => {
                tracing::warn!(%err, "островной генератор не справился, строим случайную карту");
                generator = Generator::Random;
            }
        }
    }

    if islands.is_none() {
        if generator == params.generator {
            generate_terrain(&mut grid, &mut ctx, params);
        } else {
            let fallback = WorldGenerationParams {
                generator,
                ..params.clone()
            };
            ctx = GenContext::new(&fallback)?;
            generate_terrain(&mut grid, &mut ctx, &fallback);
        }
    }

    let count = unplaced_land(&grid, &ctx);
    if count > 0 {
        return Err(GenError::UnplacedLand { count });
    }

    let river_tiles = grid.count_special(Specials::RIVER);
    let (regions, postprocess) = finish_world(&mut grid, &mut ctx, params)?;
    if let Some(report) = &mut islands {
        report.islands = regions.continent_count();
    }

    tracing::info!(
        generator = ?generator,
        continents = regions.continent_count(),
        oceans = regions.ocean_count(),
        river_tiles,
        huts = postprocess.huts,
        "мир готов"
    );
    Ok(WorldMap {
        grid,
        regions,
        generator,
        river_tiles,
        islands,
        postprocess,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    fn params(generator: Generator, size: u32) -> WorldGenerationParams {
        WorldGenerationParams {
            seed: 3,
            width: size,
            height: size,
            generator,
            ..WorldGenerationParams::default()
        }
    }

    #[test]
    fn test_invalid_config_is_rejected_before_work() {
        let mut p = params(Generator::Random, 20);
        p.terrain.landmass = 95;
        assert!(matches!(
            generate_world(&p),
            Err(GenError::Config(ConfigError::OutOfRange { name: "landmass", .. }))
        ));
    }

    #[test]
    fn test_small_varied_map_falls_back_to_random() {
        let world = generate_world(&params(Generator::VariedIslands, 20)).unwrap();
        assert_eq!(world.generator, Generator::Random);
        assert!(world.islands.is_none());
        assert!(world.grid.tiles.iter().all(|t| t.terrain.is_known()));
    }

    #[test]
    fn test_fractal_world_is_complete() {
        let world = generate_world(&params(Generator::Fractal, 32)).unwrap();
        assert_eq!(world.generator, Generator::Fractal);
        assert_eq!(world.regions.total_size(), world.grid.len());
    }

    #[test]
    fn test_summary_counts_tiles() {
        let p = params(Generator::Random, 24);
        let world = generate_world(&p).unwrap();
        let summary = world.summary(&p);
        assert_eq!(summary.terrain.values().sum::<usize>(), world.grid.len());
        assert_eq!(summary.continents.len(), world.regions.continent_count());
        if summary.oceans > 0 && !summary.continents.is_empty() {
            assert!(summary.region_links > 0);
        }
        assert!(serde_json::to_string(&summary).is_ok());
    }
}
