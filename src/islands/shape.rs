//! Форма острова: рост маски в центре карты и перенос её в свободное море

use serde::Serialize;

use super::IslandState;
use crate::climate::assign_bands_for;
use crate::context::GenContext;
use crate::grid::TileGrid;
use crate::heightmap::HMAP_MAX_LEVEL;
use crate::terrain::{Specials, Terrain};

/// Прямоугольник `[w, e) × [n, s)` в координатах карты.
/// После переноса на зацикленной карте может выходить за край.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Rect {
    pub n: i32,
    pub s: i32,
    pub w: i32,
    pub e: i32,
}

impl Rect {
    #[must_use]
    pub fn width(&self) -> i32 {
        self.e - self.w
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        self.s - self.n
    }

    #[must_use]
    pub fn area(&self) -> i64 {
        i64::from(self.width()) * i64::from(self.height())
    }

    fn shifted(self, dx: i32, dy: i32) -> Self {
        Self {
            n: self.n + dy,
            s: self.s + dy,
            w: self.w + dx,
            e: self.e + dx,
        }
    }
}

/// Клетка ближе двух шагов к незацикленному краю
fn near_edge(grid: &TileGrid, x: i32, y: i32) -> bool {
    let (w, h) = (grid.width as i32, grid.height as i32);
    (!grid.topology.wrap_x && (x < 2 || x >= w - 2))
        || (!grid.topology.wrap_y && (y < 2 || y >= h - 2))
}

fn mass_neighbours(grid: &TileGrid, mass: &[bool], idx: usize) -> usize {
    grid.cardinal(idx).filter(|&n| mass[n]).count()
}

/// Море, рядом с которым нет суши: сюда можно ставить остров
fn is_open_water(grid: &TileGrid, idx: usize) -> bool {
    grid.tiles[idx].is_water() && grid.adjacent(idx).all(|n| grid.tiles[n].is_water())
}

/// Выращивает маску острова массой `mass` в центре карты и ставит её на карту.
/// Маска, не доросшая до `min_mass`, не ставится. Возвращает число поставленных клеток.
pub fn create_island(
    grid: &mut TileGrid,
    ctx: &mut GenContext,
    state: &mut IslandState,
    mass: i64,
    min_mass: i64,
) -> Option<usize> {
    if mass <= 0 {
        return None;
    }
    let (width, height) = (grid.width as i32, grid.height as i32);
    let (cx, cy) = (width / 2, height / 2);

    ctx.island_mass.fill(false);
    let center = grid.index(cx as u32, cy as u32);
    ctx.island_mass[center] = true;
    state.rect = Rect {
        n: cy - 1,
        s: cy + 2,
        w: cx - 1,
        e: cx + 2,
    };

    let mut left = mass - 1;
    let mut tries = mass * (2 + mass / 20) + 99;
    while left > 0 && tries > 0 {
        tries -= 1;
        let r = state.rect;
        let x = r.w + ctx.rand(r.width());
        let y = r.n + ctx.rand(r.height());
        let idx = grid.index(x as u32, y as u32);

        if (!near_edge(grid, x, y) || ctx.rand(50) < 25)
            && !ctx.island_mass[idx]
            && mass_neighbours(grid, &ctx.island_mass, idx) > 0
        {
            ctx.island_mass[idx] = true;
            left -= 1;
            let r = &mut state.rect;
            if y >= r.s - 1 && r.s < height - 2 {
                r.s += 1;
            }
            if x >= r.e - 1 && r.e < width - 2 {
                r.e += 1;
            }
            if y <= r.n && r.n > 2 {
                r.n -= 1;
            }
            if x <= r.w && r.w > 2 {
                r.w -= 1;
            }
        }

        // Ближе к концу заделываем дыры, окружённые сушей со всех сторон
        if left < mass / 10 {
            let r = state.rect;
            for y in r.n..r.s {
                for x in r.w..r.e {
                    let idx = grid.index(x as u32, y as u32);
                    if left > 0
                        && !ctx.island_mass[idx]
                        && mass_neighbours(grid, &ctx.island_mass, idx) == 4
                    {
                        ctx.island_mass[idx] = true;
                        left -= 1;
                    }
                }
            }
        }
    }
    if left > 0 {
        tracing::debug!(grown = mass - left, mass, "рост острова оборвался раньше срока");
        if mass - left < min_mass {
            return None;
        }
    }

    let mut tries = (grid.len() / 4).max(1);
    loop {
        if let Some(count) = place_island(grid, ctx, state) {
            return Some(count);
        }
        tries -= 1;
        if tries == 0 {
            return None;
        }
    }
}

/// Пробует перенести маску со случайным сдвигом. Каждая клетка маски должна
/// попасть в существующее море без суши вокруг.
fn place_island(grid: &mut TileGrid, ctx: &mut GenContext, state: &mut IslandState) -> Option<usize> {
    let ox = ctx.rand(grid.width as i32);
    let oy = ctx.rand(grid.height as i32);
    let dx = ox - grid.width as i32 / 2;
    let dy = oy - grid.height as i32 / 2;
    let r = state.rect;
    let mass = &ctx.island_mass;

    // Сначала дешёвая проверка по диагонали прямоугольника
    let (mut x, mut y) = (r.w, r.n);
    while y < r.s && x < r.e {
        let target = grid.normalize(x + dx, y + dy)?;
        if mass[grid.index(x as u32, y as u32)] && !is_open_water(grid, target) {
            return None;
        }
        x += 1;
        y += 1;
    }

    let mut targets = Vec::new();
    for y in r.n..r.s {
        for x in r.w..r.e {
            let target = grid.normalize(x + dx, y + dy)?;
            if mass[grid.index(x as u32, y as u32)] {
                if !is_open_water(grid, target) {
                    return None;
                }
                targets.push(target);
            }
        }
    }
    if targets.is_empty() {
        return None;
    }

    let region = state.region();
    for &idx in &targets {
        state.check_mass -= 1;
        let tile = &mut grid.tiles[idx];
        tile.terrain = Terrain::Unknown;
        tile.region = region;
        tile.specials = Specials::NONE;
        ctx.placed.unset(idx);
    }
    if state.check_mass < 0 {
        tracing::warn!(
            island = region.0,
            overflow = -state.check_mass,
            "масса островов превысила общий запас"
        );
    }
    state.rect = r.shifted(dx, dy);

    assign_island_elevation(grid, &targets);
    assign_bands_for(grid, &ctx.climate, ctx.levels.shore, &targets);
    Some(targets.len())
}

/// Высота клетки острова — удалённость от воды, растянутая на `0..HMAP_MAX_LEVEL`
fn assign_island_elevation(grid: &mut TileGrid, tiles: &[usize]) {
    let distance = grid.distance_from(|t| t.is_water());
    let max = tiles.iter().map(|&idx| distance[idx]).max().unwrap_or(1);
    for &idx in tiles {
        grid.tiles[idx].elevation =
            (i64::from(distance[idx]) * i64::from(HMAP_MAX_LEVEL) / (i64::from(max) + 1)) as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Generator, WorldGenerationParams};
    use crate::grid::RegionId;
    use crate::islands::plan::init_world;

    fn setup(width: u32, height: u32) -> (TileGrid, GenContext, IslandState) {
        let params = WorldGenerationParams {
            width,
            height,
            generator: Generator::FairIslands,
            ..WorldGenerationParams::default()
        };
        let mut grid = TileGrid::new(width, height, params.topology, Terrain::Ocean);
        let mut ctx = GenContext::new(&params).unwrap();
        let state = init_world(&mut grid, &mut ctx, &params);
        (grid, ctx, state)
    }

    #[test]
    fn test_rect_geometry() {
        let r = Rect {
            n: 2,
            s: 5,
            w: 1,
            e: 5,
        };
        assert_eq!(r.width(), 4);
        assert_eq!(r.height(), 3);
        assert_eq!(r.area(), 12);
        assert_eq!(r.shifted(3, -1).n, 1);
    }

    #[test]
    fn test_created_island_is_isolated_unknown_land() {
        let (mut grid, mut ctx, mut state) = setup(30, 30);
        let count = create_island(&mut grid, &mut ctx, &mut state, 20, 1).unwrap();
        assert!(count > 0 && count <= 20);

        let island: Vec<usize> = (0..grid.len())
            .filter(|&i| grid.tiles[i].region == RegionId(1))
            .collect();
        assert_eq!(island.len(), count);
        for &idx in &island {
            assert_eq!(grid.tiles[idx].terrain, Terrain::Unknown);
            assert!(!ctx.placed.is_placed(idx));
            assert!(grid.tiles[idx].elevation > 0);
        }
        assert_eq!(state.check_mass, state.total_mass - count as i64);
    }

    #[test]
    fn test_second_island_never_touches_first() {
        let (mut grid, mut ctx, mut state) = setup(40, 40);
        create_island(&mut grid, &mut ctx, &mut state, 30, 1).unwrap();
        state.index += 1;
        create_island(&mut grid, &mut ctx, &mut state, 30, 1).unwrap();

        for idx in 0..grid.len() {
            let region = grid.tiles[idx].region;
            if region == RegionId(2) {
                assert!(grid
                    .adjacent(idx)
                    .all(|n| grid.tiles[n].region != RegionId(1)));
            }
        }
    }

    #[test]
    fn test_non_positive_mass_is_rejected() {
        let (mut grid, mut ctx, mut state) = setup(20, 20);
        assert_eq!(create_island(&mut grid, &mut ctx, &mut state, 0, 0), None);
    }
}
