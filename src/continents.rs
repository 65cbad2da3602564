//! Нумерация континентов и океанов
//!
//! Клетки одного класса (суша/вода), соседствующие по восьми направлениям,
//! получают общий номер. Континенты нумеруются 1, 2, …, океаны −1, −2, … в
//! порядке обнаружения при растровом обходе.

use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::grid::{RegionId, TileGrid};

/// Какой континент окружает океан
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum Surrounder {
    /// Ни одного континента рядом не встретилось
    #[default]
    Unset,
    /// Ровно один континент — это озеро
    Continent(RegionId),
    /// Граничит с несколькими континентами (открытое море)
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OceanInfo {
    pub size: usize,
    pub surrounder: Surrounder,
}

/// Таблица регионов: размеры континентов и океанов
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct RegionTable {
    /// Размер континента `i + 1`
    pub continents: Vec<usize>,
    /// Океан `-(i + 1)`
    pub oceans: Vec<OceanInfo>,
}

impl RegionTable {
    #[must_use]
    pub fn continent_count(&self) -> usize {
        self.continents.len()
    }

    #[must_use]
    pub fn ocean_count(&self) -> usize {
        self.oceans.len()
    }

    #[must_use]
    pub fn continent_size(&self, id: RegionId) -> Option<usize> {
        if id.is_continent() {
            self.continents.get(id.0 as usize - 1).copied()
        } else {
            None
        }
    }

    #[must_use]
    pub fn ocean(&self, id: RegionId) -> Option<&OceanInfo> {
        if id.is_ocean() {
            self.oceans.get((-id.0) as usize - 1)
        } else {
            None
        }
    }

    /// Континент, окружающий озеро, если он единственный
    #[must_use]
    pub fn lake_surrounder(&self, id: RegionId) -> Option<RegionId> {
        match self.ocean(id)?.surrounder {
            Surrounder::Continent(c) => Some(c),
            _ => None,
        }
    }

    /// Сумма размеров всех регионов
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.continents.iter().sum::<usize>() + self.oceans.iter().map(|o| o.size).sum::<usize>()
    }
}

/// Полностью пересчитывает номера регионов и таблицу
///
/// Клетки с неизвестной местностью пропускаются и остаются с номером 0.
pub fn assign_region_ids(grid: &mut TileGrid) -> RegionTable {
    for tile in &mut grid.tiles {
        tile.region = RegionId::UNASSIGNED;
    }

    let mut table = RegionTable::default();
    let mut stack = Vec::new();

    for start in 0..grid.len() {
        let tile = &grid.tiles[start];
        if tile.region.is_assigned() || !tile.terrain.is_known() {
            continue;
        }

        let is_water = tile.is_water();
        let id = if is_water {
            table.oceans.push(OceanInfo {
                size: 0,
                surrounder: Surrounder::Unset,
            });
            RegionId(-(table.oceans.len() as i32))
        } else {
            table.continents.push(0);
            RegionId(table.continents.len() as i32)
        };

        let mut size = 0;
        grid.tiles[start].region = id;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            size += 1;
            for n in grid.adjacent(idx).collect::<Vec<_>>() {
                let neighbour = &grid.tiles[n];
                if !neighbour.region.is_assigned()
                    && neighbour.terrain.is_known()
                    && neighbour.is_water() == is_water
                {
                    grid.tiles[n].region = id;
                    stack.push(n);
                }
            }
        }

        if is_water {
            table.oceans[(-id.0) as usize - 1].size = size;
        } else {
            table.continents[id.0 as usize - 1] = size;
        }
    }

    assign_surrounders(grid, &mut table);

    tracing::debug!(
        continents = table.continent_count(),
        oceans = table.ocean_count(),
        "регионы пронумерованы"
    );
    table
}

/// Второй проход: для каждого океана запоминает граничащие континенты
fn assign_surrounders(grid: &TileGrid, table: &mut RegionTable) {
    for (idx, tile) in grid.tiles.iter().enumerate() {
        if !tile.region.is_continent() {
            continue;
        }
        for n in grid.adjacent(idx) {
            let ocean = grid.tiles[n].region;
            if !ocean.is_ocean() {
                continue;
            }
            let info = &mut table.oceans[(-ocean.0) as usize - 1];
            info.surrounder = match info.surrounder {
                Surrounder::Unset => Surrounder::Continent(tile.region),
                Surrounder::Continent(c) if c == tile.region => Surrounder::Continent(c),
                _ => Surrounder::Ambiguous,
            };
        }
    }
}

/// Граф смежности регионов (по восьми направлениям)
#[must_use]
pub fn region_graph(grid: &TileGrid) -> UnGraph<RegionId, ()> {
    let mut graph = UnGraph::new_undirected();
    let mut id_to_node: HashMap<RegionId, NodeIndex> = HashMap::new();
    let mut edges = HashSet::new();

    for tile in &grid.tiles {
        if tile.region.is_assigned() && !id_to_node.contains_key(&tile.region) {
            id_to_node.insert(tile.region, graph.add_node(tile.region));
        }
    }

    for (idx, tile) in grid.tiles.iter().enumerate() {
        if !tile.region.is_assigned() {
            continue;
        }
        for n in grid.adjacent(idx) {
            let other = grid.tiles[n].region;
            if !other.is_assigned() || other == tile.region {
                continue;
            }
            let (a, b) = if tile.region < other {
                (tile.region, other)
            } else {
                (other, tile.region)
            };
            if edges.insert((a, b)) {
                graph.add_edge(id_to_node[&a], id_to_node[&b], ());
            }
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Topology;
    use crate::terrain::Terrain;

    /// Карта из строк: `#` — суша, `.` — вода, `?` — неизвестно
    fn grid_from(rows: &[&str]) -> TileGrid {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let mut grid = TileGrid::new(
            width,
            height,
            Topology {
                wrap_x: false,
                wrap_y: false,
            },
            Terrain::Ocean,
        );
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                grid.get_mut(x as u32, y as u32).terrain = match c {
                    '#' => Terrain::Grassland,
                    '?' => Terrain::Unknown,
                    _ => Terrain::Ocean,
                };
            }
        }
        grid
    }

    #[test]
    fn test_ids_follow_discovery_order() {
        let mut grid = grid_from(&[
            "##....", //
            "##..#.", //
            "......", //
            "...#..", //
        ]);
        let table = assign_region_ids(&mut grid);

        assert_eq!(table.continent_count(), 3);
        assert_eq!(table.ocean_count(), 1);
        assert_eq!(grid.get(0, 0).region, RegionId(1));
        assert_eq!(grid.get(4, 1).region, RegionId(2));
        assert_eq!(grid.get(3, 3).region, RegionId(3));
        assert_eq!(grid.get(2, 0).region, RegionId(-1));
        assert_eq!(table.continents, vec![4, 1, 1]);
        assert_eq!(table.continent_size(RegionId(1)), Some(4));
        assert_eq!(table.continent_size(RegionId(3)), Some(1));
        assert_eq!(table.continent_size(RegionId(4)), None);
        assert_eq!(table.continent_size(RegionId(-1)), None);
        assert_eq!(table.total_size(), 24);
        assert_eq!(table.ocean(RegionId(-1)).unwrap().surrounder, Surrounder::Ambiguous);
    }

    #[test]
    fn test_diagonal_tiles_share_region() {
        let mut grid = grid_from(&[
            "#...", //
            ".#..", //
            "..#.", //
        ]);
        let table = assign_region_ids(&mut grid);
        assert_eq!(table.continent_count(), 1);
        assert_eq!(table.continents[0], 3);
    }

    #[test]
    fn test_lake_has_single_surrounder() {
        let mut grid = grid_from(&[
            "......", //
            ".####.", //
            ".#..#.", //
            ".####.", //
            "......", //
        ]);
        let table = assign_region_ids(&mut grid);
        // Внешнее море -1 найдено первым, озеро внутри — -2
        let lake = grid.get(2, 2).region;
        assert_eq!(lake, RegionId(-2));
        assert_eq!(table.lake_surrounder(lake), Some(RegionId(1)));
        assert_eq!(table.ocean(lake).unwrap().size, 2);
        // Внешнее море тоже видит только один континент
        assert_eq!(table.lake_surrounder(RegionId(-1)), Some(RegionId(1)));
    }

    #[test]
    fn test_unknown_tiles_stay_unassigned() {
        let mut grid = grid_from(&[
            "#?#", //
            "???", //
        ]);
        let table = assign_region_ids(&mut grid);
        assert_eq!(grid.get(1, 0).region, RegionId::UNASSIGNED);
        assert_eq!(table.continent_count(), 2);
        assert_eq!(table.total_size(), 2);
    }

    #[test]
    fn test_all_water_ocean_is_unset() {
        let mut grid = grid_from(&["...", "..."]);
        let table = assign_region_ids(&mut grid);
        assert_eq!(table.ocean(RegionId(-1)).unwrap().surrounder, Surrounder::Unset);
    }

    #[test]
    fn test_region_graph_links_neighbours() {
        let mut grid = grid_from(&[
            "#..#", //
            "#..#", //
        ]);
        assign_region_ids(&mut grid);
        let graph = region_graph(&grid);
        // Два континента и одно море между ними
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
    }
}
