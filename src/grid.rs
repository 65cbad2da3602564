//! Сетка клеток карты
//!
//! Хранит клетки в растровом порядке и знает топологию: соседей с учётом
//! зацикливания, подсчёт местности вокруг клетки, квадратные окрестности.

use image::{ImageBuffer, Rgb};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

use crate::climate::TemperatureBand;
use crate::config::Topology;
use crate::terrain::{Specials, Terrain};

/// Кардинальные направления: север, восток, юг, запад
pub const CARDINAL: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Все восемь соседей
pub const ADJACENT: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Номер региона: > 0 — континент, < 0 — океан или озеро, 0 — не назначен
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct RegionId(pub i32);

impl RegionId {
    pub const UNASSIGNED: RegionId = RegionId(0);

    #[must_use]
    pub fn is_continent(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub fn is_ocean(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub terrain: Terrain,
    pub specials: Specials,
    pub region: RegionId,
    /// Высота 0..=1000
    pub elevation: i32,
    pub band: TemperatureBand,
}

impl Tile {
    #[must_use]
    pub fn has(&self, special: Specials) -> bool {
        self.specials.contains(special)
    }

    #[must_use]
    pub fn is_water(&self) -> bool {
        self.terrain.is_water()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub topology: Topology,
    pub tiles: Vec<Tile>,
}

impl TileGrid {
    /// Создаёт карту, целиком покрытую заданной местностью
    #[must_use]
    pub fn new(width: u32, height: u32, topology: Topology, fill: Terrain) -> Self {
        let tiles = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| Tile {
                x,
                y,
                terrain: fill,
                specials: Specials::NONE,
                region: RegionId::UNASSIGNED,
                elevation: 0,
                band: TemperatureBand::Temperate,
            })
            .collect();
        Self {
            width,
            height,
            topology,
            tiles,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[must_use]
    pub fn index(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    #[must_use]
    pub fn coords(&self, idx: usize) -> (u32, u32) {
        let w = self.width as usize;
        ((idx % w) as u32, (idx / w) as u32)
    }

    pub fn get(&self, x: u32, y: u32) -> &Tile {
        &self.tiles[self.index(x, y)]
    }

    pub fn get_mut(&mut self, x: u32, y: u32) -> &mut Tile {
        let idx = self.index(x, y);
        &mut self.tiles[idx]
    }

    /// Приводит произвольные координаты к индексу с учётом зацикливания.
    /// `None`, если координата за краем незацикленной оси.
    #[must_use]
    pub fn normalize(&self, x: i32, y: i32) -> Option<usize> {
        let w = self.width as i32;
        let h = self.height as i32;
        let nx = if self.topology.wrap_x {
            x.rem_euclid(w)
        } else if (0..w).contains(&x) {
            x
        } else {
            return None;
        };
        let ny = if self.topology.wrap_y {
            y.rem_euclid(h)
        } else if (0..h).contains(&y) {
            y
        } else {
            return None;
        };
        Some((ny * w + nx) as usize)
    }

    fn offsets<'a>(
        &'a self,
        idx: usize,
        offsets: &'a [(i32, i32)],
    ) -> impl Iterator<Item = usize> + 'a {
        let (x, y) = self.coords(idx);
        offsets
            .iter()
            .filter_map(move |&(dx, dy)| self.normalize(x as i32 + dx, y as i32 + dy))
    }

    /// Существующие кардинальные соседи в порядке С, В, Ю, З
    pub fn cardinal(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.offsets(idx, &CARDINAL)
    }

    /// Существующие соседи по всем восьми направлениям
    pub fn adjacent(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.offsets(idx, &ADJACENT)
    }

    /// Клетки квадрата радиуса `radius` вокруг `idx` (включая центр)
    pub fn square(&self, idx: usize, radius: i32) -> impl Iterator<Item = usize> + '_ {
        let (x, y) = self.coords(idx);
        (-radius..=radius).flat_map(move |dy| {
            (-radius..=radius)
                .filter_map(move |dx| self.normalize(x as i32 + dx, y as i32 + dy))
        })
    }

    /// Процент соседей, удовлетворяющих условию (0..=100)
    pub fn percent_near(
        &self,
        idx: usize,
        cardinal_only: bool,
        pred: impl Fn(&Tile) -> bool,
    ) -> i32 {
        let (mut total, mut matching) = (0, 0);
        let offsets: &[(i32, i32)] = if cardinal_only { &CARDINAL } else { &ADJACENT };
        for n in self.offsets(idx, offsets) {
            total += 1;
            if pred(&self.tiles[n]) {
                matching += 1;
            }
        }
        if total == 0 { 0 } else { matching * 100 / total }
    }

    /// Количество соседей, удовлетворяющих условию
    pub fn count_near(&self, idx: usize, cardinal_only: bool, pred: impl Fn(&Tile) -> bool) -> usize {
        let offsets: &[(i32, i32)] = if cardinal_only { &CARDINAL } else { &ADJACENT };
        self.offsets(idx, offsets)
            .filter(|&n| pred(&self.tiles[n]))
            .count()
    }

    /// Есть ли у клетки кардинальный сосед-вода
    #[must_use]
    pub fn is_card_adjacent_to_water(&self, idx: usize) -> bool {
        self.cardinal(idx).any(|n| self.tiles[n].is_water())
    }

    #[must_use]
    pub fn land_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.terrain.is_land()).count()
    }

    #[must_use]
    pub fn count_terrain(&self, terrain: Terrain) -> usize {
        self.tiles.iter().filter(|t| t.terrain == terrain).count()
    }

    #[must_use]
    pub fn count_special(&self, special: Specials) -> usize {
        self.tiles.iter().filter(|t| t.has(special)).count()
    }

    /// Расстояние (по кардинальным шагам) до ближайшей клетки-источника.
    /// Источники имеют расстояние 0; недостижимые клетки — `u32::MAX`.
    pub fn distance_from(&self, is_source: impl Fn(&Tile) -> bool) -> Vec<u32> {
        let mut distance = vec![u32::MAX; self.len()];
        let mut queue = VecDeque::new();

        for (idx, tile) in self.tiles.iter().enumerate() {
            if is_source(tile) {
                distance[idx] = 0;
                queue.push_back(idx);
            }
        }

        while let Some(idx) = queue.pop_front() {
            let base = distance[idx];
            for n in self.cardinal(idx) {
                if distance[n] == u32::MAX {
                    distance[n] = base.saturating_add(1);
                    queue.push_back(n);
                }
            }
        }
        distance
    }

    /// Цветной отладочный предпросмотр: одна клетка — один пиксель, реки выделены
    #[must_use]
    pub fn to_rgb_image(&self) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            let tile = self.get(x, y);
            if tile.has(Specials::RIVER) {
                Rgb([40, 90, 230])
            } else if tile.has(Specials::HUT) {
                Rgb([200, 40, 40])
            } else {
                Rgb(tile.terrain.to_rgb())
            }
        })
    }

    pub fn save_preview_png(&self, path: impl AsRef<Path>) -> image::ImageResult<()> {
        self.to_rgb_image().save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(w: u32, h: u32, wrap_x: bool, wrap_y: bool) -> TileGrid {
        TileGrid::new(w, h, Topology { wrap_x, wrap_y }, Terrain::Ocean)
    }

    #[test]
    fn test_normalize_respects_topology() {
        let g = grid(10, 6, true, false);
        assert_eq!(g.normalize(-1, 0), Some(9));
        assert_eq!(g.normalize(10, 1), Some(10));
        assert_eq!(g.normalize(0, -1), None);
        assert_eq!(g.normalize(0, 6), None);

        let flat = grid(10, 6, false, false);
        assert_eq!(flat.normalize(-1, 0), None);

        let torus = grid(10, 6, true, true);
        assert_eq!(torus.normalize(-1, -1), Some(5 * 10 + 9));
    }

    #[test]
    fn test_corner_neighbours() {
        let flat = grid(5, 5, false, false);
        assert_eq!(flat.cardinal(0).count(), 2);
        assert_eq!(flat.adjacent(0).count(), 3);
        // Порядок С, В, Ю, З
        let center = flat.index(2, 2);
        let order: Vec<_> = flat.cardinal(center).map(|i| flat.coords(i)).collect();
        assert_eq!(order, [(2, 1), (3, 2), (2, 3), (1, 2)]);

        let wrapped = grid(5, 5, true, false);
        assert_eq!(wrapped.cardinal(0).count(), 3);
        assert_eq!(wrapped.adjacent(0).count(), 5);
    }

    #[test]
    fn test_percent_near_counts_existing_neighbours_only() {
        let mut g = grid(5, 5, false, false);
        g.get_mut(1, 0).terrain = Terrain::Grassland;
        // У угла два кардинальных соседа, один из них суша
        assert_eq!(g.percent_near(0, true, |t| t.terrain.is_land()), 50);
        assert_eq!(g.count_near(0, false, |t| t.is_water()), 2);
    }

    #[test]
    fn test_square_radius() {
        let g = grid(9, 9, false, false);
        assert_eq!(g.square(g.index(4, 4), 2).count(), 25);
        assert_eq!(g.square(0, 1).count(), 4);
    }

    #[test]
    fn test_distance_from_water() {
        let mut g = grid(6, 1, false, false);
        for x in 1..6 {
            g.get_mut(x, 0).terrain = Terrain::Grassland;
        }
        let d = g.distance_from(Tile::is_water);
        assert_eq!(d, vec![0, 1, 2, 3, 4, 5]);

        let none = g.distance_from(|t| t.terrain == Terrain::Glacier);
        assert!(none.iter().all(|&v| v == u32::MAX));
    }

    #[test]
    fn test_preview_image_size() {
        let mut g = grid(4, 3, true, false);
        g.get_mut(0, 0).specials.insert(Specials::RIVER);
        let img = g.to_rgb_image();
        assert_eq!(img.dimensions(), (4, 3));
        assert_eq!(img.get_pixel(0, 0), &Rgb([40, 90, 230]));
        assert_eq!(img.get_pixel(1, 0), &Rgb(Terrain::Ocean.to_rgb()));
    }
}
