use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use rand::{Rng, RngCore};
use rand_chacha::ChaCha8Rng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::climate::ClimateLevels;
use crate::config::{Generator, Topology, WorldGenerationParams};
use crate::grid::TileGrid;

/// Максимальная высота после выравнивания
pub const HMAP_MAX_LEVEL: i32 = 1000;

/// Двумерная карта высот: значения от 0 (глубокий океан) до `HMAP_MAX_LEVEL` (высокие горы)
#[derive(Debug, Clone)]
pub struct Heightmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<i32>,
}

impl Heightmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width * height) as usize],
        }
    }

    /// Выравнивает гистограмму: значение клетки становится её рангом, растянутым на 0..`HMAP_MAX_LEVEL`.
    ///
    /// После этого доля клеток выше любого порога совпадает с долей диапазона над ним,
    /// поэтому уровень берега точно задаёт долю суши.
    pub fn equalize_from(&mut self, raw: &[f32]) {
        let n = raw.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| raw[a].total_cmp(&raw[b]).then(a.cmp(&b)));
        for (rank, idx) in order.into_iter().enumerate() {
            self.data[idx] = (rank as i64 * i64::from(HMAP_MAX_LEVEL) / n as i64) as i32;
        }
    }
}

/// Генерирует карту высот выбранным алгоритмом и записывает её в `out`
pub fn generate_heightmap(
    grid: &TileGrid,
    params: &WorldGenerationParams,
    levels: &ClimateLevels,
    rng: &mut ChaCha8Rng,
    out: &mut Heightmap,
) {
    let mut raw = match params.generator {
        Generator::Fractal => fractal_noise(grid, rng.next_u32() as i32),
        _ => random_noise(grid, params, rng),
    };

    if levels.has_poles() {
        flatten_poles(grid, levels, &mut raw);
    }

    out.equalize_from(&raw);
}

/// Случайный шум, сглаженный несколько раз
fn random_noise(
    grid: &TileGrid,
    params: &WorldGenerationParams,
    rng: &mut ChaCha8Rng,
) -> Vec<f32> {
    let sqsize = ((grid.len() as f64 / 1000.0).sqrt()) as i32;
    let passes = (1 + sqsize - params.players as i32 / 4).max(1);
    let spread = HMAP_MAX_LEVEL * passes;

    let mut data: Vec<f32> = (0..grid.len())
        .map(|_| rng.gen_range(0..spread) as f32)
        .collect();

    for _ in 0..passes {
        smooth_heightmap(
            &mut data,
            grid.width as usize,
            grid.height as usize,
            1,
            grid.topology,
        );
    }
    data
}

/// Фрактальный шум (FBm) с бесшовностью по зацикленной оси X
fn fractal_noise(grid: &TileGrid, seed: i32) -> Vec<f32> {
    let width = grid.width as usize;
    let width_f = grid.width as f32;
    let wrap_x = grid.topology.wrap_x;

    // Параметры для цилиндрической проекции
    let radius = width_f / (2.0 * std::f32::consts::PI);

    let mut noise = FastNoiseLite::new();
    noise.set_seed(Some(seed));
    noise.set_noise_type(Some(NoiseType::OpenSimplex2));
    noise.set_fractal_type(Some(FractalType::FBm));
    noise.set_fractal_octaves(Some(5));
    // Частота: несколько крупных массивов на карту независимо от размера
    noise.set_frequency(Some(6.0 / grid.width.max(grid.height) as f32));

    let sample = |i: usize| -> f32 {
        let x = (i % width) as f32;
        let y = (i / width) as f32;
        let value = if wrap_x {
            let angle = (x / width_f) * 2.0 * std::f32::consts::PI;
            noise.get_noise_3d(radius * angle.cos(), y, radius * angle.sin())
        } else {
            noise.get_noise_2d(x, y)
        };
        (value + 1.0) * 0.5
    };

    #[cfg(feature = "parallel")]
    let mut data: Vec<f32> = (0..grid.len()).into_par_iter().map(sample).collect();
    #[cfg(not(feature = "parallel"))]
    let mut data: Vec<f32> = (0..grid.len()).map(sample).collect();

    apply_thermal_erosion(grid, &mut data, 3, 0.015);
    data
}

/// Опускает рельеф у полюсов, чтобы полярная суша была редкой
fn flatten_poles(grid: &TileGrid, levels: &ClimateLevels, data: &mut [f32]) {
    let pole_zone = 2.5 * levels.ice_base as f32;
    for (idx, h) in data.iter_mut().enumerate() {
        let warmth = levels.warmth(grid, idx) as f32;
        if warmth < pole_zone {
            *h *= 0.1 + 0.9 * warmth / pole_zone;
        }
    }
}

/// Термальная эрозия (гравитационное выветривание) с учётом топологии
fn apply_thermal_erosion(grid: &TileGrid, data: &mut [f32], iterations: usize, talus_angle: f32) {
    let mut temp_data = data.to_vec();

    for _ in 0..iterations {
        for idx in 0..data.len() {
            let current_height = data[idx];
            let mut max_diff = 0.0;
            let mut target_idx = idx;

            for nidx in grid.cardinal(idx) {
                let diff = current_height - data[nidx];
                if diff > max_diff {
                    max_diff = diff;
                    target_idx = nidx;
                }
            }

            // Если перепад больше порога — перераспределяем
            if max_diff > talus_angle {
                let move_amount = (max_diff - talus_angle) * 0.3;
                temp_data[idx] -= move_amount;
                temp_data[target_idx] += move_amount;
            }
        }
        data.copy_from_slice(&temp_data);
    }
}

fn wrap_or_clamp(v: i32, len: usize, wrap: bool) -> usize {
    if wrap {
        v.rem_euclid(len as i32) as usize
    } else {
        v.clamp(0, len as i32 - 1) as usize
    }
}

/// Сглаживание через среднее (3×3, 5×5 и т.д.): по зацикленной оси окно переходит через край, по остальной — прижимается
pub fn smooth_heightmap(
    data: &mut [f32],
    width: usize,
    height: usize,
    radius: usize,
    topology: Topology,
) {
    if radius == 0 || radius >= width || radius >= height {
        return;
    }

    let mut temp = vec![0.0; data.len()];
    let r = radius as i32;
    let count = (2 * r + 1) as f32;

    // 1. Горизонтальный проход
    for y in 0..height {
        let row_offset = y * width;
        let mut window_sum = 0.0;

        for dx in -r..=r {
            window_sum += data[row_offset + wrap_or_clamp(dx, width, topology.wrap_x)];
        }

        for x in 0..width {
            temp[row_offset + x] = window_sum / count;

            // Сдвигаем окно: убираем левый пиксель, добавляем правый
            let left = wrap_or_clamp(x as i32 - r, width, topology.wrap_x);
            let right = wrap_or_clamp(x as i32 + r + 1, width, topology.wrap_x);
            window_sum = window_sum - data[row_offset + left] + data[row_offset + right];
        }
    }

    // 2. Вертикальный проход
    for x in 0..width {
        let mut window_sum = 0.0;

        for dy in -r..=r {
            window_sum += temp[wrap_or_clamp(dy, height, topology.wrap_y) * width + x];
        }

        for y in 0..height {
            data[y * width + x] = window_sum / count;

            let top = wrap_or_clamp(y as i32 - r, height, topology.wrap_y);
            let bottom = wrap_or_clamp(y as i32 + r + 1, height, topology.wrap_y);
            window_sum = window_sum - temp[top * width + x] + temp[bottom * width + x];
        }
    }
}
