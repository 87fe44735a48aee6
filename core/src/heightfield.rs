// Height field storage, sampling, and the noise-driven generator.

use log::debug;

use crate::TerrainSurface;
use crate::biome::{BiomeConfig, RacingConstraints, racing_height_bounds};
use crate::error::{Result, TerrainError};
use crate::noise_source::NoiseSource;
use crate::smoothing::{TalusLimiter, WeightedSmoothing};

// Row-major grid of heights. Row index runs along z, column index along x;
// vertex `(col, row)` sits at `(origin_x + col * resolution, origin_z + row * resolution)`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    cols: usize,
    rows: usize,
    resolution: f32,
    origin_x: f32,
    origin_z: f32,
    heights: Vec<f32>,
}

// Number of samples covering `extent` world units at `resolution` spacing.
pub fn samples_for(extent: f32, resolution: f32) -> usize {
    (extent / resolution).floor() as usize + 1
}

impl HeightField {
    pub fn new(
        cols: usize,
        rows: usize,
        resolution: f32,
        origin_x: f32,
        origin_z: f32,
        heights: Vec<f32>,
    ) -> Result<Self> {
        if cols == 0 || rows == 0 || heights.len() != cols * rows {
            return Err(TerrainError::InvalidHeightMap(format!(
                "{} samples do not fill a {}x{} grid",
                heights.len(),
                cols,
                rows
            )));
        }
        if !(resolution > 0.0) {
            return Err(TerrainError::InvalidHeightMap(format!(
                "resolution {resolution} must be positive"
            )));
        }
        Ok(Self {
            cols,
            rows,
            resolution,
            origin_x,
            origin_z,
            heights,
        })
    }

    pub fn flat(cols: usize, rows: usize, resolution: f32, height: f32) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            resolution,
            origin_x: -((cols - 1) as f32 * resolution) / 2.0,
            origin_z: -((rows - 1) as f32 * resolution) / 2.0,
            heights: vec![height; cols * rows],
        }
    }

    // Rebuild a centred field from the nested `heightMap` of a level.
    pub fn from_nested(nested: &[Vec<f32>], width: f32, height: f32, resolution: f32) -> Result<Self> {
        let rows = nested.len();
        let cols = nested.first().map_or(0, Vec::len);
        if nested.iter().any(|row| row.len() != cols) {
            return Err(TerrainError::InvalidHeightMap("ragged rows".into()));
        }
        let heights: Vec<f32> = nested.iter().flatten().copied().collect();
        if heights.iter().any(|h| !h.is_finite()) {
            return Err(TerrainError::InvalidHeightMap("non-finite height".into()));
        }
        Self::new(cols, rows, resolution, -width / 2.0, -height / 2.0, heights)
    }

    pub fn to_nested(&self) -> Vec<Vec<f32>> {
        self.heights.chunks(self.cols).map(<[f32]>::to_vec).collect()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn origin(&self) -> (f32, f32) {
        (self.origin_x, self.origin_z)
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    pub(crate) fn heights_mut(&mut self) -> &mut [f32] {
        &mut self.heights
    }

    // World-space extent actually covered by the samples.
    pub fn extent(&self) -> (f32, f32) {
        (
            (self.cols - 1) as f32 * self.resolution,
            (self.rows - 1) as f32 * self.resolution,
        )
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> f32 {
        self.heights[row * self.cols + col]
    }

    #[inline]
    pub fn world_x(&self, col: usize) -> f32 {
        self.origin_x + col as f32 * self.resolution
    }

    #[inline]
    pub fn world_z(&self, row: usize) -> f32 {
        self.origin_z + row as f32 * self.resolution
    }

    // Continuous grid coordinates for a world position, `None` outside the field.
    pub fn grid_coords(&self, world_x: f32, world_z: f32) -> Option<(f32, f32)> {
        let gx = (world_x - self.origin_x) / self.resolution;
        let gz = (world_z - self.origin_z) / self.resolution;
        let max_x = (self.cols - 1) as f32;
        let max_z = (self.rows - 1) as f32;
        if gx.is_nan() || gz.is_nan() || gx < 0.0 || gz < 0.0 || gx > max_x || gz > max_z {
            return None;
        }
        Some((gx, gz))
    }

    // Nearest grid vertex to a world position, `None` outside the field.
    pub fn nearest_cell(&self, world_x: f32, world_z: f32) -> Option<(usize, usize)> {
        self.grid_coords(world_x, world_z)
            .map(|(gx, gz)| (gx.round() as usize, gz.round() as usize))
    }

    pub fn min_max(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)))
    }

    // Central-difference slope magnitude at a grid vertex. Border vertices have
    // no neighbour on one side and report 0.
    pub fn slope(&self, col: usize, row: usize) -> f32 {
        if col == 0 || row == 0 || col + 1 >= self.cols || row + 1 >= self.rows {
            return 0.0;
        }
        let dx = self.get(col + 1, row) - self.get(col - 1, row);
        let dz = self.get(col, row + 1) - self.get(col, row - 1);
        (dx * dx + dz * dz).sqrt()
    }

    // Bilinear height at a world position; 0 outside the field.
    pub fn height_at_position(&self, world_x: f32, world_z: f32) -> f32 {
        let Some((gx, gz)) = self.grid_coords(world_x, world_z) else {
            return 0.0;
        };

        let x0 = (gx.floor() as usize).min(self.cols - 1);
        let z0 = (gz.floor() as usize).min(self.rows - 1);
        let x1 = (x0 + 1).min(self.cols - 1);
        let z1 = (z0 + 1).min(self.rows - 1);
        let tx = gx - x0 as f32;
        let tz = gz - z0 as f32;

        let h00 = self.get(x0, z0);
        let h10 = self.get(x1, z0);
        let h01 = self.get(x0, z1);
        let h11 = self.get(x1, z1);

        let h0 = h00 + (h10 - h00) * tx;
        let h1 = h01 + (h11 - h01) * tx;
        h0 + (h1 - h0) * tz
    }
}

impl TerrainSurface for HeightField {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        self.height_at_position(x, z)
    }
}

// Turns noise into heights for one biome, optionally constrained for racing.
pub struct HeightFieldGenerator<'a> {
    noise: &'a NoiseSource,
    biome: &'static BiomeConfig,
    racing: Option<RacingConstraints>,
}

impl<'a> HeightFieldGenerator<'a> {
    pub fn new(
        noise: &'a NoiseSource,
        biome: &'static BiomeConfig,
        racing: Option<RacingConstraints>,
    ) -> Self {
        Self {
            noise,
            biome,
            racing,
        }
    }

    pub fn generate(
        &self,
        start_x: f32,
        start_z: f32,
        width: f32,
        height: f32,
        resolution: f32,
    ) -> Result<HeightField> {
        let cols = samples_for(width, resolution);
        let rows = samples_for(height, resolution);
        let scale = self.biome.height_scale;
        let bounds = self.racing.map(|_| racing_height_bounds(scale));

        let mut heights = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            let z = start_z + row as f32 * resolution;
            for col in 0..cols {
                let x = start_x + col as f32 * resolution;
                let mut h = self.noise.height(x, z) * scale;
                if let Some((lo, hi)) = bounds {
                    h = h.clamp(lo, hi);
                }
                heights.push(h);
            }
        }

        let mut field = HeightField::new(cols, rows, resolution, start_x, start_z, heights)?;

        if let Some(racing) = self.racing {
            WeightedSmoothing::new(racing.smoothing_radius).apply(&mut field);
            TalusLimiter::for_max_slope(racing.max_slope).apply(&mut field);
        }

        if field.heights().iter().any(|h| !h.is_finite()) {
            return Err(TerrainError::GenerationFailed(
                "height field contains non-finite samples".into(),
            ));
        }

        let (lo, hi) = field.min_max();
        debug!(
            "height field {}x{} @ {} (racing: {}), heights {:.2}..{:.2}",
            cols,
            rows,
            resolution,
            self.racing.is_some(),
            lo,
            hi
        );
        Ok(field)
    }
}
