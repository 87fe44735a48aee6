// Vegetation placement: blue-noise candidates filtered by noise, slope and
// biome density, then dressed with a type, scale and rotation.

use glam::Vec3;
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::biome::{BiomeConfig, VegetationType};
use crate::config::GenerationTuning;
use crate::heightfield::HeightField;
use crate::noise_source::NoiseSource;
use crate::poisson::PoissonDisk;

pub const POISSON_SEED_OFFSET: u64 = 6000;
pub const JITTER_SEED_OFFSET: u64 = 7000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VegetationItem {
    pub position: Vec3,
    pub vegetation_type: VegetationType,
    pub scale: f32,
    pub rotation: f32,
}

// Why a candidate point was dropped; handy for tuning logs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlacementStats {
    pub candidates: usize,
    pub gated: usize,
    pub out_of_bounds: usize,
    pub too_steep: usize,
    pub too_sparse: usize,
    pub accepted: usize,
}

pub struct VegetationPlacer<'a> {
    noise: &'a NoiseSource,
    biome: &'static BiomeConfig,
    tuning: &'a GenerationTuning,
}

impl<'a> VegetationPlacer<'a> {
    pub fn new(noise: &'a NoiseSource, biome: &'static BiomeConfig, tuning: &'a GenerationTuning) -> Self {
        Self {
            noise,
            biome,
            tuning,
        }
    }

    // Denser biomes pack vegetation tighter.
    pub fn min_distance(&self) -> f32 {
        self.tuning.vegetation_base_spacing * (1.0 - self.biome.vegetation_density * 0.7)
    }

    pub fn place(
        &self,
        field: &HeightField,
        start_x: f32,
        start_z: f32,
        map_width: f32,
        map_height: f32,
        resolution: f32,
    ) -> Vec<VegetationItem> {
        self.place_with_stats(field, start_x, start_z, map_width, map_height, resolution)
            .0
    }

    pub fn place_with_stats(
        &self,
        field: &HeightField,
        start_x: f32,
        start_z: f32,
        map_width: f32,
        map_height: f32,
        resolution: f32,
    ) -> (Vec<VegetationItem>, PlacementStats) {
        let seed = self.noise.seed();
        let min_distance = self.min_distance();
        let disk = PoissonDisk::new(
            map_width,
            map_height,
            min_distance,
            min_distance * 1.5,
            self.tuning.poisson_attempts,
        );
        let candidates = disk.sample(&mut ChaCha8Rng::seed_from_u64(
            seed.wrapping_add(POISSON_SEED_OFFSET),
        ));
        let mut jitter = ChaCha8Rng::seed_from_u64(seed.wrapping_add(JITTER_SEED_OFFSET));

        let mut stats = PlacementStats {
            candidates: candidates.len(),
            ..PlacementStats::default()
        };
        let mut items = Vec::new();
        let types = self.biome.vegetation_types;
        let variation = self.tuning.scale_variation;

        for [px, pz] in candidates {
            let x = start_x + px;
            let z = start_z + pz;

            if !self.noise.should_place_vegetation(x, z) {
                stats.gated += 1;
                continue;
            }

            // One cell of margin so the slope has neighbours on every side
            let col = ((x - field.origin().0) / resolution).round();
            let row = ((z - field.origin().1) / resolution).round();
            if col < 1.0
                || row < 1.0
                || col > field.cols() as f32 - 2.0
                || row > field.rows() as f32 - 2.0
            {
                stats.out_of_bounds += 1;
                continue;
            }

            if field.slope(col as usize, row as usize) > self.tuning.vegetation_max_slope {
                stats.too_steep += 1;
                continue;
            }

            if self.noise.vegetation_density(x, z) < 1.0 - self.biome.vegetation_density {
                stats.too_sparse += 1;
                continue;
            }

            let pick = self.noise.vegetation_kind(x, z);
            let index = ((pick * types.len() as f32) as usize).min(types.len() - 1);
            let vegetation_type = types[index];
            let scale = vegetation_type.base_scale() * (1.0 + jitter.gen_range(-variation..=variation));
            let rotation = jitter.gen_range(0.0..std::f32::consts::TAU);

            items.push(VegetationItem {
                position: Vec3::new(x, field.height_at_position(x, z), z),
                vegetation_type,
                scale,
                rotation,
            });
        }

        stats.accepted = items.len();
        debug!("vegetation placement: {stats:?} (min distance {min_distance:.2})");
        (items, stats)
    }
}
