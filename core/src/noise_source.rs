// Seeded scalar fields driving terrain and vegetation.

use crate::config::{FbmParams, GenerationTuning};
use crate::perlin2::{Perlin2D, fbm, fbm_unit};

pub const MOISTURE_SEED_OFFSET: u64 = 1000;
pub const TEMPERATURE_SEED_OFFSET: u64 = 2000;
pub const DENSITY_SEED_OFFSET: u64 = 3000;
pub const PLACEMENT_SEED_OFFSET: u64 = 4000;
pub const TYPE_SEED_OFFSET: u64 = 5000;

pub struct NoiseSource {
    seed: u64,
    height: Perlin2D,
    moisture: Perlin2D,
    temperature: Perlin2D,
    density: Perlin2D,
    placement: Perlin2D,
    kind: Perlin2D,
    height_params: FbmParams,
    moisture_params: FbmParams,
    temperature_params: FbmParams,
    density_params: FbmParams,
    placement_params: FbmParams,
    kind_params: FbmParams,
    placement_threshold: f64,
}

impl NoiseSource {
    pub fn new(seed: u64, tuning: &GenerationTuning) -> Self {
        let lattice = |offset: u64| Perlin2D::new(seed.wrapping_add(offset));
        Self {
            seed,
            height: lattice(0),
            moisture: lattice(MOISTURE_SEED_OFFSET),
            temperature: lattice(TEMPERATURE_SEED_OFFSET),
            density: lattice(DENSITY_SEED_OFFSET),
            placement: lattice(PLACEMENT_SEED_OFFSET),
            kind: lattice(TYPE_SEED_OFFSET),
            height_params: tuning.height,
            moisture_params: tuning.moisture,
            temperature_params: tuning.temperature,
            density_params: tuning.vegetation_density,
            placement_params: FbmParams::new(1, tuning.placement_frequency, 0.5),
            kind_params: FbmParams::new(2, tuning.type_frequency, 0.5),
            placement_threshold: tuning.placement_threshold,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    // Unnormalized, roughly [-2, 2]; the biome height scale turns it into world units.
    pub fn height(&self, x: f32, z: f32) -> f32 {
        fbm(&self.height, x as f64, z as f64, &self.height_params) as f32
    }

    pub fn moisture(&self, x: f32, z: f32) -> f32 {
        fbm_unit(&self.moisture, x as f64, z as f64, &self.moisture_params) as f32
    }

    pub fn temperature(&self, x: f32, z: f32) -> f32 {
        fbm_unit(&self.temperature, x as f64, z as f64, &self.temperature_params) as f32
    }

    pub fn vegetation_density(&self, x: f32, z: f32) -> f32 {
        fbm_unit(&self.density, x as f64, z as f64, &self.density_params) as f32
    }

    // Hard gate: a single octave compared against a fixed threshold.
    pub fn should_place_vegetation(&self, x: f32, z: f32) -> bool {
        fbm_unit(&self.placement, x as f64, z as f64, &self.placement_params)
            > self.placement_threshold
    }

    // Low-frequency selector in [0, 1] used to index a biome's vegetation list.
    pub fn vegetation_kind(&self, x: f32, z: f32) -> f32 {
        fbm_unit(&self.kind, x as f64, z as f64, &self.kind_params) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(seed: u64) -> NoiseSource {
        NoiseSource::new(seed, &GenerationTuning::default())
    }

    #[test]
    fn channels_are_pure_functions_of_seed() {
        let a = source(42);
        let b = source(42);
        for i in 0..100 {
            let (x, z) = (i as f32 * 3.3 - 50.0, i as f32 * -1.9 + 10.0);
            assert_eq!(a.height(x, z).to_bits(), b.height(x, z).to_bits());
            assert_eq!(a.moisture(x, z).to_bits(), b.moisture(x, z).to_bits());
            assert_eq!(a.should_place_vegetation(x, z), b.should_place_vegetation(x, z));
        }
    }

    #[test]
    fn normalized_channels_stay_in_unit_range() {
        let n = source(7);
        for i in 0..300 {
            let (x, z) = (i as f32 * 7.1, i as f32 * 2.3 - 300.0);
            for v in [
                n.moisture(x, z),
                n.temperature(x, z),
                n.vegetation_density(x, z),
                n.vegetation_kind(x, z),
            ] {
                assert!((0.0..=1.0).contains(&v));
            }
            assert!(n.height(x, z).abs() <= 3.0);
        }
    }

    #[test]
    fn height_and_moisture_are_decorrelated() {
        let n = source(3);
        let same = (0..100)
            .map(|i| i as f32 * 5.7)
            .filter(|&t| {
                let h = (n.height(t, t) / 4.0 + 0.5).clamp(0.0, 1.0);
                (h - n.moisture(t, t)).abs() < 1e-6
            })
            .count();
        assert!(same < 100);
    }
}
