use palette::{Gradient, LinSrgb};

use crate::biome::Biome;
use crate::heightfield::HeightField;

const PEAK_BLEND_START: f32 = 0.55;

// Low-to-high colour ramp for one biome: valley floors take the terrain
// colour, the top of the range fades towards the biome's peak colour.
pub struct HeightGradient {
    gradient: Gradient<LinSrgb>,
}

impl HeightGradient {
    pub fn for_biome(biome: Biome) -> Self {
        let c = biome.config();
        let [r, g, b] = c.terrain_color;
        let [pr, pg, pb] = c.peak_color;
        let gradient = Gradient::with_domain(vec![
            (0.0, LinSrgb::new(r * 0.7, g * 0.7, b * 0.7)), // shadowed valleys
            (PEAK_BLEND_START, LinSrgb::new(r, g, b)),
            (1.0, LinSrgb::new(pr, pg, pb)),
        ]);
        Self { gradient }
    }

    pub fn color_at(&self, h: f32, min: f32, max: f32) -> [f32; 3] {
        let t = normalize(h, min, max);
        let c: LinSrgb = self.gradient.get(t);
        [c.red, c.green, c.blue]
    }

    pub fn rgb8_at(&self, h: f32, min: f32, max: f32) -> [u8; 3] {
        let c: LinSrgb = self.gradient.get(normalize(h, min, max));
        let rgb = c.into_format::<u8>();
        [rgb.red, rgb.green, rgb.blue]
    }
}

// Map h from [min, max] to [0, 1]; a flat range maps to the middle.
pub fn normalize(h: f32, min: f32, max: f32) -> f32 {
    if (max - min).abs() < f32::EPSILON {
        0.5
    } else {
        ((h - min) / (max - min)).clamp(0.0, 1.0)
    }
}

// Lambertian hillshade per grid vertex, light from the north-west at 45°.
// Border vertices get full light.
pub fn hillshade(field: &HeightField, z_scale: f32) -> Vec<f32> {
    let cols = field.cols();
    let rows = field.rows();
    let mut shade = vec![1.0; cols * rows];
    let azimuth = std::f32::consts::FRAC_PI_4;
    let altitude = std::f32::consts::FRAC_PI_4;
    let (sin_alt, cos_alt) = altitude.sin_cos();
    let light = [azimuth.cos() * cos_alt, azimuth.sin() * cos_alt, sin_alt];
    let step = 2.0 * field.resolution();

    for z in 1..rows.saturating_sub(1) {
        for x in 1..cols.saturating_sub(1) {
            let dzdx = (field.get(x + 1, z) - field.get(x - 1, z)) / step * z_scale;
            let dzdy = (field.get(x, z + 1) - field.get(x, z - 1)) / step * z_scale;
            let (nx, ny, nz) = (-dzdx, -dzdy, 1.0);
            let len = (nx * nx + ny * ny + nz * nz).sqrt();
            let dot = (nx * light[0] + ny * light[1] + nz * light[2]) / len;
            shade[z * cols + x] = dot.max(0.0);
        }
    }
    shade
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_handles_flat_ranges() {
        assert_eq!(normalize(3.0, 3.0, 3.0), 0.5);
        assert_eq!(normalize(5.0, 0.0, 10.0), 0.5);
        assert_eq!(normalize(-1.0, 0.0, 10.0), 0.0);
    }

    #[test]
    fn gradient_endpoints_follow_biome_colours() {
        let g = HeightGradient::for_biome(Biome::Snow);
        let top = g.color_at(10.0, 0.0, 10.0);
        let peak = Biome::Snow.config().peak_color;
        for i in 0..3 {
            assert!((top[i] - peak[i]).abs() < 1e-4);
        }
        let low = g.color_at(0.0, 0.0, 10.0);
        assert!(low[0] < top[0]);
    }

    #[test]
    fn flat_field_is_evenly_lit() {
        let field = HeightField::flat(5, 5, 1.0, 0.0);
        let shade = hillshade(&field, 1.0);
        let inner = shade[2 * 5 + 2];
        assert!((inner - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);
    }
}
