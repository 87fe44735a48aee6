use crate::heightfield::HeightField;

// Replaces every sample with a distance-weighted average of its neighbourhood.
// Weight = 1 - distance / radius, so the centre counts fully and cells at the
// rim contribute nothing. Knocks out the high-frequency spikes racers hit.
pub struct WeightedSmoothing {
    radius: usize, // in grid cells
}

impl WeightedSmoothing {
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    pub fn apply(&self, field: &mut HeightField) {
        if self.radius == 0 {
            return;
        }
        let cols = field.cols();
        let rows = field.rows();
        let r = self.radius as isize;
        let radius = self.radius as f32;

        // Kernel offsets and weights, computed once
        let mut kernel = Vec::new();
        for dz in -r..=r {
            for dx in -r..=r {
                let d = ((dx * dx + dz * dz) as f32).sqrt();
                if d < radius {
                    kernel.push((dx, dz, 1.0 - d / radius));
                }
            }
        }

        // Read from a snapshot so the result does not depend on sweep order
        let source = field.heights().to_vec();
        let out = field.heights_mut();

        for z in 0..rows as isize {
            for x in 0..cols as isize {
                let mut sum = 0.0;
                let mut weight_sum = 0.0;
                for &(dx, dz, w) in &kernel {
                    let nx = x + dx;
                    let nz = z + dz;
                    if nx >= 0 && nz >= 0 && nx < cols as isize && nz < rows as isize {
                        sum += source[nz as usize * cols + nx as usize] * w;
                        weight_sum += w;
                    }
                }
                out[z as usize * cols + x as usize] = sum / weight_sum;
            }
        }
    }
}

// Thermal-erosion style slope cap. Instead of moving material over many
// iterations it lowers every sample to at most `talus` above each of its four
// neighbours, using one forward and one backward sweep (a city-block distance
// transform). Samples are only ever lowered, never below the field minimum.
pub struct TalusLimiter {
    talus: f32, // maximum height step between 4-neighbours
}

impl TalusLimiter {
    pub fn new(talus: f32) -> Self {
        Self { talus }
    }

    // A neighbour step of max_slope / (2·√2) keeps the central-difference
    // magnitude measured by `HeightField::slope` at or under max_slope.
    pub fn for_max_slope(max_slope: f32) -> Self {
        Self::new(max_slope / (2.0 * std::f32::consts::SQRT_2))
    }

    pub fn apply(&self, field: &mut HeightField) {
        let cols = field.cols();
        let rows = field.rows();
        let talus = self.talus;
        let h = field.heights_mut();

        // Forward: pull down from the left and upper neighbours
        for z in 0..rows {
            for x in 0..cols {
                let i = z * cols + x;
                let mut v = h[i];
                if x > 0 {
                    v = v.min(h[i - 1] + talus);
                }
                if z > 0 {
                    v = v.min(h[i - cols] + talus);
                }
                h[i] = v;
            }
        }

        // Backward: pull down from the right and lower neighbours
        for z in (0..rows).rev() {
            for x in (0..cols).rev() {
                let i = z * cols + x;
                let mut v = h[i];
                if x + 1 < cols {
                    v = v.min(h[i + 1] + talus);
                }
                if z + 1 < rows {
                    v = v.min(h[i + cols] + talus);
                }
                h[i] = v;
            }
        }
    }
}
