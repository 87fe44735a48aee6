use crate::NoiseField;
use crate::config::FbmParams;

// Single-octave 2D Perlin lattice. Octave summation lives in `fbm` so one
// lattice can serve channels with different fractal parameters.
pub struct Perlin2D {
    seed: u64,
    perm: [u8; 512], // permutation table (256 duplicated)
}

impl Perlin2D {
    pub fn new(seed: u64) -> Self {
        // build a pseudorandom permutation table of size 256, duplicated into 512
        let mut p: Vec<u8> = (0..256).map(|i| i as u8).collect();
        // xorshift stream, identical on every platform
        let mut x = seed ^ 0xDEADBEEFCAFEBABE_u64;
        let mut rng = || {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            x
        };
        // Fisher–Yates shuffle p[0..256]
        for i in (1..256).rev() {
            let j = (rng() % (i as u64 + 1)) as usize;
            p.swap(i, j);
        }
        // Duplicated so corner lookups never need a modulo
        let mut perm = [0u8; 512];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = p[i & 255];
        }

        Self { seed, perm }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    // 6t^5 − 15t^4 + 10t^3, zero first and second derivative at the cell edges
    #[inline]
    fn fade(t: f64) -> f64 {
        t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
    }

    #[inline]
    fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + t * (b - a)
    }

    // Pick one of the gradient directions from the low hash bits and dot it with (x, y)
    #[inline]
    fn grad(hash: u8, x: f64, y: f64) -> f64 {
        let h = hash & 0x7;
        let u = if h < 4 { x } else { y };
        let v = if h < 4 { y } else { x };
        let su = if (h & 1) == 0 { u } else { -u };
        let sv = if (h & 2) == 0 { v } else { -v };
        su + sv * 0.5
    }

    // Raw single-octave noise, roughly in [-1, 1]
    pub fn noise(&self, x: f64, y: f64) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let xi = (x0 as i64 & 255) as usize;
        let yi = (y0 as i64 & 255) as usize;
        let xf = x - x0;
        let yf = y - y0;
        let u = Self::fade(xf);
        let v = Self::fade(yf);

        let a = self.perm[xi] as usize;
        let b = self.perm[xi + 1] as usize;
        let aa = self.perm[a + yi];
        let ab = self.perm[a + yi + 1];
        let ba = self.perm[b + yi];
        let bb = self.perm[b + yi + 1];

        let x1 = Self::lerp(Self::grad(aa, xf, yf), Self::grad(ba, xf - 1.0, yf), u);
        let x2 = Self::lerp(
            Self::grad(ab, xf, yf - 1.0),
            Self::grad(bb, xf - 1.0, yf - 1.0),
            u,
        );
        Self::lerp(x1, x2, v)
    }
}

impl NoiseField for Perlin2D {
    fn sample(&self, x: f64, z: f64) -> f64 {
        self.noise(x, z)
    }
}

// Fractal Brownian motion: octaves at growing frequency and shrinking amplitude.
// The sum is left unnormalized, so with persistence 0.5 it spans about [-2, 2].
pub fn fbm(field: &dyn NoiseField, x: f64, z: f64, params: &FbmParams) -> f64 {
    let mut amplitude = 1.0;
    let mut freq = params.frequency;
    let mut total = 0.0;

    for _ in 0..params.octaves {
        total += field.sample(x * freq, z * freq) * amplitude;
        amplitude *= params.persistence;
        freq *= params.lacunarity;
    }
    total
}

// Same sum divided by the total amplitude, then remapped to [0, 1].
pub fn fbm_unit(field: &dyn NoiseField, x: f64, z: f64, params: &FbmParams) -> f64 {
    let mut max_amp = 0.0;
    let mut amplitude = 1.0;
    for _ in 0..params.octaves {
        max_amp += amplitude;
        amplitude *= params.persistence;
    }
    if max_amp <= 0.0 {
        return 0.5;
    }
    let n = fbm(field, x, z, params) / max_amp;
    ((n + 1.0) * 0.5).clamp(0.0, 1.0)
}
