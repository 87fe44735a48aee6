// Cached height lookups for gameplay code that samples the same spots
// every tick (players standing still, obstacle bases, portals).

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::TerrainSurface;
use crate::heightfield::HeightField;

const DEFAULT_CAPACITY: usize = 4096;

pub struct TerrainQuery {
    field: HeightField,
    max_slope: f32,
    cache: Mutex<LruCache<(u32, u32), f32>>,
}

impl TerrainQuery {
    pub fn new(field: HeightField, max_slope: f32) -> Self {
        Self::with_capacity(field, max_slope, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(field: HeightField, max_slope: f32, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            field,
            max_slope,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn field(&self) -> &HeightField {
        &self.field
    }

    // Same answer as `HeightField::height_at_position`; the cache is keyed on
    // the exact coordinates.
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        if !x.is_finite() || !z.is_finite() {
            return 0.0;
        }
        let key = (x.to_bits(), z.to_bits());

        // a poisoned cache only ever holds plain floats, keep using it
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(&h) = cache.get(&key) {
            return h;
        }
        let h = self.field.height_at_position(x, z);
        cache.put(key, h);
        h
    }

    // Inside the field with a cell of margin, and no steeper than max_slope.
    pub fn is_suitable_for_placement(&self, x: f32, z: f32) -> bool {
        let Some((col, row)) = self.field.nearest_cell(x, z) else {
            return false;
        };
        if col < 1 || row < 1 || col + 1 >= self.field.cols() || row + 1 >= self.field.rows() {
            return false;
        }
        self.field.slope(col, row) <= self.max_slope
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.lock().map_or(0, |c| c.len())
    }

    pub fn clear_cache(&self) {
        if let Ok(mut c) = self.cache.lock() {
            c.clear();
        }
    }
}

impl TerrainSurface for TerrainQuery {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        TerrainQuery::height_at(self, x, z)
    }
}
