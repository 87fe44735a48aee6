// Static biome catalog and the racing constraints that go with it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Biome {
    Forest,
    Desert,
    Snow,
    Grassland,
    Volcanic,
}

// Geometry used to draw a vegetation type; no models are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Cone,
    Sphere,
    Cylinder,
    Box,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VegetationType {
    PineTree,
    OakTree,
    Bush,
    Cactus,
    Rock,
    DeadTree,
    SnowPine,
    Boulder,
}

pub struct BiomeConfig {
    pub height_scale: f32,
    pub vegetation_density: f32,
    pub vegetation_types: &'static [VegetationType],
    pub terrain_color: [f32; 3],
    // colour the terrain fades to at its highest points
    pub peak_color: [f32; 3],
    pub moisture_range: (f32, f32),
    pub temperature_range: (f32, f32),
}

// Per-biome presentation metadata carried in `LevelData.metadata`.
pub struct LevelTheme {
    pub difficulty: u8,
    pub theme: &'static str,
    pub mood: &'static str,
}

static FOREST: BiomeConfig = BiomeConfig {
    height_scale: 12.0,
    vegetation_density: 0.7,
    vegetation_types: &[
        VegetationType::PineTree,
        VegetationType::OakTree,
        VegetationType::Bush,
        VegetationType::Rock,
    ],
    terrain_color: [0.24, 0.49, 0.18],
    peak_color: [0.42, 0.38, 0.30],
    moisture_range: (0.5, 1.0),
    temperature_range: (0.3, 0.7),
};

static DESERT: BiomeConfig = BiomeConfig {
    height_scale: 8.0,
    vegetation_density: 0.2,
    vegetation_types: &[
        VegetationType::Cactus,
        VegetationType::Rock,
        VegetationType::DeadTree,
    ],
    terrain_color: [0.86, 0.75, 0.50],
    peak_color: [0.76, 0.55, 0.35],
    moisture_range: (0.0, 0.3),
    temperature_range: (0.7, 1.0),
};

static SNOW: BiomeConfig = BiomeConfig {
    height_scale: 15.0,
    vegetation_density: 0.35,
    vegetation_types: &[
        VegetationType::SnowPine,
        VegetationType::Boulder,
        VegetationType::Rock,
    ],
    terrain_color: [0.85, 0.88, 0.92],
    peak_color: [0.98, 0.98, 1.0],
    moisture_range: (0.3, 0.8),
    temperature_range: (0.0, 0.3),
};

static GRASSLAND: BiomeConfig = BiomeConfig {
    height_scale: 6.0,
    vegetation_density: 0.45,
    vegetation_types: &[
        VegetationType::Bush,
        VegetationType::OakTree,
        VegetationType::Rock,
    ],
    terrain_color: [0.45, 0.70, 0.30],
    peak_color: [0.60, 0.75, 0.40],
    moisture_range: (0.3, 0.7),
    temperature_range: (0.4, 0.8),
};

static VOLCANIC: BiomeConfig = BiomeConfig {
    height_scale: 18.0,
    vegetation_density: 0.15,
    vegetation_types: &[
        VegetationType::DeadTree,
        VegetationType::Boulder,
        VegetationType::Rock,
    ],
    terrain_color: [0.25, 0.20, 0.20],
    peak_color: [0.55, 0.18, 0.08],
    moisture_range: (0.0, 0.3),
    temperature_range: (0.8, 1.0),
};

impl Biome {
    pub const ALL: [Biome; 5] = [
        Biome::Forest,
        Biome::Desert,
        Biome::Snow,
        Biome::Grassland,
        Biome::Volcanic,
    ];

    pub fn config(self) -> &'static BiomeConfig {
        match self {
            Biome::Forest => &FOREST,
            Biome::Desert => &DESERT,
            Biome::Snow => &SNOW,
            Biome::Grassland => &GRASSLAND,
            Biome::Volcanic => &VOLCANIC,
        }
    }

    pub fn theme(self) -> LevelTheme {
        match self {
            Biome::Forest => LevelTheme {
                difficulty: 2,
                theme: "enchanted forest",
                mood: "calm",
            },
            Biome::Desert => LevelTheme {
                difficulty: 3,
                theme: "sun-bleached dunes",
                mood: "harsh",
            },
            Biome::Snow => LevelTheme {
                difficulty: 4,
                theme: "frozen pass",
                mood: "lonely",
            },
            Biome::Grassland => LevelTheme {
                difficulty: 1,
                theme: "rolling meadows",
                mood: "cheerful",
            },
            Biome::Volcanic => LevelTheme {
                difficulty: 5,
                theme: "ashen caldera",
                mood: "ominous",
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Biome::Forest => "forest",
            Biome::Desert => "desert",
            Biome::Snow => "snow",
            Biome::Grassland => "grassland",
            Biome::Volcanic => "volcanic",
        }
    }

    // Biome whose climate window is closest to the given moisture and
    // temperature (both in `[0, 1]`). Windows containing the point win outright.
    pub fn from_climate(moisture: f32, temperature: f32) -> Biome {
        let distance = |b: &Biome| {
            let c = b.config();
            let axis = |v: f32, (lo, hi): (f32, f32)| {
                if v < lo {
                    lo - v
                } else if v > hi {
                    v - hi
                } else {
                    0.0
                }
            };
            let dm = axis(moisture, c.moisture_range);
            let dt = axis(temperature, c.temperature_range);
            dm * dm + dt * dt
        };
        Self::ALL
            .into_iter()
            .min_by(|a, b| distance(a).total_cmp(&distance(b)))
            .unwrap_or(Biome::Grassland)
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Biome {
    type Err = TerrainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TerrainError::UnknownBiome(s.to_string()))
    }
}

impl VegetationType {
    pub const ALL: [VegetationType; 8] = [
        VegetationType::PineTree,
        VegetationType::OakTree,
        VegetationType::Bush,
        VegetationType::Cactus,
        VegetationType::Rock,
        VegetationType::DeadTree,
        VegetationType::SnowPine,
        VegetationType::Boulder,
    ];

    pub fn base_scale(self) -> f32 {
        match self {
            VegetationType::PineTree => 1.4,
            VegetationType::OakTree => 1.6,
            VegetationType::Bush => 0.8,
            VegetationType::Cactus => 1.1,
            VegetationType::Rock => 0.9,
            VegetationType::DeadTree => 1.2,
            VegetationType::SnowPine => 1.3,
            VegetationType::Boulder => 1.5,
        }
    }

    pub fn primitive(self) -> Primitive {
        match self {
            VegetationType::PineTree | VegetationType::SnowPine => Primitive::Cone,
            VegetationType::OakTree | VegetationType::Bush => Primitive::Sphere,
            VegetationType::Cactus | VegetationType::DeadTree => Primitive::Cylinder,
            VegetationType::Rock | VegetationType::Boulder => Primitive::Box,
        }
    }

    pub fn color(self) -> [f32; 3] {
        match self {
            VegetationType::PineTree => [0.10, 0.35, 0.15],
            VegetationType::OakTree => [0.20, 0.50, 0.15],
            VegetationType::Bush => [0.30, 0.55, 0.20],
            VegetationType::Cactus => [0.35, 0.60, 0.30],
            VegetationType::Rock => [0.50, 0.50, 0.50],
            VegetationType::DeadTree => [0.35, 0.25, 0.15],
            VegetationType::SnowPine => [0.75, 0.85, 0.80],
            VegetationType::Boulder => [0.40, 0.38, 0.36],
        }
    }

    // Half extents of the collision box at scale 1. Trees only block with
    // their trunk, so they are much narrower than they look.
    pub fn footprint(self) -> [f32; 3] {
        match self {
            VegetationType::PineTree | VegetationType::SnowPine => [0.35, 2.0, 0.35],
            VegetationType::OakTree => [0.45, 2.0, 0.45],
            VegetationType::DeadTree => [0.3, 1.5, 0.3],
            VegetationType::Cactus => [0.3, 1.2, 0.3],
            VegetationType::Bush => [0.6, 0.5, 0.6],
            VegetationType::Rock => [0.6, 0.45, 0.6],
            VegetationType::Boulder => [1.0, 0.8, 1.0],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VegetationType::PineTree => "pine_tree",
            VegetationType::OakTree => "oak_tree",
            VegetationType::Bush => "bush",
            VegetationType::Cactus => "cactus",
            VegetationType::Rock => "rock",
            VegetationType::DeadTree => "dead_tree",
            VegetationType::SnowPine => "snow_pine",
            VegetationType::Boulder => "boulder",
        }
    }
}

// Shared limits that keep generated terrain drivable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RacingConstraints {
    // largest central-difference slope the height field may contain
    pub max_slope: f32,
    // smoothing kernel radius, in grid cells
    pub smoothing_radius: usize,
    // clear radius (world units) kept free of vegetation around portals
    pub min_flat_area: f32,
}

impl Default for RacingConstraints {
    fn default() -> Self {
        Self {
            max_slope: 0.8,
            smoothing_radius: 5,
            min_flat_area: 6.0,
        }
    }
}

// Clamp window applied to raw heights in racing-friendly mode.
pub fn racing_height_bounds(height_scale: f32) -> (f32, f32) {
    (height_scale * -0.2, height_scale * 0.8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn biome_names_round_trip_through_from_str() {
        for b in Biome::ALL {
            assert_eq!(b.as_str().parse::<Biome>().unwrap(), b);
        }
        assert_eq!("Forest".parse::<Biome>().unwrap(), Biome::Forest);
    }

    #[test]
    fn unknown_biome_is_an_error_not_a_default() {
        let err = "nonexistent".parse::<Biome>().unwrap_err();
        assert!(matches!(err, TerrainError::UnknownBiome(ref s) if s == "nonexistent"));
    }

    #[test]
    fn catalog_entries_are_sane() {
        for b in Biome::ALL {
            let c = b.config();
            assert!(c.height_scale > 0.0);
            assert!((0.0..=1.0).contains(&c.vegetation_density));
            assert!(!c.vegetation_types.is_empty());
            assert!(c.moisture_range.0 <= c.moisture_range.1);
            assert!(c.temperature_range.0 <= c.temperature_range.1);
            assert!((1..=5).contains(&b.theme().difficulty));
        }
    }

    #[test]
    fn climate_picks_matching_biome() {
        assert_eq!(Biome::from_climate(0.1, 0.9), Biome::Desert);
        assert_eq!(Biome::from_climate(0.5, 0.1), Biome::Snow);
        assert_eq!(Biome::from_climate(0.9, 0.5), Biome::Forest);
    }

    #[test]
    fn vegetation_wire_names_match_serde() {
        for v in VegetationType::ALL {
            let json = serde_json::to_string(&v).unwrap();
            assert_eq!(json, format!("\"{}\"", v.as_str()));
        }
    }

    #[test]
    fn racing_bounds_follow_height_scale() {
        assert_eq!(racing_height_bounds(10.0), (-2.0, 8.0));
    }
}
