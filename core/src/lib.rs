// core holds the deterministic level pipeline: noise, height fields, biomes,
// vegetation, meshes, level assembly and the sphere-body physics that runs on top.
pub mod biome;
pub mod config;
pub mod error;
pub mod heightfield;
pub mod level;
pub mod mesh;
pub mod noise_source;
pub mod perlin2;
pub mod physics;
pub mod poisson;
pub mod preview;
pub mod primitives;
pub mod query;
pub mod smoothing;
pub mod utils;
pub mod vegetation;

pub use biome::{Biome, BiomeConfig, Primitive, RacingConstraints, VegetationType};
pub use config::{Detail, GenerationTuning, LevelRequest, PhysicsConfig, TerrainConfig, TerrainSize};
pub use error::{Result, TerrainError};
pub use heightfield::{HeightField, HeightFieldGenerator};
pub use level::{
    GeneratedLevel, LevelData, LevelGenerator, ObstacleData, ObstacleKind, StructureKind,
    TerrainMeshes, WorldPoint,
};
pub use mesh::{CollisionMesh, TerrainMesh};
pub use noise_source::NoiseSource;
pub use perlin2::Perlin2D;
pub use physics::{PhysicsBody, PhysicsEngine};
pub use primitives::InstancedMesh;
pub use query::TerrainQuery;
pub use vegetation::{VegetationItem, VegetationPlacer};

// A scalar noise lattice that can be sampled anywhere in the plane.
pub trait NoiseField {
    fn sample(&self, x: f64, z: f64) -> f64;
}

// Anything that can answer "how high is the ground at (x, z)".
// Positions outside the surface report 0.
pub trait TerrainSurface {
    fn height_at(&self, x: f32, z: f32) -> f32;
}

// Infinite plane, mostly for tests and lobby areas.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlatGround {
    pub height: f32,
}

impl TerrainSurface for FlatGround {
    fn height_at(&self, _x: f32, _z: f32) -> f32 {
        self.height
    }
}
