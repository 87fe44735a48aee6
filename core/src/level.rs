// Level assembly and the `LevelData` wire shape.

use std::time::Instant;

use glam::Vec3;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::TerrainSurface;
use crate::biome::{Biome, VegetationType};
use crate::config::{Detail, GenerationTuning, LevelRequest, TerrainConfig, TerrainSize};
use crate::error::{Result, TerrainError};
use crate::heightfield::{HeightField, HeightFieldGenerator, samples_for};
use crate::mesh::{CollisionMesh, TerrainMesh, build_collision_mesh, build_terrain_mesh};
use crate::noise_source::NoiseSource;
use crate::primitives::{InstancedMesh, build_vegetation_meshes};
use crate::vegetation::{VegetationItem, VegetationPlacer};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldPoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<Vec3> for WorldPoint {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<WorldPoint> for Vec3 {
    fn from(p: WorldPoint) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureKind {
    Building,
    Barrier,
}

// Closed set of obstacle types. On the wire this is a bare snake_case string
// such as `"pine_tree"` or `"barrier"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObstacleKind {
    Vegetation(VegetationType),
    Structure(StructureKind),
}

impl ObstacleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObstacleKind::Vegetation(v) => v.as_str(),
            ObstacleKind::Structure(StructureKind::Building) => "building",
            ObstacleKind::Structure(StructureKind::Barrier) => "barrier",
        }
    }

    // Collision half extents at scale 1
    pub fn footprint(self) -> [f32; 3] {
        match self {
            ObstacleKind::Vegetation(v) => v.footprint(),
            ObstacleKind::Structure(StructureKind::Building) => [3.0, 4.0, 3.0],
            ObstacleKind::Structure(StructureKind::Barrier) => [2.0, 0.6, 0.3],
        }
    }

    pub fn color(self) -> [f32; 3] {
        match self {
            ObstacleKind::Vegetation(v) => v.color(),
            ObstacleKind::Structure(StructureKind::Building) => [0.55, 0.52, 0.5],
            ObstacleKind::Structure(StructureKind::Barrier) => [0.9, 0.35, 0.1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleData {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ObstacleKind,
    pub position: WorldPoint,
    pub rotation: f32,
    pub scale: WorldPoint,
}

impl ObstacleData {
    pub fn from_vegetation(index: usize, item: &VegetationItem) -> Self {
        Self {
            id: format!("veg-{index:04}"),
            kind: ObstacleKind::Vegetation(item.vegetation_type),
            position: item.position.into(),
            rotation: item.rotation,
            scale: WorldPoint::new(item.scale, item.scale, item.scale),
        }
    }

    // Box half extents in world units, rotation ignored.
    pub fn half_extents(&self) -> Vec3 {
        let [x, y, z] = self.kind.footprint();
        Vec3::new(x * self.scale.x, y * self.scale.y, z * self.scale.z)
    }

    // Centre of the collision box; obstacles stand on their position.
    pub fn collision_centre(&self) -> Vec3 {
        let mut c: Vec3 = self.position.into();
        c.y += self.half_extents().y;
        c
    }

    pub fn vegetation_item(&self) -> Option<VegetationItem> {
        match self.kind {
            ObstacleKind::Vegetation(vegetation_type) => Some(VegetationItem {
                position: self.position.into(),
                vegetation_type,
                scale: self.scale.y,
                rotation: self.rotation,
            }),
            ObstacleKind::Structure(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainGeometry {
    pub width: f32,
    pub height: f32,
    pub height_map: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Portals {
    pub start: WorldPoint,
    pub end: WorldPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub terrain: TerrainGeometry,
    pub obstacles: Vec<ObstacleData>,
    pub portals: Portals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelMetadata {
    pub difficulty: u8,
    pub theme: String,
    pub mood: String,
    pub seed: u64,
    // unix millis, stamped by whoever publishes the level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    pub id: String,
    pub biome: Biome,
    pub geometry: Geometry,
    pub metadata: LevelMetadata,
}

impl LevelData {
    // Grid resolution implied by the height-map shape. Valid sizes give each
    // detail level a distinct shape.
    pub fn resolution(&self) -> Result<f32> {
        let t = &self.geometry.terrain;
        TerrainSize::new(t.width, t.height).validate()?;
        let rows = t.height_map.len();
        let cols = t.height_map.first().map_or(0, Vec::len);
        [Detail::High, Detail::Medium, Detail::Low]
            .into_iter()
            .map(Detail::resolution)
            .find(|&res| samples_for(t.width, res) == cols && samples_for(t.height, res) == rows)
            .ok_or_else(|| {
                TerrainError::InvalidHeightMap(format!(
                    "{}x{} samples match no detail level for a {}x{} terrain",
                    cols, rows, t.width, t.height
                ))
            })
    }

    pub fn height_field(&self) -> Result<HeightField> {
        let t = &self.geometry.terrain;
        HeightField::from_nested(&t.height_map, t.width, t.height, self.resolution()?)
    }

    pub fn vegetation_items(&self) -> Vec<VegetationItem> {
        self.geometry
            .obstacles
            .iter()
            .filter_map(ObstacleData::vegetation_item)
            .collect()
    }

    pub fn start(&self) -> Vec3 {
        self.geometry.portals.start.into()
    }

    pub fn end(&self) -> Vec3 {
        self.geometry.portals.end.into()
    }
}

// Render and collision geometry for one level.
#[derive(Debug, Clone)]
pub struct TerrainMeshes {
    pub terrain: TerrainMesh,
    pub collision: CollisionMesh,
    pub vegetation: Vec<InstancedMesh>,
}

#[derive(Debug, Clone)]
pub struct GeneratedLevel {
    pub level_data: LevelData,
    pub meshes: TerrainMeshes,
    pub height_field: HeightField,
}

#[derive(Debug, Clone, Default)]
pub struct LevelGenerator {
    tuning: GenerationTuning,
}

impl LevelGenerator {
    pub fn new(tuning: GenerationTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &GenerationTuning {
        &self.tuning
    }

    pub fn generate_from_request(&self, request: &LevelRequest) -> Result<GeneratedLevel> {
        let config = TerrainConfig::try_from(request)?;
        self.generate_level(&config)
    }

    // Build a complete level. All-or-nothing: any error means no geometry.
    pub fn generate_level(&self, config: &TerrainConfig) -> Result<GeneratedLevel> {
        let started = Instant::now();
        self.validate(config)?;

        let width = config.size.width;
        let depth = config.size.height;
        let resolution = config.resolution();
        let start_x = -width / 2.0;
        let start_z = -depth / 2.0;
        let biome = config.biome.config();

        let noise = NoiseSource::new(config.seed, &self.tuning);
        let racing = config.racing_friendly.then_some(self.tuning.racing);
        let field = HeightFieldGenerator::new(&noise, biome, racing)
            .generate(start_x, start_z, width, depth, resolution)?;
        debug!("height field ready in {:?}", started.elapsed());

        let terrain = build_terrain_mesh(&field, config.biome)?;
        let collision = build_collision_mesh(&field, self.tuning.collision_simplification)?;

        let portals = self.portals(&field, depth);
        let clearance = self.tuning.racing.min_flat_area;
        let vegetation: Vec<VegetationItem> = VegetationPlacer::new(&noise, biome, &self.tuning)
            .place(&field, start_x, start_z, width, depth, resolution)
            .into_iter()
            .filter(|item| {
                !near_xz(item.position, portals.start.into(), clearance)
                    && !near_xz(item.position, portals.end.into(), clearance)
            })
            .collect();
        let vegetation_meshes = build_vegetation_meshes(&vegetation);

        let mut obstacles: Vec<ObstacleData> = vegetation
            .iter()
            .enumerate()
            .map(|(i, item)| ObstacleData::from_vegetation(i, item))
            .collect();
        obstacles.extend(config.obstacles.iter().map(|o| {
            let mut placed = o.clone();
            placed.position.y = field.height_at(o.position.x, o.position.z);
            placed
        }));

        let theme = config.biome.theme();
        let level_data = LevelData {
            id: format!(
                "level-{}-{}-{}x{}-{}",
                config.biome, config.seed, width, depth, config.detail
            ),
            biome: config.biome,
            geometry: Geometry {
                terrain: TerrainGeometry {
                    width,
                    height: depth,
                    height_map: field.to_nested(),
                },
                obstacles,
                portals,
            },
            metadata: LevelMetadata {
                difficulty: theme.difficulty,
                theme: theme.theme.to_string(),
                mood: theme.mood.to_string(),
                seed: config.seed,
                generated_at: None,
            },
        };

        info!(
            "generated {} ({} vegetation, {} obstacles) in {:?}",
            level_data.id,
            vegetation.len(),
            level_data.geometry.obstacles.len(),
            started.elapsed()
        );

        Ok(GeneratedLevel {
            level_data,
            meshes: TerrainMeshes {
                terrain,
                collision,
                vegetation: vegetation_meshes,
            },
            height_field: field,
        })
    }

    // Rebuild render and collision geometry from received level data without
    // re-running placement: vegetation comes from the obstacle list as sent.
    pub fn generate_terrain_meshes_from_level(&self, level: &LevelData) -> Result<TerrainMeshes> {
        let field = level.height_field()?;
        let terrain = build_terrain_mesh(&field, level.biome)?;
        let collision = build_collision_mesh(&field, self.tuning.collision_simplification)?;
        let vegetation = build_vegetation_meshes(&level.vegetation_items());
        debug!(
            "rebuilt meshes for {} ({} vegetation batches)",
            level.id,
            vegetation.len()
        );
        Ok(TerrainMeshes {
            terrain,
            collision,
            vegetation,
        })
    }

    fn validate(&self, config: &TerrainConfig) -> Result<()> {
        config.size.validate()?;
        self.tuning.validate()?;
        let resolution = config.resolution();
        let vertices = samples_for(config.size.width, resolution)
            .saturating_mul(samples_for(config.size.height, resolution));
        if vertices > self.tuning.max_vertices {
            return Err(TerrainError::TerrainTooLarge { vertices });
        }
        Ok(())
    }

    // Start and end sit on the z axis at -/+ portal_offset of the length.
    fn portals(&self, field: &HeightField, depth: f32) -> Portals {
        let offset = depth * self.tuning.portal_offset;
        let at = |z: f32| {
            if field.grid_coords(0.0, z).is_none() {
                warn!("portal at z={z} falls outside the height field");
            }
            WorldPoint::new(0.0, field.height_at(0.0, z), z)
        };
        Portals {
            start: at(-offset),
            end: at(offset),
        }
    }
}

fn near_xz(a: Vec3, b: Vec3, radius: f32) -> bool {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz < radius * radius
}
