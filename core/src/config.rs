// Generation inputs and the tunable knobs behind them.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::biome::{Biome, RacingConstraints};
use crate::error::{Result, TerrainError};
use crate::level::ObstacleData;

// Sampling density of the height field. World units per grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detail {
    Low,
    Medium,
    High,
}

impl Detail {
    pub const ALL: [Detail; 3] = [Detail::Low, Detail::Medium, Detail::High];

    pub fn resolution(self) -> f32 {
        match self {
            Detail::Low => 4.0,
            Detail::Medium => 2.0,
            Detail::High => 1.0,
        }
    }

    // Inverse of `resolution`.
    pub fn from_resolution(resolution: f32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| (d.resolution() - resolution).abs() < 1e-4)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Detail::Low => "low",
            Detail::Medium => "medium",
            Detail::High => "high",
        }
    }
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Detail {
    type Err = TerrainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Detail::Low),
            "medium" => Ok(Detail::Medium),
            "high" => Ok(Detail::High),
            other => Err(TerrainError::InvalidDetail(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainSize {
    pub width: f32,
    pub height: f32,
}

impl TerrainSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    // Each side must span at least one cell at the coarsest detail, otherwise
    // the height-map shape no longer tells the detail levels apart.
    pub fn validate(&self) -> Result<()> {
        let min = Detail::Low.resolution();
        let ok = |v: f32| v.is_finite() && v >= min;
        if ok(self.width) && ok(self.height) {
            Ok(())
        } else {
            Err(TerrainError::InvalidSize {
                width: self.width,
                height: self.height,
            })
        }
    }
}

// Everything that determines a level. Two configs that compare equal always
// produce the same `LevelData`.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainConfig {
    pub seed: u64,
    pub size: TerrainSize,
    pub biome: Biome,
    pub detail: Detail,
    pub racing_friendly: bool,
    // Hand-placed buildings and barriers, merged into the obstacle list.
    pub obstacles: Vec<ObstacleData>,
}

impl TerrainConfig {
    pub fn new(seed: u64, width: f32, height: f32, biome: Biome) -> Self {
        Self {
            seed,
            size: TerrainSize::new(width, height),
            biome,
            detail: Detail::Medium,
            racing_friendly: true,
            obstacles: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: Detail) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_racing_friendly(mut self, racing_friendly: bool) -> Self {
        self.racing_friendly = racing_friendly;
        self
    }

    pub fn with_obstacles(mut self, obstacles: Vec<ObstacleData>) -> Self {
        self.obstacles = obstacles;
        self
    }

    pub fn resolution(&self) -> f32 {
        self.detail.resolution()
    }
}

// The loosely typed form a level request arrives in over the wire.
// Converting it into a `TerrainConfig` is where unknown biomes and detail
// levels get rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelRequest {
    pub seed: u64,
    pub size: TerrainSize,
    pub biome: String,
    #[serde(default = "default_detail")]
    pub detail: String,
    #[serde(default = "default_racing_friendly")]
    pub racing_friendly: bool,
}

fn default_detail() -> String {
    Detail::Medium.as_str().to_string()
}

fn default_racing_friendly() -> bool {
    true
}

impl TryFrom<&LevelRequest> for TerrainConfig {
    type Error = TerrainError;

    fn try_from(req: &LevelRequest) -> Result<Self> {
        let biome: Biome = req.biome.parse()?;
        let detail: Detail = req.detail.parse()?;
        req.size.validate()?;
        Ok(TerrainConfig {
            seed: req.seed,
            size: req.size,
            biome,
            detail,
            racing_friendly: req.racing_friendly,
            obstacles: Vec::new(),
        })
    }
}

// Fractal summation parameters for one noise channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FbmParams {
    pub octaves: usize,
    pub frequency: f64,
    pub persistence: f64,
    pub lacunarity: f64,
}

impl FbmParams {
    pub const fn new(octaves: usize, frequency: f64, persistence: f64) -> Self {
        Self {
            octaves,
            frequency,
            persistence,
            lacunarity: 2.0,
        }
    }
}

impl Default for FbmParams {
    fn default() -> Self {
        Self::new(4, 0.01, 0.5)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationTuning {
    pub height: FbmParams,
    pub moisture: FbmParams,
    pub temperature: FbmParams,
    pub vegetation_density: FbmParams,
    // single-octave gate deciding whether vegetation may grow at all
    pub placement_frequency: f64,
    pub placement_threshold: f64,
    // low-frequency channel choosing which vegetation type grows
    pub type_frequency: f64,
    pub vegetation_base_spacing: f32,
    pub vegetation_max_slope: f32,
    pub poisson_attempts: usize,
    pub scale_variation: f32,
    pub collision_simplification: usize,
    pub racing: RacingConstraints,
    // portals sit at -/+ this fraction of the terrain length along z
    pub portal_offset: f32,
    pub max_vertices: usize,
}

impl Default for GenerationTuning {
    fn default() -> Self {
        Self {
            height: FbmParams::new(6, 0.01, 0.5),
            moisture: FbmParams::new(4, 0.005, 0.5),
            temperature: FbmParams::new(4, 0.004, 0.5),
            vegetation_density: FbmParams::new(3, 0.05, 0.4),
            placement_frequency: 0.1,
            placement_threshold: 0.3,
            type_frequency: 0.02,
            vegetation_base_spacing: 8.0,
            vegetation_max_slope: 0.5,
            poisson_attempts: 30,
            scale_variation: 0.15,
            collision_simplification: 2,
            racing: RacingConstraints::default(),
            portal_offset: 0.4,
            max_vertices: 4_000_000,
        }
    }
}

impl GenerationTuning {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let tuning: Self = toml::from_str(s)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.collision_simplification == 0 {
            return Err(TerrainError::Config(
                "collision_simplification must be at least 1".into(),
            ));
        }
        if !(self.vegetation_base_spacing > 0.0) {
            return Err(TerrainError::Config(
                "vegetation_base_spacing must be positive".into(),
            ));
        }
        if self.racing.smoothing_radius == 0 || !(self.racing.max_slope > 0.0) {
            return Err(TerrainError::Config(
                "racing smoothing_radius and max_slope must be positive".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.scale_variation) {
            return Err(TerrainError::Config(format!(
                "scale_variation must be in [0, 1), got {}",
                self.scale_variation
            )));
        }
        if !(self.portal_offset > 0.0 && self.portal_offset < 0.5) {
            return Err(TerrainError::Config(format!(
                "portal_offset must be in (0, 0.5), got {}",
                self.portal_offset
            )));
        }
        if !(self.vegetation_max_slope.is_finite() && self.vegetation_max_slope >= 0.0) {
            return Err(TerrainError::Config(format!(
                "vegetation_max_slope must be finite and non-negative, got {}",
                self.vegetation_max_slope
            )));
        }
        Ok(())
    }
}

// Tuning for the sphere-body simulation. Velocities are world units per
// second; `acceleration` is the velocity gained per applied movement input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub ground_friction: f32,
    pub air_resistance: f32,
    pub acceleration: f32,
    pub unrestricted_acceleration: f32,
    pub max_speed: f32,
    pub obstacle_restitution: f32,
    pub player_restitution: f32,
    pub ground_epsilon: f32,
    pub jump_velocity: f32,
    pub tick_rate: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 20.0,
            ground_friction: 0.93,
            air_resistance: 0.98,
            acceleration: 0.8,
            unrestricted_acceleration: 2.5,
            max_speed: 12.0,
            obstacle_restitution: 0.5,
            player_restitution: 0.8,
            ground_epsilon: 0.01,
            jump_velocity: 8.0,
            tick_rate: 60.0,
        }
    }
}

impl PhysicsConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn fixed_timestep(&self) -> f32 {
        1.0 / self.tick_rate.max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_parses_and_maps_to_resolution() {
        assert_eq!("HIGH".parse::<Detail>().unwrap(), Detail::High);
        assert_eq!(Detail::Medium.resolution(), 2.0);
        assert_eq!(Detail::from_resolution(4.0), Some(Detail::Low));
        assert_eq!(Detail::from_resolution(3.0), None);
        assert!(matches!(
            "ultra".parse::<Detail>(),
            Err(TerrainError::InvalidDetail(_))
        ));
    }

    #[test]
    fn non_positive_size_is_rejected() {
        assert!(TerrainSize::new(100.0, 100.0).validate().is_ok());
        assert!(TerrainSize::new(0.0, 100.0).validate().is_err());
        assert!(TerrainSize::new(100.0, -5.0).validate().is_err());
        assert!(TerrainSize::new(f32::NAN, 10.0).validate().is_err());
    }

    #[test]
    fn sizes_below_one_coarse_cell_are_rejected() {
        assert!(TerrainSize::new(4.0, 4.0).validate().is_ok());
        assert!(TerrainSize::new(0.5, 100.0).validate().is_err());
        assert!(TerrainSize::new(100.0, 3.9).validate().is_err());

        // from the smallest size up, every detail gives a distinct sample count
        for w in [4.0_f32, 4.5, 5.0, 7.9, 8.0, 12.3] {
            let counts: Vec<_> = Detail::ALL
                .iter()
                .map(|d| (w / d.resolution()).floor() as usize + 1)
                .collect();
            assert!(counts[0] < counts[1] && counts[1] < counts[2], "width {w}");
        }
    }

    #[test]
    fn request_with_unknown_biome_fails() {
        let req = LevelRequest {
            seed: 1,
            size: TerrainSize::new(100.0, 100.0),
            biome: "nonexistent".into(),
            detail: "medium".into(),
            racing_friendly: true,
        };
        let err = TerrainConfig::try_from(&req).unwrap_err();
        assert!(matches!(err, TerrainError::UnknownBiome(ref b) if b == "nonexistent"));
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let tuning = GenerationTuning::from_toml_str(
            r#"
            vegetation_base_spacing = 12.0
            [racing]
            max_slope = 0.6
            "#,
        )
        .unwrap();
        assert_eq!(tuning.vegetation_base_spacing, 12.0);
        assert_eq!(tuning.racing.max_slope, 0.6);
        assert_eq!(tuning.poisson_attempts, 30);

        let physics = PhysicsConfig::from_toml_str("gravity = 9.81").unwrap();
        assert_eq!(physics.gravity, 9.81);
        assert_eq!(physics.max_speed, PhysicsConfig::default().max_speed);
    }

    #[test]
    fn invalid_tuning_is_a_config_error() {
        let err = GenerationTuning::from_toml_str("collision_simplification = 0").unwrap_err();
        assert!(matches!(err, TerrainError::Config(_)));
    }

    #[test]
    fn scale_variation_must_keep_scales_positive() {
        for bad in ["-0.2", "1.0", "1.5", "nan"] {
            let err = GenerationTuning::from_toml_str(&format!("scale_variation = {bad}"))
                .unwrap_err();
            assert!(matches!(err, TerrainError::Config(_)), "scale_variation = {bad}");
        }
        assert!(GenerationTuning::from_toml_str("scale_variation = 0.0").is_ok());
        assert!(GenerationTuning::from_toml_str("scale_variation = 0.9").is_ok());
    }

    #[test]
    fn portal_offset_stays_inside_the_level() {
        for bad in ["0.0", "-0.1", "0.5", "0.75", "nan"] {
            let err =
                GenerationTuning::from_toml_str(&format!("portal_offset = {bad}")).unwrap_err();
            assert!(matches!(err, TerrainError::Config(_)), "portal_offset = {bad}");
        }
        assert!(GenerationTuning::from_toml_str("portal_offset = 0.45").is_ok());
    }

    #[test]
    fn vegetation_max_slope_must_be_finite() {
        for bad in ["inf", "nan", "-0.5"] {
            let err = GenerationTuning::from_toml_str(&format!("vegetation_max_slope = {bad}"))
                .unwrap_err();
            assert!(matches!(err, TerrainError::Config(_)), "vegetation_max_slope = {bad}");
        }
    }
}
