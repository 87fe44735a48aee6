use thiserror::Error;

// Everything that can go wrong while validating a config or building a level.
// Height queries never produce one of these: out-of-bounds samples return 0.
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("unknown biome: {0}")]
    UnknownBiome(String),

    #[error("invalid detail level: {0} (expected low, medium or high)")]
    InvalidDetail(String),

    #[error("invalid terrain size {width}x{height}: both dimensions must be finite and at least 4 units")]
    InvalidSize { width: f32, height: f32 },

    #[error("terrain too large: {vertices} height samples exceeds the generation limit")]
    TerrainTooLarge { vertices: usize },

    #[error("invalid height map: {0}")]
    InvalidHeightMap(String),

    #[error("terrain generation failed: {0}")]
    GenerationFailed(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TerrainError>;

impl From<toml::de::Error> for TerrainError {
    fn from(err: toml::de::Error) -> Self {
        TerrainError::Config(err.to_string())
    }
}
