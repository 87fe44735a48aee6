use portal_core::TerrainError;
use thiserror::Error;

use crate::models::PlayerId;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Terrain(#[from] TerrainError),

    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("session is full ({max} players)")]
    SessionFull { max: usize },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
