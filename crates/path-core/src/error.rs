//! Error types for the pathfinding core.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a [`NavEngine`](crate::NavEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    /// No mesh data exists for the map.
    #[error("map {map_id} not found at {}", path.display())]
    MapNotFound { map_id: i32, path: PathBuf },

    /// A path was requested on a map that was never loaded.
    #[error("map {0} is not loaded")]
    MapNotLoaded(i32),

    /// A tile or params file is present but unusable.
    #[error("invalid mesh file {}: {reason}", file.display())]
    InvalidTile { file: PathBuf, reason: &'static str },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Anything else an engine wants to reject a query with.
    #[error("engine error: {0}")]
    Internal(String),
}

/// Failures while turning a request into a [`Path`](crate::Path).
#[derive(Debug, Error)]
pub enum PathError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine broke its output contract: `buffer.len() != count * 3`.
    #[error("engine returned {len} floats for {count} points")]
    BufferMismatch { count: usize, len: usize },
}

impl PathError {
    /// Short, stable name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PathError::Engine(EngineError::MapNotFound { .. }) => "MapNotFound",
            PathError::Engine(EngineError::MapNotLoaded(_)) => "MapNotLoaded",
            PathError::Engine(EngineError::InvalidTile { .. }) => "InvalidTile",
            PathError::Engine(EngineError::Io { .. }) => "EngineIo",
            PathError::Engine(EngineError::Internal(_)) => "EngineInternal",
            PathError::BufferMismatch { .. } => "BufferMismatch",
        }
    }
}
