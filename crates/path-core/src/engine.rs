//! The navigation engine seam.
//!
//! The engine is an external collaborator: it loads precomputed meshes
//! and answers shortest-path queries. This crate never looks inside it.
//!
//! Thread-safety is part of the contract. Implementations must accept
//! concurrent `find_path` calls against the same or different maps;
//! the server does not serialize them. An engine that cannot promise
//! this should be wrapped in [`SerializedEngine`].

use std::sync::{Mutex, PoisonError};

use crate::error::EngineError;
use crate::point::Point3;

/// Flat engine output: `[x1, y1, z1, x2, y2, z2, ...]` plus the point
/// count the engine claims. Checked against each other by
/// [`points_from_raw`](crate::points_from_raw).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawPath {
    pub buffer: Vec<f32>,
    pub count: usize,
}

impl RawPath {
    pub fn empty() -> Self {
        RawPath::default()
    }

    pub fn from_points(points: &[Point3]) -> Self {
        let buffer = points.iter().flat_map(|p| p.to_array()).collect();
        RawPath {
            buffer,
            count: points.len(),
        }
    }
}

/// Map loading and path queries over navigation meshes.
pub trait NavEngine: Send + Sync {
    /// Make `map_id` available for queries. Loading an already loaded
    /// map must succeed.
    fn load_map(&self, map_id: i32) -> Result<(), EngineError>;

    /// Shortest path from `start` to `end` on `map_id`.
    fn find_path(&self, map_id: i32, start: Point3, end: Point3) -> Result<RawPath, EngineError>;
}

/// Runs every call of the wrapped engine under one lock.
///
/// Use this for engines whose concurrent-query safety is unverified.
/// All pathfinding across all sessions is then serialized.
#[derive(Debug, Default)]
pub struct SerializedEngine<E> {
    inner: E,
    gate: Mutex<()>,
}

impl<E: NavEngine> SerializedEngine<E> {
    pub fn new(inner: E) -> Self {
        SerializedEngine {
            inner,
            gate: Mutex::new(()),
        }
    }
}

impl<E: NavEngine> NavEngine for SerializedEngine<E> {
    fn load_map(&self, map_id: i32) -> Result<(), EngineError> {
        let _guard = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.load_map(map_id)
    }

    fn find_path(&self, map_id: i32, start: Point3, end: Point3) -> Result<RawPath, EngineError> {
        let _guard = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.find_path(map_id, start, end)
    }
}
