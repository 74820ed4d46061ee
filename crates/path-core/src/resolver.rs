//! Path resolution on top of a [`NavEngine`].
//!
//! The resolver does two things:
//! - remembers which maps have been loaded, so the first request for a
//!   map loads it and later ones go straight to the query,
//! - groups the engine's flat float buffer into [`Point3`]s, in order,
//!   without transforming, filtering or deduplicating anything.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::engine::{NavEngine, RawPath};
use crate::error::PathError;
use crate::point::{Path, Point3};

/// Per-map load state. `true` once the engine has loaded the map.
type LoadSlot = Arc<Mutex<bool>>;

/// Shared by every session. Cheap to query once a map is loaded.
///
/// Loading is coordinated per map: a session loading one map never
/// blocks sessions working on another.
pub struct PathResolver {
    engine: Arc<dyn NavEngine>,
    slots: Mutex<HashMap<i32, LoadSlot>>,
}

impl PathResolver {
    pub fn new(engine: Arc<dyn NavEngine>) -> Self {
        PathResolver {
            engine,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// The table lock is only held long enough to look up or insert a slot.
    fn slot(&self, map_id: i32) -> LoadSlot {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(map_id)
            .or_default()
            .clone()
    }

    pub fn is_loaded(&self, map_id: i32) -> bool {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&map_id)
            .cloned();
        let Some(slot) = slot else {
            return false;
        };
        let loaded = *slot.lock().unwrap_or_else(PoisonError::into_inner);
        loaded
    }

    /// Load `map_id` unless it already is.
    ///
    /// Concurrent callers for the same map wait for the first one and do
    /// not load it again. A failed load leaves the map unloaded, so the
    /// next request retries.
    pub fn ensure_map(&self, map_id: i32) -> Result<(), PathError> {
        let slot = self.slot(map_id);
        let mut loaded = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if *loaded {
            return Ok(());
        }
        self.engine.load_map(map_id)?;
        *loaded = true;
        Ok(())
    }

    /// Eagerly load every map in `map_ids`. Stops at the first failure.
    pub fn preload(&self, map_ids: &[i32]) -> Result<usize, PathError> {
        for &map_id in map_ids {
            self.ensure_map(map_id)?;
        }
        Ok(map_ids.len())
    }

    /// Query the engine and group its output into points.
    ///
    /// The map must already be loaded (see [`ensure_map`](Self::ensure_map)).
    /// This call blocks for as long as the engine computes.
    pub fn resolve(&self, map_id: i32, start: Point3, end: Point3) -> Result<Path, PathError> {
        let raw = self.engine.find_path(map_id, start, end)?;
        points_from_raw(&raw)
    }
}

/// Group `[x1, y1, z1, x2, ...]` into points.
///
/// Fails with [`PathError::BufferMismatch`] unless the buffer holds
/// exactly `count * 3` floats.
pub fn points_from_raw(raw: &RawPath) -> Result<Path, PathError> {
    let expected = raw.count.checked_mul(3);
    if expected != Some(raw.buffer.len()) {
        return Err(PathError::BufferMismatch {
            count: raw.count,
            len: raw.buffer.len(),
        });
    }

    Ok(raw
        .buffer
        .chunks_exact(3)
        .map(|c| Point3::new(c[0], c[1], c[2]))
        .collect())
}
