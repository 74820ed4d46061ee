//! Value types exchanged with clients and with the navigation engine.
//!
//! These are **transport-agnostic**: the JSON line framing lives in the
//! `path-protocol` crate. The serde attributes only pin the field names
//! clients already speak (`A`, `B`, `MapId`, lowercase `x`/`y`/`z`).

use serde::{Deserialize, Serialize};

/// A position on a map.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    #[serde(alias = "X")]
    pub x: f32,
    #[serde(alias = "Y")]
    pub y: f32,
    #[serde(alias = "Z")]
    pub z: f32,
}

impl Point3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Point3 { x, y, z }
    }

    /// Flat `[x, y, z]` layout used by the engine boundary.
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for Point3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Point3 { x, y, z }
    }
}

/// One pathfinding request, decoded from a single protocol line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathRequest {
    /// Start position.
    #[serde(rename = "A", alias = "a")]
    pub start: Point3,

    /// End position.
    #[serde(rename = "B", alias = "b")]
    pub end: Point3,

    /// Which precomputed mesh to query.
    #[serde(rename = "MapId", alias = "mapId")]
    pub map_id: i32,
}

/// Ordered points from start to end. Empty when no path exists.
pub type Path = Vec<Point3>;
