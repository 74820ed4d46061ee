//! path-core
//!
//! Pure pathfinding logic, no networking:
//! - points and path requests
//! - the navigation engine seam ([`NavEngine`])
//! - raw engine output → ordered path ([`PathResolver`])
//! - a tile-set backed engine for running the server end-to-end

pub mod point;
pub mod engine;
pub mod resolver;
pub mod tileset;
pub mod error;

pub use point::{Path, PathRequest, Point3};
pub use engine::{NavEngine, RawPath, SerializedEngine};
pub use resolver::{points_from_raw, PathResolver};
pub use tileset::TileSetEngine;
pub use error::{EngineError, PathError};
