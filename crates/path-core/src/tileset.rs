//! Tile-set backed engine.
//!
//! Reads the on-disk mesh layout the server is pointed at with
//! `MmapsFolder`:
//!
//! ```text
//! <folder>/{map:03}.mmap              navmesh params (>= 28 bytes)
//! <folder>/{map:03}{x:02}{y:02}.mmtile one file per tile
//! ```
//!
//! Tile file layout (little-endian):
//!
//! ```text
//! [0..4]   magic          (u32, TILE_MAGIC)
//! [4..8]   detour version (u32)
//! [8..12]  mmap version   (u32, TILE_VERSION)
//! [12..16] data size      (u32, bytes following the header)
//! [16]     uses liquids   (u8)
//! [17..20] padding
//! [20..]   tile data
//! ```
//!
//! Loading validates every header. Queries do not walk the mesh: a
//! loaded map answers with the direct segment `[start, end]`. Plug a real
//! navmesh engine in through [`NavEngine`] for actual routing.

use std::collections::HashMap;
use std::fs;
use std::path::{Path as FsPath, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::engine::{NavEngine, RawPath};
use crate::error::EngineError;
use crate::point::Point3;

/// `"MMAP"` read as a little-endian u32.
pub const TILE_MAGIC: u32 = 0x4d4d_4150;
pub const TILE_VERSION: u32 = 6;
pub const TILE_HEADER_LEN: usize = 20;
/// origin (3 × f32), tile width, tile height, max tiles, max polys.
pub const PARAMS_LEN: usize = 28;

/// Parsed tile header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileHeader {
    pub detour_version: u32,
    pub mmap_version: u32,
    pub size: u32,
    pub uses_liquids: bool,
}

/// Parse and validate the fixed header at the start of a tile file.
pub fn parse_tile_header(bytes: &[u8]) -> Result<TileHeader, &'static str> {
    if bytes.len() < TILE_HEADER_LEN {
        return Err("truncated header");
    }

    let word = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

    if word(0) != TILE_MAGIC {
        return Err("bad magic");
    }

    let header = TileHeader {
        detour_version: word(4),
        mmap_version: word(8),
        size: word(12),
        uses_liquids: bytes[16] != 0,
    };

    if header.mmap_version != TILE_VERSION {
        return Err("unsupported mmap version");
    }
    if bytes.len() - TILE_HEADER_LEN < header.size as usize {
        return Err("tile data shorter than header size");
    }

    Ok(header)
}

#[derive(Debug, Clone, Copy)]
struct LoadedMap {
    tiles: usize,
}

/// Engine over a folder of `.mmap` / `.mmtile` files.
#[derive(Debug)]
pub struct TileSetEngine {
    folder: PathBuf,
    maps: RwLock<HashMap<i32, LoadedMap>>,
}

impl TileSetEngine {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        TileSetEngine {
            folder: folder.into(),
            maps: RwLock::new(HashMap::new()),
        }
    }

    /// Number of tiles validated for `map_id`, if loaded.
    pub fn tile_count(&self, map_id: i32) -> Option<usize> {
        self.maps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&map_id)
            .map(|m| m.tiles)
    }

    fn read(&self, path: &FsPath) -> Result<Vec<u8>, EngineError> {
        fs::read(path).map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn tile_files(&self, map_id: i32) -> Result<Vec<PathBuf>, EngineError> {
        let prefix = format!("{:03}", map_id);
        let entries = fs::read_dir(&self.folder).map_err(|source| EngineError::Io {
            path: self.folder.clone(),
            source,
        })?;

        let mut tiles = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| EngineError::Io {
                path: self.folder.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("mmtile") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            // The stem is the map prefix followed by two 2-digit tile coordinates.
            if stem.len() == prefix.len() + 4 && stem.starts_with(&prefix) {
                tiles.push(path);
            }
        }
        tiles.sort();
        Ok(tiles)
    }
}

impl NavEngine for TileSetEngine {
    fn load_map(&self, map_id: i32) -> Result<(), EngineError> {
        if self.tile_count(map_id).is_some() {
            return Ok(());
        }

        let params_path = self.folder.join(format!("{:03}.mmap", map_id));
        if !params_path.is_file() {
            return Err(EngineError::MapNotFound {
                map_id,
                path: params_path,
            });
        }
        if self.read(&params_path)?.len() < PARAMS_LEN {
            return Err(EngineError::InvalidTile {
                file: params_path,
                reason: "truncated navmesh params",
            });
        }

        let tiles = self.tile_files(map_id)?;
        for tile in &tiles {
            let bytes = self.read(tile)?;
            parse_tile_header(&bytes).map_err(|reason| EngineError::InvalidTile {
                file: tile.clone(),
                reason,
            })?;
        }

        self.maps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(map_id, LoadedMap { tiles: tiles.len() });
        Ok(())
    }

    fn find_path(&self, map_id: i32, start: Point3, end: Point3) -> Result<RawPath, EngineError> {
        if self.tile_count(map_id).is_none() {
            return Err(EngineError::MapNotLoaded(map_id));
        }
        Ok(RawPath::from_points(&[start, end]))
    }
}
