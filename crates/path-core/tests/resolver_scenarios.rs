// crates/path-core/tests/resolver_scenarios.rs
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use path_core::tileset::{TILE_MAGIC, TILE_VERSION};
use path_core::{
    EngineError, NavEngine, PathError, PathResolver, Point3, RawPath, SerializedEngine,
    TileSetEngine,
};

/// Engine that returns a fixed buffer and counts loads.
struct ScriptedEngine {
    loads: AtomicUsize,
    output: RawPath,
}

impl ScriptedEngine {
    fn new(output: RawPath) -> Self {
        ScriptedEngine {
            loads: AtomicUsize::new(0),
            output,
        }
    }
}

impl NavEngine for ScriptedEngine {
    fn load_map(&self, map_id: i32) -> Result<(), EngineError> {
        if map_id < 0 {
            return Err(EngineError::Internal(format!("no map {}", map_id)));
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn find_path(&self, _map_id: i32, _start: Point3, _end: Point3) -> Result<RawPath, EngineError> {
        Ok(self.output.clone())
    }
}

#[test]
fn resolved_path_matches_engine_buffer_point_for_point() {
    let buffer: Vec<f32> = (0..30).map(|i| i as f32 * 0.25).collect();
    let engine = Arc::new(ScriptedEngine::new(RawPath {
        buffer: buffer.clone(),
        count: 10,
    }));
    let resolver = PathResolver::new(engine);

    resolver.ensure_map(0).unwrap();
    let path = resolver
        .resolve(0, Point3::default(), Point3::new(1.0, 0.0, 0.0))
        .unwrap();

    assert_eq!(path.len(), 10);
    for (i, p) in path.iter().enumerate() {
        assert_eq!(*p, Point3::new(buffer[3 * i], buffer[3 * i + 1], buffer[3 * i + 2]));
    }
}

#[test]
fn maps_are_loaded_once_even_under_contention() {
    let engine = Arc::new(ScriptedEngine::new(RawPath::empty()));
    let resolver = Arc::new(PathResolver::new(engine.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let resolver = resolver.clone();
            thread::spawn(move || resolver.ensure_map(530).unwrap())
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert!(resolver.is_loaded(530));
    assert_eq!(engine.loads.load(Ordering::SeqCst), 1);
}

/// Loading `SLOW_LOAD_MAP` takes `SLOW_LOAD`; every other map loads at once.
struct SlowLoadEngine;

const SLOW_LOAD_MAP: i32 = 2;
const SLOW_LOAD: Duration = Duration::from_millis(800);

impl NavEngine for SlowLoadEngine {
    fn load_map(&self, map_id: i32) -> Result<(), EngineError> {
        if map_id == SLOW_LOAD_MAP {
            thread::sleep(SLOW_LOAD);
        }
        Ok(())
    }

    fn find_path(&self, _map_id: i32, start: Point3, end: Point3) -> Result<RawPath, EngineError> {
        Ok(RawPath::from_points(&[start, end]))
    }
}

#[test]
fn slow_map_load_does_not_hold_up_a_loaded_map() {
    let resolver = Arc::new(PathResolver::new(Arc::new(SlowLoadEngine)));
    resolver.ensure_map(1).unwrap();

    let loading = {
        let resolver = resolver.clone();
        thread::spawn(move || resolver.ensure_map(SLOW_LOAD_MAP).unwrap())
    };
    // Let the slow load get underway.
    thread::sleep(Duration::from_millis(100));

    let started = Instant::now();
    resolver.ensure_map(1).unwrap();
    assert!(resolver.is_loaded(1));
    let end = Point3::new(1.0, 0.0, 0.0);
    assert_eq!(resolver.resolve(1, Point3::default(), end).unwrap().len(), 2);
    let waited = started.elapsed();
    assert!(
        waited < Duration::from_millis(300),
        "map 1 waited {:?} on the load of map {}",
        waited,
        SLOW_LOAD_MAP
    );

    loading.join().unwrap();
    assert!(resolver.is_loaded(SLOW_LOAD_MAP));
}

#[test]
fn preload_stops_at_the_first_bad_map() {
    let engine = Arc::new(ScriptedEngine::new(RawPath::empty()));
    let resolver = PathResolver::new(engine);

    assert_eq!(resolver.preload(&[0, 1]).unwrap(), 2);
    assert!(matches!(resolver.preload(&[2, -1, 3]), Err(PathError::Engine(_))));
    assert!(resolver.is_loaded(2));
    assert!(!resolver.is_loaded(3));
}

#[test]
fn contract_breach_surfaces_as_buffer_mismatch() {
    let engine = SerializedEngine::new(ScriptedEngine::new(RawPath {
        buffer: vec![0.0; 5],
        count: 2,
    }));
    let resolver = PathResolver::new(Arc::new(engine));

    let err = resolver
        .resolve(0, Point3::default(), Point3::default())
        .unwrap_err();
    assert_eq!(err.kind(), "BufferMismatch");
}

fn write_tile(dir: &std::path::Path, name: &str, magic: u32) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&magic.to_le_bytes());
    bytes.extend_from_slice(&7u32.to_le_bytes());
    bytes.extend_from_slice(&TILE_VERSION.to_le_bytes());
    bytes.extend_from_slice(&8u32.to_le_bytes());
    bytes.extend_from_slice(&[0; 4]);
    bytes.extend_from_slice(&[0xAB; 8]);
    fs::write(dir.join(name), bytes).unwrap();
}

#[test]
fn tile_set_engine_loads_and_answers_with_the_direct_segment() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("001.mmap"), [0u8; 28]).unwrap();
    write_tile(dir.path(), "0013132.mmtile", TILE_MAGIC);
    write_tile(dir.path(), "0013133.mmtile", TILE_MAGIC);
    // Belongs to map 10, must not be picked up for map 1.
    write_tile(dir.path(), "0103132.mmtile", 0);

    let engine = TileSetEngine::new(dir.path());
    let start = Point3::new(1.0, 2.0, 3.0);
    let end = Point3::new(4.0, 5.0, 6.0);

    assert!(matches!(
        engine.find_path(1, start, end),
        Err(EngineError::MapNotLoaded(1))
    ));

    let resolver = PathResolver::new(Arc::new(engine));
    resolver.ensure_map(1).unwrap();
    assert_eq!(resolver.resolve(1, start, end).unwrap(), vec![start, end]);
}

#[test]
fn tile_set_engine_rejects_missing_and_corrupt_maps() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("000.mmap"), [0u8; 28]).unwrap();
    write_tile(dir.path(), "0000000.mmtile", 0x1234_5678);

    let engine = TileSetEngine::new(dir.path());
    assert!(matches!(
        engine.load_map(571),
        Err(EngineError::MapNotFound { map_id: 571, .. })
    ));
    assert!(matches!(
        engine.load_map(0),
        Err(EngineError::InvalidTile { reason: "bad magic", .. })
    ));
    assert_eq!(engine.tile_count(0), None);
}
