//! Per-tile geometry supply and the per-pass geometry cache.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::SunlightError;
use crate::geom::bboxes::Aabb;
use crate::geom::triangle::Triangle;

/// Triangle soup and bounding box of one tile.
#[derive(Debug, Clone)]
pub struct TileGeometry {
    pub name: String,
    pub triangles: Vec<Triangle>,
    /// `None` only for a tile without triangles.
    pub bbox: Option<Aabb>,
}

impl TileGeometry {
    /// Creates tile geometry, deriving the box from the triangles when not given.
    pub fn new(name: &str, triangles: Vec<Triangle>, bbox: Option<Aabb>) -> Self {
        let bbox = bbox.or_else(|| Aabb::from_triangles(&triangles, name, name));
        Self {
            name: name.to_string(),
            triangles,
            bbox,
        }
    }
}

/// Source of tile geometry, indexed `0..tile_count()`.
pub trait GeometryStore: Sync {
    fn tile_count(&self) -> usize;

    fn load_tile_geometry(&self, tile_index: usize) -> Result<Arc<TileGeometry>>;

    /// Bounding box of a tile when it is known without reading the
    /// triangles. `None` makes the cache load the tile and derive it.
    fn load_tile_bbox(&self, _tile_index: usize) -> Result<Option<Aabb>> {
        Ok(None)
    }
}

/// Geometry held in memory, mostly for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct InMemoryGeometryStore {
    tiles: Vec<Arc<TileGeometry>>,
}

impl InMemoryGeometryStore {
    pub fn new(tiles: Vec<TileGeometry>) -> Self {
        Self {
            tiles: tiles.into_iter().map(Arc::new).collect(),
        }
    }
}

impl GeometryStore for InMemoryGeometryStore {
    fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    fn load_tile_geometry(&self, tile_index: usize) -> Result<Arc<TileGeometry>> {
        self.tiles
            .get(tile_index)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no tile with index {tile_index}"))
    }
}

/// Pool of loaded tiles shared by every triangle of one visibility pass.
///
/// Keeps at most `capacity` tiles resident (0 = no limit) and evicts the
/// least recently used one beyond that.
pub struct GeometryCache<'s, S: GeometryStore + ?Sized> {
    store: &'s S,
    capacity: usize,
    tiles: HashMap<usize, Arc<TileGeometry>>,
    recency: VecDeque<usize>,
    bboxes: Option<Vec<Option<Aabb>>>,
    loads: usize,
}

impl<'s, S: GeometryStore + ?Sized> GeometryCache<'s, S> {
    pub fn new(store: &'s S, capacity: usize) -> Self {
        Self {
            store,
            capacity,
            tiles: HashMap::new(),
            recency: VecDeque::new(),
            bboxes: None,
            loads: 0,
        }
    }

    pub fn tile_count(&self) -> usize {
        self.store.tile_count()
    }

    /// Number of geometry loads performed against the store so far.
    pub fn loads(&self) -> usize {
        self.loads
    }

    /// Returns the geometry of a tile, loading it on a miss.
    ///
    /// `timestamp` only labels the error when loading fails.
    pub fn get(&mut self, tile_index: usize, timestamp: &str) -> Result<Arc<TileGeometry>> {
        if let Some(tile) = self.tiles.get(&tile_index) {
            let tile = Arc::clone(tile);
            self.touch(tile_index);
            return Ok(tile);
        }

        let tile = self
            .store
            .load_tile_geometry(tile_index)
            .map_err(|e| SunlightError::Geometry {
                tile: tile_index,
                timestamp: timestamp.to_string(),
                reason: format!("{e:#}"),
            })?;
        self.loads += 1;
        debug!(
            tile = tile_index,
            name = %tile.name,
            triangles = tile.triangles.len(),
            "tile geometry loaded"
        );

        self.tiles.insert(tile_index, Arc::clone(&tile));
        self.touch(tile_index);
        self.evict();
        Ok(tile)
    }

    /// Bounding boxes of every tile, read once per cache lifetime.
    ///
    /// Boxes the store does not know are derived from the tile geometry,
    /// loaded through the cache.
    pub fn bounding_boxes(&mut self, timestamp: &str) -> Result<&[Option<Aabb>]> {
        if self.bboxes.is_none() {
            let mut bboxes = Vec::with_capacity(self.store.tile_count());
            for tile_index in 0..self.store.tile_count() {
                let stored =
                    self.store
                        .load_tile_bbox(tile_index)
                        .map_err(|e| SunlightError::Geometry {
                            tile: tile_index,
                            timestamp: timestamp.to_string(),
                            reason: format!("{e:#}"),
                        })?;
                let bbox = match stored {
                    Some(bbox) => Some(bbox),
                    None => self.get(tile_index, timestamp)?.bbox.clone(),
                };
                bboxes.push(bbox);
            }
            self.bboxes = Some(bboxes);
        }
        Ok(self.bboxes.as_deref().unwrap_or_default())
    }

    fn touch(&mut self, tile_index: usize) {
        self.recency.retain(|&i| i != tile_index);
        self.recency.push_back(tile_index);
    }

    fn evict(&mut self) {
        if self.capacity == 0 {
            return;
        }
        while self.tiles.len() > self.capacity {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            self.tiles.remove(&oldest);
        }
    }
}
