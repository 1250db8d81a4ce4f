//! JSON tileset reader.
//!
//! A tileset directory holds `tileset.json` listing the tiles, and one
//! content file per tile with the triangles of each source feature:
//!
//! ```json
//! { "tiles": [ { "name": "t0", "content": "t0.json", "bbox": { "min": [0, 0, 0], "max": [1, 1, 1] } } ] }
//! ```
//!
//! ```json
//! { "features": [ { "id": "12", "triangles": [ [[0, 0, 0], [1, 0, 0], [0, 1, 0]] ] } ] }
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::Point;
use crate::geom::bboxes::Aabb;
use crate::geom::triangle::{Triangle, TriangleId};
use crate::sim::geometry::{GeometryStore, TileGeometry};

pub const TILESET_FILE: &str = "tileset.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    pub tiles: Vec<TileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileEntry {
    pub name: String,
    /// Content file, relative to the tileset directory.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoxEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxEntry {
    pub min: Point,
    pub max: Point,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileContent {
    pub features: Vec<FeatureEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEntry {
    pub id: String,
    pub triangles: Vec<[Point; 3]>,
}

impl TileContent {
    /// Triangles of every feature, ids composed from tile, feature and the
    /// triangle's index within the feature.
    pub fn triangles(&self, tile_name: &str) -> Vec<Triangle> {
        self.features
            .iter()
            .flat_map(|feature| {
                feature
                    .triangles
                    .iter()
                    .enumerate()
                    .map(move |(i, [a, b, c])| {
                        Triangle::new(
                            *a,
                            *b,
                            *c,
                            TriangleId::compose(tile_name, &feature.id, i),
                            tile_name,
                        )
                    })
            })
            .collect()
    }
}

/// Geometry store over a tileset directory. Tiles are read on demand.
#[derive(Debug, Clone)]
pub struct JsonGeometryStore {
    root: PathBuf,
    tileset: Tileset,
}

impl JsonGeometryStore {
    pub fn open(dir: &Path) -> Result<Self> {
        let tileset = read_json(&dir.join(TILESET_FILE))?;
        Ok(Self {
            root: dir.to_path_buf(),
            tileset,
        })
    }

    fn entry(&self, tile_index: usize) -> Result<&TileEntry> {
        self.tileset
            .tiles
            .get(tile_index)
            .ok_or_else(|| anyhow!("Tileset has no tile with index {tile_index}"))
    }
}

impl GeometryStore for JsonGeometryStore {
    fn tile_count(&self) -> usize {
        self.tileset.tiles.len()
    }

    fn load_tile_geometry(&self, tile_index: usize) -> Result<Arc<TileGeometry>> {
        let entry = self.entry(tile_index)?;
        let content: TileContent = read_json(&self.root.join(&entry.content))?;
        let bbox = entry
            .bbox
            .map(|b| Aabb::new(b.min, b.max, &entry.name, &entry.name));
        Ok(Arc::new(TileGeometry::new(
            &entry.name,
            content.triangles(&entry.name),
            bbox,
        )))
    }

    fn load_tile_bbox(&self, tile_index: usize) -> Result<Option<Aabb>> {
        let entry = self.entry(tile_index)?;
        Ok(entry
            .bbox
            .map(|b| Aabb::new(b.min, b.max, &entry.name, &entry.name)))
    }
}

/// Writes a tileset directory: `tileset.json` plus `<name>.json` per tile.
/// Each entry carries the box derived from its triangles.
pub fn write_tileset(dir: &Path, tiles: &[(String, TileContent)]) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    let mut tileset = Tileset { tiles: Vec::new() };
    for (name, content) in tiles {
        let file_name = format!("{name}.json");
        write_json(&dir.join(&file_name), content)?;
        let bbox = Aabb::from_triangles(&content.triangles(name), name, name).map(|b| BoxEntry {
            min: b.min,
            max: b.max,
        });
        tileset.tiles.push(TileEntry {
            name: name.clone(),
            content: file_name,
            bbox,
        });
    }
    write_json(&dir.join(TILESET_FILE), &tileset)
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to deserialize: {}", path.display()))
}

pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value)
        .with_context(|| format!("Failed to serialize to: {}", path.display()))
}
