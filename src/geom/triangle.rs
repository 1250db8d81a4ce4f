use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Point, Vector};

/// Globally stable triangle identifier.
///
/// Composed of the tile name, the source feature id and the local triangle
/// index, so the same triangle keeps the same id across every timestamp.
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriangleId(String);

impl TriangleId {
    pub fn compose(tile: &str, feature: &str, index: usize) -> Self {
        Self(format!("Tile-{tile}__Feature-{feature}__Triangle-{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TriangleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TriangleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for TriangleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A triangle of a tile's triangle soup.
///
/// The outward normal follows the counter-clockwise winding `a -> b -> c`.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub a: Point,
    pub b: Point,
    pub c: Point,
    pub id: TriangleId,
    /// Name of the tile owning this triangle.
    pub tile: String,
}

impl Triangle {
    pub fn new(a: Point, b: Point, c: Point, id: TriangleId, tile: &str) -> Self {
        Self {
            a,
            b,
            c,
            id,
            tile: tile.to_string(),
        }
    }

    pub fn vertices(&self) -> [Point; 3] {
        [self.a, self.b, self.c]
    }

    /// Unit normal, `None` for a degenerate triangle.
    pub fn normal(&self) -> Option<Vector> {
        Vector::normal(self.a, self.b, self.c)
    }

    pub fn centroid(&self) -> Point {
        Point::new(
            (self.a.x + self.b.x + self.c.x) / 3.,
            (self.a.y + self.b.y + self.c.y) / 3.,
            (self.a.z + self.b.z + self.c.z) / 3.,
        )
    }

    /// Checks whether the front side of the triangle faces the sun.
    ///
    /// `sun_direction` points from the scene toward the sun. Grazing light
    /// (normal perpendicular to the sun) and degenerate triangles count as
    /// facing away.
    pub fn is_facing(&self, sun_direction: Vector) -> bool {
        match self.normal() {
            Some(vn) => vn.dot(sun_direction) > 0.,
            None => false,
        }
    }
}
