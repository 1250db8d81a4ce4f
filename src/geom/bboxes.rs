use serde::{Deserialize, Serialize};

use crate::geom::point::Point;
use crate::geom::triangle::Triangle;

/// Axis-aligned bounding box of a tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Point,
    pub max: Point,
    #[serde(default)]
    pub id: String,
    /// Name of the tile this box bounds.
    #[serde(default)]
    pub tile: String,
}

impl Aabb {
    /// Creates a box from two opposite corners given in any order.
    pub fn new(p0: Point, p1: Point, id: &str, tile: &str) -> Self {
        Self {
            min: p0.min(&p1),
            max: p0.max(&p1),
            id: id.to_string(),
            tile: tile.to_string(),
        }
    }

    /// Box holding all vertices of `triangles`. `None` if there are no triangles.
    pub fn from_triangles(triangles: &[Triangle], id: &str, tile: &str) -> Option<Self> {
        let pts: Vec<Point> = triangles.iter().flat_map(|t| t.vertices()).collect();
        let (pmin, pmax) = bounding_box(&pts)?;
        Some(Self::new(pmin, pmax, id, tile))
    }
}

/// Returns min and max corners of the box holding all points `pts`.
pub fn bounding_box(pts: &[Point]) -> Option<(Point, Point)> {
    let first = pts.first()?;
    Some(
        pts.iter()
            .skip(1)
            .fold((*first, *first), |(pmin, pmax), p| (pmin.min(p), pmax.max(p))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::triangle::TriangleId;

    #[test]
    fn test_bounding_box() {
        let pts = vec![
            Point::new(1., -2., 0.),
            Point::new(-1., 4., 2.),
            Point::new(0., 0., -3.),
        ];
        let (pmin, pmax) = bounding_box(&pts).unwrap();
        assert!(pmin.is_close(&Point::new(-1., -2., -3.)));
        assert!(pmax.is_close(&Point::new(1., 4., 2.)));
        assert!(bounding_box(&[]).is_none());
    }

    #[test]
    fn test_new_orders_corners() {
        let bbox = Aabb::new(Point::new(1., 1., 1.), Point::new(0., 2., 0.), "0", "t");
        assert_eq!(bbox.min, Point::new(0., 1., 0.));
        assert_eq!(bbox.max, Point::new(1., 2., 1.));
    }

    #[test]
    fn test_from_triangles() {
        let tri = Triangle::new(
            Point::new(0., 0., 0.),
            Point::new(2., 0., 1.),
            Point::new(0., 3., 0.),
            TriangleId::from("a"),
            "t",
        );
        let bbox = Aabb::from_triangles(&[tri], "0", "t").unwrap();
        assert_eq!(bbox.min, Point::new(0., 0., 0.));
        assert_eq!(bbox.max, Point::new(2., 3., 1.));
        assert_eq!(bbox.tile, "t");
        assert!(Aabb::from_triangles(&[], "0", "t").is_none());
    }
}
