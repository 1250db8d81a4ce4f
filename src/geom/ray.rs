//! Ray casting infrastructure.
//!
//! Provides the [`Ray`] type, the elementary ray/triangle and ray/box tests,
//! and the [`IntersectionOracle`] seam the visibility engine queries.

use anyhow::Result;

use crate::SunlightError;
use crate::geom::EPS;
use crate::geom::bboxes::Aabb;
use crate::geom::triangle::Triangle;
use crate::{Point, Vector};

/// Hits closer than this to the ray origin are ignored.
pub const MIN_HIT_DISTANCE: f64 = 1e-10;

/// A ray defined by an origin point and a unit direction vector.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point,
    pub direction: Vector,
}

/// A solid struck by a ray and the distance along the ray.
#[derive(Debug, Clone, Copy)]
pub struct RayHit<'a, S> {
    pub solid: &'a S,
    pub distance: f64,
}

impl Ray {
    /// Creates a new ray from origin point and direction vector.
    ///
    /// The direction vector is automatically normalized.
    pub fn new(origin: Point, direction: Vector) -> Option<Self> {
        let direction = direction.normalize()?;
        Some(Self { origin, direction })
    }

    /// Ray leaving the triangle's centroid toward the sun.
    ///
    /// The origin is moved by `bias` along the sun direction so the
    /// originating triangle is not struck by its own ray.
    pub fn toward_sun(triangle: &Triangle, sun_direction: Vector, bias: f64) -> Option<Self> {
        let direction = sun_direction.normalize()?;
        Self::new(triangle.centroid() + direction * bias, direction)
    }

    fn is_finite(&self) -> bool {
        [
            self.origin.x,
            self.origin.y,
            self.origin.z,
            self.direction.dx,
            self.direction.dy,
            self.direction.dz,
        ]
        .iter()
        .all(|v| v.is_finite())
    }

    /// Möller–Trumbore ray/triangle test.
    ///
    /// Returns the distance to the hit, only for hits in front of the origin.
    /// Degenerate triangles and rays parallel to the triangle plane never hit.
    pub fn intersect_triangle(&self, triangle: &Triangle) -> Option<f64> {
        let e1 = triangle.b - triangle.a;
        let e2 = triangle.c - triangle.a;
        let pvec = self.direction.cross(e2);
        let det = e1.dot(pvec);
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1. / det;

        let tvec = self.origin - triangle.a;
        let u = tvec.dot(pvec) * inv_det;
        if !(-EPS..=1. + EPS).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(e1);
        let v = self.direction.dot(qvec) * inv_det;
        if v < -EPS || u + v > 1. + EPS {
            return None;
        }

        let t = e2.dot(qvec) * inv_det;
        if t > MIN_HIT_DISTANCE { Some(t) } else { None }
    }

    /// Slab test against an axis-aligned box.
    ///
    /// Returns the entry distance (0 when the origin is inside the box).
    pub fn intersect_aabb(&self, bbox: &Aabb) -> Option<f64> {
        let origin = [self.origin.x, self.origin.y, self.origin.z];
        let dir = [self.direction.dx, self.direction.dy, self.direction.dz];
        let bmin = [bbox.min.x, bbox.min.y, bbox.min.z];
        let bmax = [bbox.max.x, bbox.max.y, bbox.max.z];

        let mut tmin = 0.0_f64;
        let mut tmax = f64::INFINITY;
        for axis in 0..3 {
            if dir[axis].abs() < EPS {
                // Parallel to the slab: the origin must lie between the planes
                if origin[axis] < bmin[axis] - EPS || origin[axis] > bmax[axis] + EPS {
                    return None;
                }
                continue;
            }
            let inv = 1. / dir[axis];
            let mut t0 = (bmin[axis] - origin[axis]) * inv;
            let mut t1 = (bmax[axis] - origin[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            tmin = tmin.max(t0);
            tmax = tmax.min(t1);
            if tmin > tmax + EPS {
                return None;
            }
        }
        Some(tmin)
    }
}

/// Capability answering "which solids does this ray hit, nearest first".
pub trait IntersectionOracle: Sync {
    fn intersect_boxes<'a>(&self, ray: &Ray, boxes: &'a [Aabb]) -> Result<Vec<RayHit<'a, Aabb>>>;

    fn intersect_triangles<'a>(
        &self,
        ray: &Ray,
        triangles: &'a [Triangle],
    ) -> Result<Vec<RayHit<'a, Triangle>>>;
}

/// Brute-force oracle built on [`Ray::intersect_triangle`] and [`Ray::intersect_aabb`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BruteForceOracle;

impl BruteForceOracle {
    fn collect<'a, S>(
        ray: &Ray,
        solids: &'a [S],
        test: impl Fn(&Ray, &S) -> Option<f64>,
    ) -> Result<Vec<RayHit<'a, S>>> {
        if !ray.is_finite() {
            return Err(SunlightError::Intersection(format!(
                "non-finite ray {} -> {}",
                ray.origin, ray.direction
            ))
            .into());
        }
        let mut hits: Vec<RayHit<'a, S>> = solids
            .iter()
            .filter_map(|solid| test(ray, solid).map(|distance| RayHit { solid, distance }))
            .collect();
        // Stable sort keeps input order for equal distances
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(hits)
    }
}

impl IntersectionOracle for BruteForceOracle {
    fn intersect_boxes<'a>(&self, ray: &Ray, boxes: &'a [Aabb]) -> Result<Vec<RayHit<'a, Aabb>>> {
        Self::collect(ray, boxes, Ray::intersect_aabb)
    }

    fn intersect_triangles<'a>(
        &self,
        ray: &Ray,
        triangles: &'a [Triangle],
    ) -> Result<Vec<RayHit<'a, Triangle>>> {
        Self::collect(ray, triangles, Ray::intersect_triangle)
    }
}
