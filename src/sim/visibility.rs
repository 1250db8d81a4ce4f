//! Per-sun-sample visibility of every triangle of a tile partition.
//!
//! A triangle facing away from the sun shadows itself. Any other triangle
//! casts one ray toward the sun; tiles whose box the ray misses are pruned,
//! and the nearest triangle struck across the remaining tiles is the
//! occluder.

use std::sync::Arc;

use anyhow::Result;
use rayon::prelude::*;
use tracing::debug;

use crate::SunlightError;
use crate::geom::ray::{IntersectionOracle, Ray};
use crate::geom::triangle::{Triangle, TriangleId};

use super::geometry::{GeometryCache, GeometryStore, TileGeometry};
use super::sun::SunSample;

/// Visibility of one triangle at one sun sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityOutcome {
    Lit,
    /// Blocked by the given triangle (possibly the triangle itself).
    Occluded(TriangleId),
}

impl VisibilityOutcome {
    pub fn is_lit(&self) -> bool {
        matches!(self, Self::Lit)
    }

    pub fn occluder(&self) -> Option<&TriangleId> {
        match self {
            Self::Lit => None,
            Self::Occluded(id) => Some(id),
        }
    }
}

/// Ray cast for one sun-facing triangle and the tiles whose box it enters.
struct CastRay {
    ray: Ray,
    candidate_tiles: Vec<usize>,
}

#[derive(Clone, Copy)]
struct NearestHit<'a> {
    distance: f64,
    triangle: &'a Triangle,
}

impl NearestHit<'_> {
    /// Strictly closer wins; equal distances go to the smaller (tile, id).
    fn is_better_than(&self, other: &Self) -> bool {
        self.distance < other.distance
            || (self.distance == other.distance
                && (&self.triangle.tile, &self.triangle.id)
                    < (&other.triangle.tile, &other.triangle.id))
    }
}

pub struct VisibilityEngine<'o, O: IntersectionOracle + ?Sized> {
    oracle: &'o O,
    ray_bias: f64,
    parallel: bool,
}

impl<'o, O: IntersectionOracle + ?Sized> VisibilityEngine<'o, O> {
    pub fn new(oracle: &'o O, ray_bias: f64, parallel: bool) -> Self {
        Self {
            oracle,
            ray_bias,
            parallel,
        }
    }

    /// Computes the outcome of every triangle of every tile for one sample.
    ///
    /// `result[tile][i]` belongs to triangle `i` of that tile's soup.
    pub fn compute_visibility<S: GeometryStore + ?Sized>(
        &self,
        cache: &mut GeometryCache<'_, S>,
        sample: &SunSample,
    ) -> Result<Vec<Vec<VisibilityOutcome>>> {
        let num_tiles = cache.tile_count();
        let mut outcomes = Vec::with_capacity(num_tiles);
        for tile_index in 0..num_tiles {
            outcomes.push(self.compute_tile(cache, tile_index, sample)?);
        }
        Ok(outcomes)
    }

    /// Computes the outcomes of the triangles of one tile.
    pub fn compute_tile<S: GeometryStore + ?Sized>(
        &self,
        cache: &mut GeometryCache<'_, S>,
        tile_index: usize,
        sample: &SunSample,
    ) -> Result<Vec<VisibilityOutcome>> {
        let tile = cache.get(tile_index, &sample.label)?;
        if tile.triangles.is_empty() {
            return Ok(Vec::new());
        }

        // Rays and box pruning
        let bboxes = cache.bounding_boxes(&sample.label)?.to_vec();
        let casts: Vec<Option<CastRay>> = self.map_indices(tile.triangles.len(), |i| {
            let triangle = &tile.triangles[i];
            if !triangle.is_facing(sample.direction) {
                return Ok(None);
            }
            let ray = Ray::toward_sun(triangle, sample.direction, self.ray_bias).ok_or_else(
                || SunlightError::Intersection(format!("zero sun direction at {}", sample.label)),
            )?;
            let mut candidate_tiles = Vec::new();
            for (other_index, bbox) in bboxes.iter().enumerate() {
                let Some(bbox) = bbox else {
                    continue;
                };
                if !self
                    .oracle
                    .intersect_boxes(&ray, std::slice::from_ref(bbox))?
                    .is_empty()
                {
                    candidate_tiles.push(other_index);
                }
            }
            Ok(Some(CastRay {
                ray,
                candidate_tiles,
            }))
        })?;

        // Load every tile some ray may strike, once for the whole tile
        let mut pool: Vec<Option<Arc<TileGeometry>>> = vec![None; bboxes.len()];
        pool[tile_index] = Some(Arc::clone(&tile));
        for cast in casts.iter().flatten() {
            for &other_index in &cast.candidate_tiles {
                if pool[other_index].is_none() {
                    pool[other_index] = Some(cache.get(other_index, &sample.label)?);
                }
            }
        }
        debug!(
            tile = tile_index,
            name = %tile.name,
            triangles = tile.triangles.len(),
            pooled = pool.iter().flatten().count(),
            label = %sample.label,
            "visibility of tile"
        );

        self.map_indices(tile.triangles.len(), |i| {
            let triangle = &tile.triangles[i];
            let Some(cast) = &casts[i] else {
                // Facing away: nothing blocks it but itself
                return Ok(VisibilityOutcome::Occluded(triangle.id.clone()));
            };
            let nearest = self.nearest_hit(triangle, cast, &pool)?;
            Ok(match nearest {
                Some(hit) => VisibilityOutcome::Occluded(hit.triangle.id.clone()),
                None => VisibilityOutcome::Lit,
            })
        })
    }

    fn nearest_hit<'p>(
        &self,
        origin: &Triangle,
        cast: &CastRay,
        pool: &'p [Option<Arc<TileGeometry>>],
    ) -> Result<Option<NearestHit<'p>>> {
        let mut best: Option<NearestHit<'p>> = None;
        for &other_index in &cast.candidate_tiles {
            let Some(other) = &pool[other_index] else {
                continue;
            };
            for hit in self.oracle.intersect_triangles(&cast.ray, &other.triangles)? {
                if hit.solid.id == origin.id {
                    continue;
                }
                let candidate = NearestHit {
                    distance: hit.distance,
                    triangle: hit.solid,
                };
                if best.is_none_or(|b| candidate.is_better_than(&b)) {
                    best = Some(candidate);
                }
            }
        }
        Ok(best)
    }

    fn map_indices<T, F>(&self, n: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send,
    {
        if self.parallel {
            (0..n).into_par_iter().map(f).collect()
        } else {
            (0..n).map(f).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::ray::BruteForceOracle;
    use crate::sim::geometry::InMemoryGeometryStore;
    use crate::Vector;

    fn tri(tile: &str, idx: usize, a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Triangle {
        Triangle::new(
            a.into(),
            b.into(),
            c.into(),
            TriangleId::compose(tile, "0", idx),
            tile,
        )
    }

    /// Upward-facing unit triangle at height z, offset in x.
    fn up(tile: &str, idx: usize, x: f64, z: f64) -> Triangle {
        tri(
            tile,
            idx,
            [x, 0., z],
            [x + 1., 0., z],
            [x, 1., z],
        )
    }

    /// Large upward-facing triangle at height z covering the unit square.
    fn roof(tile: &str, idx: usize, z: f64) -> Triangle {
        tri(tile, idx, [-5., -5., z], [10., -5., z], [-5., 10., z])
    }

    fn run(tiles: Vec<TileGeometry>, sun: Vector, parallel: bool) -> Vec<Vec<VisibilityOutcome>> {
        let store = InMemoryGeometryStore::new(tiles);
        let mut cache = GeometryCache::new(&store, 0);
        let engine = VisibilityEngine::new(&BruteForceOracle, 1e-6, parallel);
        let sample = SunSample::new("2016-06-21:1200", sun).unwrap();
        engine.compute_visibility(&mut cache, &sample).unwrap()
    }

    #[test]
    fn test_single_triangle_overhead_sun_is_lit() {
        let tiles = vec![TileGeometry::new("t0", vec![up("t0", 0, 0., 0.)], None)];
        let out = run(tiles, Vector::new(0., 0., 1.), false);
        assert_eq!(out, vec![vec![VisibilityOutcome::Lit]]);
    }

    #[test]
    fn test_sun_behind_coplanar_triangles_self_shadows() {
        let a = up("t0", 0, 0., 0.);
        let b = up("t0", 1, 2., 0.);
        let ids = [a.id.clone(), b.id.clone()];
        let tiles = vec![TileGeometry::new("t0", vec![a, b], None)];
        let out = run(tiles, Vector::new(0., 0., -1.), true);
        assert_eq!(
            out[0],
            vec![
                VisibilityOutcome::Occluded(ids[0].clone()),
                VisibilityOutcome::Occluded(ids[1].clone()),
            ]
        );
    }

    #[test]
    fn test_occluder_in_other_tile() {
        let ground = up("t0", 0, 0., 0.);
        let roof = roof("t1", 0, 5.);
        let roof_id = roof.id.clone();
        let tiles = vec![
            TileGeometry::new("t0", vec![ground], None),
            TileGeometry::new("t1", vec![roof], None),
        ];
        let out = run(tiles, Vector::new(0., 0., 1.), true);
        assert_eq!(out[0], vec![VisibilityOutcome::Occluded(roof_id)]);
        // The roof itself sees the sun
        assert_eq!(out[1], vec![VisibilityOutcome::Lit]);
    }

    #[test]
    fn test_nearest_occluder_wins() {
        let ground = up("t0", 0, 0., 0.);
        let low = roof("t1", 0, 2.);
        let high = roof("t2", 0, 6.);
        let low_id = low.id.clone();
        let tiles = vec![
            TileGeometry::new("t0", vec![ground], None),
            TileGeometry::new("t2", vec![high], None),
            TileGeometry::new("t1", vec![low], None),
        ];
        let out = run(tiles, Vector::new(0., 0., 1.), false);
        assert_eq!(out[0], vec![VisibilityOutcome::Occluded(low_id)]);
    }

    #[test]
    fn test_equal_distance_tie_break_is_by_tile_then_id() {
        let ground = up("t0", 0, 0., 0.);
        // Two identical occluders at the same height in different tiles
        let in_b = roof("b", 0, 3.);
        let in_a = roof("a", 0, 3.);
        let a_id = in_a.id.clone();
        let forward = vec![
            TileGeometry::new("t0", vec![ground.clone()], None),
            TileGeometry::new("b", vec![in_b.clone()], None),
            TileGeometry::new("a", vec![in_a.clone()], None),
        ];
        let reversed = vec![
            TileGeometry::new("t0", vec![ground], None),
            TileGeometry::new("a", vec![in_a], None),
            TileGeometry::new("b", vec![in_b], None),
        ];
        let sun = Vector::new(0., 0., 1.);
        assert_eq!(run(forward, sun, false)[0][0], VisibilityOutcome::Occluded(a_id.clone()));
        assert_eq!(run(reversed, sun, false)[0][0], VisibilityOutcome::Occluded(a_id));
    }

    #[test]
    fn test_sun_facing_never_occluded_by_itself() {
        // A tilted roof facing the sun: the ray leaves the triangle itself
        let roof = tri("t0", 0, [0., 0., 0.], [1., 0., 1.], [0., 1., 0.]);
        let sun = Vector::new(-1., 0., 1.);
        assert!(roof.is_facing(sun));
        let tiles = vec![TileGeometry::new("t0", vec![roof], None)];
        let out = run(tiles, sun, false);
        assert_eq!(out[0][0], VisibilityOutcome::Lit);
    }

    #[test]
    fn test_pruned_tile_does_not_change_result() {
        let ground = up("t0", 0, 0., 0.);
        let roof = roof("t1", 0, 5.);
        let far = up("far", 0, 100., 0.);
        let sun = Vector::new(0., 0., 1.);
        let full = run(
            vec![
                TileGeometry::new("t0", vec![ground.clone()], None),
                TileGeometry::new("t1", vec![roof.clone()], None),
                TileGeometry::new("far", vec![far], None),
            ],
            sun,
            true,
        );
        let pruned = run(
            vec![
                TileGeometry::new("t0", vec![ground], None),
                TileGeometry::new("t1", vec![roof], None),
            ],
            sun,
            true,
        );
        assert_eq!(full[0], pruned[0]);
        assert_eq!(full[1], pruned[1]);
    }

    #[test]
    fn test_empty_tile_has_no_outcomes() {
        let tiles = vec![
            TileGeometry::new("empty", vec![], None),
            TileGeometry::new("t0", vec![up("t0", 0, 0., 0.)], None),
        ];
        let out = run(tiles, Vector::new(0., 0., 1.), true);
        assert!(out[0].is_empty());
        assert_eq!(out[1].len(), 1);
    }

    #[test]
    fn test_exactly_one_outcome_per_triangle() {
        let soup: Vec<Triangle> = (0..20)
            .map(|i| up("t0", i, i as f64 * 0.5, (i % 3) as f64))
            .collect();
        let n = soup.len();
        let tiles = vec![TileGeometry::new("t0", soup, None)];
        for sun in [
            Vector::new(0., 0., 1.),
            Vector::new(1., 0., 1.),
            Vector::new(0., 1., -1.),
        ] {
            let sequential = run(tiles.clone(), sun, false);
            let parallel = run(tiles.clone(), sun, true);
            assert_eq!(sequential[0].len(), n);
            assert_eq!(sequential, parallel);
        }
    }

    #[test]
    fn test_geometry_cached_within_pass() -> Result<()> {
        let store = InMemoryGeometryStore::new(vec![
            TileGeometry::new("t0", vec![up("t0", 0, 0., 0.)], None),
            TileGeometry::new("t1", vec![roof("t1", 0, 5.)], None),
        ]);
        let mut cache = GeometryCache::new(&store, 0);
        let engine = VisibilityEngine::new(&BruteForceOracle, 1e-6, false);
        let sample = SunSample::new("2016-06-21:1200", Vector::new(0., 0., 1.)).unwrap();
        engine.compute_visibility(&mut cache, &sample)?;
        assert_eq!(cache.loads(), 2);
        Ok(())
    }
}
