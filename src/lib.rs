pub mod error;
pub mod geom;
pub mod io;
pub mod logging;
pub mod sim;

// Prelude
pub use error::SunlightError;
pub use geom::bboxes::Aabb;
pub use geom::point::Point;
pub use geom::ray::{BruteForceOracle, IntersectionOracle, Ray, RayHit};
pub use geom::triangle::{Triangle, TriangleId};
pub use geom::vector::Vector;
pub use sim::aggregation::{AggregationEngine, MetricKind};
pub use sim::config::SunlightConfig;
pub use sim::features::FeatureRecord;
pub use sim::geometry::{GeometryStore, TileGeometry};
pub use sim::pipeline::SunlightPipeline;
pub use sim::records::FeatureRecordStore;
pub use sim::sun::{SunSample, SunSampleSource};
pub use sim::time::TimeHierarchy;
pub use sim::visibility::{VisibilityEngine, VisibilityOutcome};
