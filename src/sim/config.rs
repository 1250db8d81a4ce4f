use serde::{Deserialize, Serialize};

use super::aggregation::MetricKind;

/// Configuration for a sunlight run.
///
/// Every field is optional in the JSON form; missing fields take the
/// values of [`SunlightConfig::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SunlightConfig {
    /// Distance the ray origin is moved along the sun direction.
    pub ray_bias: f64,
    /// Number of tiles kept loaded during one visibility pass (0 = all).
    pub cache_capacity: usize,
    /// Evaluate triangles of a tile on the rayon pool.
    pub parallel: bool,
    /// Metrics computed by the aggregation pass.
    pub aggregators: Vec<MetricKind>,
}

impl SunlightConfig {
    pub fn new() -> Self {
        Self {
            ray_bias: 1e-6,
            cache_capacity: 0,
            parallel: true,
            aggregators: vec![MetricKind::Exposure],
        }
    }
}

impl Default for SunlightConfig {
    fn default() -> Self {
        Self::new()
    }
}
