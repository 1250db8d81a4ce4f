//! Per-feature records persisted for every (tile, timestamp) pair.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Point;
use crate::SunlightError;
use crate::geom::triangle::{Triangle, TriangleId};

use super::sun::SunSample;
use super::visibility::VisibilityOutcome;

/// Attribute keys written by the visibility pass.
pub mod keys {
    pub const DATE: &str = "date";
    pub const LIGHTED: &str = "bLighted";
    pub const OCCULTING_ID: &str = "occultingId";
}

/// Computed attributes of one feature (triangle) at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub id: TriangleId,
    pub geometry: [Point; 3],
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl FeatureRecord {
    pub fn new(id: TriangleId, geometry: [Point; 3]) -> Self {
        Self {
            id,
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// `bLighted` of the record.
    pub fn is_lighted(&self) -> Result<bool> {
        self.get(keys::LIGHTED)
            .and_then(Value::as_bool)
            .ok_or_else(|| self.missing(keys::LIGHTED))
    }

    /// `occultingId` of the record, empty when lit.
    pub fn occulting_id(&self) -> Result<&str> {
        self.get(keys::OCCULTING_ID)
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing(keys::OCCULTING_ID))
    }

    /// Attributes in export order: `date`, `bLighted`, `occultingId`, then
    /// `daily*` keys, then `monthly*` keys, then everything else.
    pub fn ordered_attributes(&self) -> Vec<(&str, &Value)> {
        let rank = |key: &str| match key {
            keys::DATE => 0,
            keys::LIGHTED => 1,
            keys::OCCULTING_ID => 2,
            k if k.starts_with("daily") => 3,
            k if k.starts_with("monthly") => 4,
            _ => 5,
        };
        let mut attributes: Vec<(&str, &Value)> = self
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        // BTreeMap order breaks ties alphabetically
        attributes.sort_by_key(|&(k, _)| rank(k));
        attributes
    }

    fn missing(&self, key: &str) -> anyhow::Error {
        SunlightError::MissingAttribute {
            feature: self.id.to_string(),
            key: key.to_string(),
        }
        .into()
    }
}

/// Builds one record per triangle, in triangle order.
pub fn project_outcomes(
    tile_index: usize,
    triangles: &[Triangle],
    outcomes: &[VisibilityOutcome],
    sample: &SunSample,
) -> Result<Vec<FeatureRecord>> {
    if triangles.len() != outcomes.len() {
        return Err(SunlightError::IndexMismatch {
            tile: tile_index,
            timestamp: sample.label.clone(),
            expected: triangles.len(),
            found: outcomes.len(),
            detail: "one visibility outcome per triangle is required".to_string(),
        }
        .into());
    }

    Ok(triangles
        .iter()
        .zip(outcomes)
        .map(|(triangle, outcome)| {
            let mut record = FeatureRecord::new(triangle.id.clone(), triangle.vertices());
            record.set(keys::DATE, sample.label.as_str());
            record.set(keys::LIGHTED, outcome.is_lit());
            record.set(
                keys::OCCULTING_ID,
                outcome.occluder().map(TriangleId::as_str).unwrap_or(""),
            );
            record
        })
        .collect())
}
