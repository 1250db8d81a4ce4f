use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::SunlightError;
use crate::sim::features::FeatureRecord;

/// Which records an aggregator needs to see for one hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadScope {
    /// Only the records of the tile being aggregated.
    OwningTile,
    /// The records of every tile at the same hour.
    CrossTile,
}

/// Metric selector used by the run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Exposure,
    OccludePercent,
    OccludeAmount,
}

impl MetricKind {
    pub fn aggregator(self) -> Box<dyn Aggregator> {
        match self {
            MetricKind::Exposure => Box::new(ExposurePercent),
            MetricKind::OccludePercent => Box::new(OccludePercent),
            MetricKind::OccludeAmount => Box::new(OccludeAmount),
        }
    }
}

/// Data shared by every feature of a tile for one hour.
#[derive(Debug, Default)]
pub struct HourContext {
    /// Occluder id -> number of other features (any tile) it shadows.
    /// Filled only when a cross-tile aggregator is active.
    pub occlusions: HashMap<String, usize>,
}

impl HourContext {
    /// Counts, over all given record lists, how often each id occludes a
    /// feature other than itself.
    pub fn from_tiles<'a, I>(tiles: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a [FeatureRecord]>,
    {
        let mut occlusions = HashMap::new();
        for records in tiles {
            for record in records {
                let occluder = record.occulting_id()?;
                if occluder.is_empty() || occluder == record.id.as_str() {
                    continue;
                }
                *occlusions.entry(occluder.to_string()).or_insert(0) += 1;
            }
        }
        Ok(Self { occlusions })
    }

    pub fn occlusion_count(&self, id: &str) -> usize {
        self.occlusions.get(id).copied().unwrap_or(0)
    }
}

/// One metric of the aggregation pass.
///
/// An aggregator only says how much a feature contributes per hour and how
/// the totals are scaled; buffering and windowing live in [`Accumulator`].
pub trait Aggregator: Send {
    /// Metric name used in the `daily<Name>` / `monthly<Name>` keys.
    fn name(&self) -> &'static str;

    fn scope(&self) -> LoadScope;

    /// Decimal places kept after normalization.
    fn precision(&self) -> i32;

    /// Factor applied to `acc / hours`.
    fn scale(&self) -> f64 {
        100.
    }

    fn contribution(&self, record: &FeatureRecord, hour: &HourContext) -> Result<f64>;

    fn daily_key(&self) -> String {
        format!("daily{}", self.name())
    }

    fn monthly_key(&self) -> String {
        format!("monthly{}", self.name())
    }
}

/// Share of hours a feature is lit.
pub struct ExposurePercent;

impl Aggregator for ExposurePercent {
    fn name(&self) -> &'static str {
        "ExposurePercent"
    }

    fn scope(&self) -> LoadScope {
        LoadScope::OwningTile
    }

    fn precision(&self) -> i32 {
        2
    }

    fn contribution(&self, record: &FeatureRecord, _hour: &HourContext) -> Result<f64> {
        Ok(if record.is_lighted()? { 1. } else { 0. })
    }
}

/// Share of hours a feature shadows at least one other feature.
pub struct OccludePercent;

impl Aggregator for OccludePercent {
    fn name(&self) -> &'static str {
        "OccludePercent"
    }

    fn scope(&self) -> LoadScope {
        LoadScope::CrossTile
    }

    fn precision(&self) -> i32 {
        5
    }

    fn contribution(&self, record: &FeatureRecord, hour: &HourContext) -> Result<f64> {
        Ok(if hour.occlusion_count(record.id.as_str()) > 0 {
            1.
        } else {
            0.
        })
    }
}

/// Mean number of other features a feature shadows per hour.
pub struct OccludeAmount;

impl Aggregator for OccludeAmount {
    fn name(&self) -> &'static str {
        "OccludeAmount"
    }

    fn scope(&self) -> LoadScope {
        LoadScope::CrossTile
    }

    fn precision(&self) -> i32 {
        5
    }

    fn scale(&self) -> f64 {
        1.
    }

    fn contribution(&self, record: &FeatureRecord, hour: &HourContext) -> Result<f64> {
        Ok(hour.occlusion_count(record.id.as_str()) as f64)
    }
}

/// Rounds half away from zero to `precision` decimal places.
pub fn round_to(value: f64, precision: i32) -> f64 {
    let factor = 10f64.powi(precision);
    (value * factor).round() / factor
}

/// Daily and monthly running totals of one aggregator for one tile.
pub struct Accumulator {
    aggregator: Box<dyn Aggregator>,
    daily: Vec<f64>,
    monthly: Vec<f64>,
}

impl Accumulator {
    pub fn new(aggregator: Box<dyn Aggregator>) -> Self {
        Self {
            aggregator,
            daily: Vec::new(),
            monthly: Vec::new(),
        }
    }

    pub fn aggregator(&self) -> &dyn Aggregator {
        self.aggregator.as_ref()
    }

    /// Clears both buffers and sizes them for a tile.
    pub fn initialize(&mut self, feature_count: usize) {
        self.daily.clear();
        self.daily.resize(feature_count, 0.);
        self.monthly.clear();
        self.monthly.resize(feature_count, 0.);
    }

    /// Adds one hour. `slots[i]` is the buffer index of `records[i]`.
    pub fn fold_hour(
        &mut self,
        records: &[FeatureRecord],
        slots: &[usize],
        hour: &HourContext,
    ) -> Result<()> {
        for (record, &slot) in records.iter().zip(slots) {
            self.daily[slot] += self.aggregator.contribution(record, hour)?;
        }
        Ok(())
    }

    /// Normalized daily values. Carries the raw day totals into the month
    /// and resets the day.
    pub fn close_day(&mut self, hours: usize, window: &str) -> Result<Vec<f64>> {
        let values = self.normalize(&self.daily, hours, window)?;
        for (month, day) in self.monthly.iter_mut().zip(self.daily.iter_mut()) {
            *month += *day;
            *day = 0.;
        }
        Ok(values)
    }

    /// Normalized monthly values. Resets the month.
    pub fn close_month(&mut self, hours: usize, window: &str) -> Result<Vec<f64>> {
        let values = self.normalize(&self.monthly, hours, window)?;
        self.monthly.iter_mut().for_each(|v| *v = 0.);
        Ok(values)
    }

    fn normalize(&self, totals: &[f64], hours: usize, window: &str) -> Result<Vec<f64>> {
        if hours == 0 {
            return Err(SunlightError::EmptyWindow {
                window: window.to_string(),
            }
            .into());
        }
        let scale = self.aggregator.scale();
        let precision = self.aggregator.precision();
        Ok(totals
            .iter()
            .map(|acc| round_to(scale * acc / hours as f64, precision))
            .collect())
    }
}
