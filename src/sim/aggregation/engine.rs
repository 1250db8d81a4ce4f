use std::collections::HashMap;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::SunlightError;
use crate::geom::triangle::TriangleId;
use crate::sim::features::FeatureRecord;
use crate::sim::records::FeatureRecordStore;
use crate::sim::time::TimeHierarchy;

use super::aggregator::{Accumulator, HourContext, LoadScope, MetricKind};

/// Feature id -> buffer slot of one tile, fixed by the first hour read.
struct FeatureIndex {
    slots: HashMap<TriangleId, usize>,
}

impl FeatureIndex {
    fn new(tile: usize, label: &str, records: &[FeatureRecord]) -> Result<Self> {
        let mut slots = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if slots.insert(record.id.clone(), i).is_some() {
                return Err(mismatch(
                    tile,
                    label,
                    records.len(),
                    records.len(),
                    format!("duplicate feature id {}", record.id),
                ));
            }
        }
        Ok(Self { slots })
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    /// Slot of every record, in record order.
    fn join(&self, tile: usize, label: &str, records: &[FeatureRecord]) -> Result<Vec<usize>> {
        if records.len() != self.len() {
            return Err(mismatch(
                tile,
                label,
                self.len(),
                records.len(),
                "record count differs from the first hour".to_string(),
            ));
        }
        let mut seen = vec![false; self.len()];
        records
            .iter()
            .map(|record| {
                let slot = *self.slots.get(&record.id).ok_or_else(|| {
                    mismatch(
                        tile,
                        label,
                        self.len(),
                        records.len(),
                        format!("unknown feature id {}", record.id),
                    )
                })?;
                if std::mem::replace(&mut seen[slot], true) {
                    return Err(mismatch(
                        tile,
                        label,
                        self.len(),
                        records.len(),
                        format!("duplicate feature id {}", record.id),
                    ));
                }
                Ok(slot)
            })
            .collect()
    }
}

fn mismatch(tile: usize, label: &str, expected: usize, found: usize, detail: String) -> anyhow::Error {
    SunlightError::IndexMismatch {
        tile,
        timestamp: label.to_string(),
        expected,
        found,
        detail,
    }
    .into()
}

/// Walks the month → day → hour tree of every tile and writes the daily and
/// monthly metrics back into each hourly record.
pub struct AggregationEngine {
    accumulators: Vec<Accumulator>,
}

impl AggregationEngine {
    /// Exposure is always computed; other metrics are added once each.
    pub fn new(metrics: &[MetricKind]) -> Self {
        let mut kinds = vec![MetricKind::Exposure];
        for &metric in metrics {
            if !kinds.contains(&metric) {
                kinds.push(metric);
            }
        }
        Self {
            accumulators: kinds
                .into_iter()
                .map(|k| Accumulator::new(k.aggregator()))
                .collect(),
        }
    }

    /// Names of the active metrics, in write order.
    pub fn metric_names(&self) -> Vec<&'static str> {
        self.accumulators
            .iter()
            .map(|a| a.aggregator().name())
            .collect()
    }

    fn needs_cross_tile(&self) -> bool {
        self.accumulators
            .iter()
            .any(|a| a.aggregator().scope() == LoadScope::CrossTile)
    }

    pub fn compute_and_export<R: FeatureRecordStore + ?Sized>(
        &mut self,
        store: &mut R,
        tile_count: usize,
        hierarchy: &TimeHierarchy,
    ) -> Result<()> {
        info!(
            tile_count,
            months = hierarchy.months.len(),
            hours = hierarchy.num_hours(),
            metrics = ?self.metric_names(),
            "Aggregating"
        );
        for tile in 0..tile_count {
            self.aggregate_tile(store, tile, tile_count, hierarchy)?;
        }
        Ok(())
    }

    fn aggregate_tile<R: FeatureRecordStore + ?Sized>(
        &mut self,
        store: &mut R,
        tile: usize,
        tile_count: usize,
        hierarchy: &TimeHierarchy,
    ) -> Result<()> {
        let Some(first) = hierarchy.hours().next() else {
            return Ok(());
        };
        let index = FeatureIndex::new(tile, first, &read(store, tile, first)?)?;
        info!(tile, features = index.len(), "Aggregating tile");

        for acc in &mut self.accumulators {
            acc.initialize(index.len());
        }

        for month in &hierarchy.months {
            for day in &month.days {
                for label in &day.hours {
                    self.fold_hour(store, tile, tile_count, label, &index)?;
                }
                let window = format!("month {} day {}", month.key, day.key);
                let values = self
                    .accumulators
                    .iter_mut()
                    .map(|acc| {
                        let key = acc.aggregator().daily_key();
                        Ok::<_, anyhow::Error>((key, acc.close_day(day.hours.len(), &window)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                write_back(store, tile, day.hours.iter().map(String::as_str), &index, &values)?;
            }

            let window = format!("month {}", month.key);
            let values = self
                .accumulators
                .iter_mut()
                .map(|acc| {
                    let key = acc.aggregator().monthly_key();
                    Ok::<_, anyhow::Error>((key, acc.close_month(month.num_hours(), &window)?))
                })
                .collect::<Result<Vec<_>>>()?;
            write_back(store, tile, month.hours(), &index, &values)?;
            debug!(tile, month = %month.key, hours = month.num_hours(), "Month written");
        }
        Ok(())
    }

    fn fold_hour<R: FeatureRecordStore + ?Sized>(
        &mut self,
        store: &R,
        tile: usize,
        tile_count: usize,
        label: &str,
        index: &FeatureIndex,
    ) -> Result<()> {
        let (records, hour) = if self.needs_cross_tile() {
            let mut all = (0..tile_count)
                .map(|t| read(store, t, label))
                .collect::<Result<Vec<_>>>()?;
            let hour = HourContext::from_tiles(all.iter().map(Vec::as_slice))?;
            (all.swap_remove(tile), hour)
        } else {
            (read(store, tile, label)?, HourContext::default())
        };

        let slots = index.join(tile, label, &records)?;
        for acc in &mut self.accumulators {
            acc.fold_hour(&records, &slots, &hour)?;
        }
        Ok(())
    }
}

fn read<R: FeatureRecordStore + ?Sized>(
    store: &R,
    tile: usize,
    label: &str,
) -> Result<Vec<FeatureRecord>> {
    store
        .read_tile_records(tile, label)
        .with_context(|| format!("Failed to read records of tile {tile} at {label}"))
}

/// Sets `key = values[slot]` on every record of every given hour.
fn write_back<'l, R, I>(
    store: &mut R,
    tile: usize,
    labels: I,
    index: &FeatureIndex,
    values: &[(String, Vec<f64>)],
) -> Result<()>
where
    R: FeatureRecordStore + ?Sized,
    I: IntoIterator<Item = &'l str>,
{
    for label in labels {
        let mut records = read(store, tile, label)?;
        let slots = index.join(tile, label, &records)?;
        for (record, &slot) in records.iter_mut().zip(&slots) {
            for (key, per_feature) in values {
                record.set(key, per_feature[slot]);
            }
        }
        store
            .write_tile_records(tile, label, &records)
            .with_context(|| format!("Failed to write records of tile {tile} at {label}"))?;
    }
    Ok(())
}
