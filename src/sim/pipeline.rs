//! Full run: visibility for every sun sample, then aggregation.

use anyhow::{Context, Result};
use tracing::info;

use crate::geom::ray::IntersectionOracle;

use super::aggregation::AggregationEngine;
use super::config::SunlightConfig;
use super::features::project_outcomes;
use super::geometry::{GeometryCache, GeometryStore};
use super::records::FeatureRecordStore;
use super::sun::{SunSample, SunSampleSource};
use super::time::TimeHierarchy;
use super::visibility::VisibilityEngine;

#[derive(Debug, Clone, Copy)]
pub struct PipelineProgress {
    /// Number of sun samples computed (0..=num_samples).
    pub samples_done: usize,
    pub num_samples: usize,
    /// Outcomes written so far.
    pub lit: usize,
    pub occluded: usize,
}

/// Totals of a visibility pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub samples: usize,
    pub tiles: usize,
    pub lit: usize,
    pub occluded: usize,
    /// Tile loads performed against the geometry store.
    pub geometry_loads: usize,
}

trait ProgressReporter {
    fn every_samples(&self) -> usize;
    fn report(&mut self, progress: &PipelineProgress);
}

struct NoProgress;
impl ProgressReporter for NoProgress {
    fn every_samples(&self) -> usize {
        0
    }
    fn report(&mut self, _progress: &PipelineProgress) {}
}

struct FnProgress<F> {
    every_samples: usize,
    f: F,
}
impl<F> ProgressReporter for FnProgress<F>
where
    F: FnMut(&PipelineProgress),
{
    fn every_samples(&self) -> usize {
        self.every_samples
    }
    fn report(&mut self, progress: &PipelineProgress) {
        (self.f)(progress);
    }
}

pub struct SunlightPipeline<'a, S, O>
where
    S: GeometryStore + ?Sized,
    O: IntersectionOracle + ?Sized,
{
    geometry: &'a S,
    oracle: &'a O,
    config: SunlightConfig,
}

impl<'a, S, O> SunlightPipeline<'a, S, O>
where
    S: GeometryStore + ?Sized,
    O: IntersectionOracle + ?Sized,
{
    pub fn new(geometry: &'a S, oracle: &'a O, config: SunlightConfig) -> Self {
        Self {
            geometry,
            oracle,
            config,
        }
    }

    /// Computes visibility for every sample and aggregates the records.
    pub fn run<R, Src>(&self, source: &Src, records: &mut R) -> Result<PipelineSummary>
    where
        R: FeatureRecordStore + ?Sized,
        Src: SunSampleSource + ?Sized,
    {
        let samples = source.sun_samples().context("Failed to read sun samples")?;
        let summary = self.compute_visibility(&samples, records)?;
        let labels: Vec<&str> = samples.iter().map(|s| s.label.as_str()).collect();
        self.aggregate(records, &labels)?;
        Ok(summary)
    }

    /// Writes one record list per (tile, sample).
    pub fn compute_visibility<R>(
        &self,
        samples: &[SunSample],
        records: &mut R,
    ) -> Result<PipelineSummary>
    where
        R: FeatureRecordStore + ?Sized,
    {
        self.compute_visibility_impl(samples, records, NoProgress)
    }

    /// Like [`Self::compute_visibility`], reporting progress every
    /// `every_samples` samples (0 disables reporting), once at start and
    /// once at the end.
    pub fn compute_visibility_with_progress<R, F>(
        &self,
        samples: &[SunSample],
        records: &mut R,
        every_samples: usize,
        report: F,
    ) -> Result<PipelineSummary>
    where
        R: FeatureRecordStore + ?Sized,
        F: FnMut(&PipelineProgress),
    {
        let reporter = FnProgress {
            every_samples,
            f: report,
        };
        self.compute_visibility_impl(samples, records, reporter)
    }

    fn compute_visibility_impl<R, P>(
        &self,
        samples: &[SunSample],
        records: &mut R,
        mut reporter: P,
    ) -> Result<PipelineSummary>
    where
        R: FeatureRecordStore + ?Sized,
        P: ProgressReporter,
    {
        // Reject bad labels before any ray is cast
        TimeHierarchy::from_labels(samples.iter().map(|s| s.label.as_str()))?;

        let engine = VisibilityEngine::new(self.oracle, self.config.ray_bias, self.config.parallel);
        let mut cache = GeometryCache::new(self.geometry, self.config.cache_capacity);
        let tile_count = cache.tile_count();
        let mut summary = PipelineSummary {
            tiles: tile_count,
            ..Default::default()
        };
        info!(
            samples = samples.len(),
            tiles = tile_count,
            parallel = self.config.parallel,
            "Computing visibility"
        );

        let report_every = reporter.every_samples();
        let progress = |summary: &PipelineSummary| PipelineProgress {
            samples_done: summary.samples,
            num_samples: samples.len(),
            lit: summary.lit,
            occluded: summary.occluded,
        };
        if report_every > 0 {
            reporter.report(&progress(&summary));
        }

        for sample in samples {
            for tile_index in 0..tile_count {
                let outcomes = engine.compute_tile(&mut cache, tile_index, sample)?;
                let tile = cache.get(tile_index, &sample.label)?;
                let projected = project_outcomes(tile_index, &tile.triangles, &outcomes, sample)?;
                records
                    .write_tile_records(tile_index, &sample.label, &projected)
                    .with_context(|| {
                        format!(
                            "Failed to write records of tile {tile_index} at {}",
                            sample.label
                        )
                    })?;

                let lit = outcomes.iter().filter(|o| o.is_lit()).count();
                summary.lit += lit;
                summary.occluded += outcomes.len() - lit;
            }
            summary.samples += 1;

            if report_every > 0
                && (summary.samples % report_every == 0 || summary.samples == samples.len())
            {
                reporter.report(&progress(&summary));
            }
        }

        summary.geometry_loads = cache.loads();
        info!(
            lit = summary.lit,
            occluded = summary.occluded,
            geometry_loads = summary.geometry_loads,
            "Visibility done"
        );
        Ok(summary)
    }

    /// Runs the configured aggregators over records already written for
    /// `labels`.
    pub fn aggregate<R, L>(&self, records: &mut R, labels: &[L]) -> Result<()>
    where
        R: FeatureRecordStore + ?Sized,
        L: AsRef<str>,
    {
        let hierarchy = TimeHierarchy::from_labels(labels)?;
        AggregationEngine::new(&self.config.aggregators).compute_and_export(
            records,
            self.geometry.tile_count(),
            &hierarchy,
        )
    }
}
