use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use sunlight3d::io::{CsvSunPath, JsonGeometryStore, JsonRecordStore, export_csv_file, read_config};
use sunlight3d::sim::pipeline::SunlightPipeline;
use sunlight3d::{BruteForceOracle, GeometryStore, MetricKind, SunSampleSource, SunlightConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliMetric {
    #[value(name = "exposure")]
    Exposure,
    #[value(name = "occlude-percent")]
    OccludePercent,
    #[value(name = "occlude-amount")]
    OccludeAmount,
}

impl From<CliMetric> for MetricKind {
    fn from(value: CliMetric) -> Self {
        match value {
            CliMetric::Exposure => MetricKind::Exposure,
            CliMetric::OccludePercent => MetricKind::OccludePercent,
            CliMetric::OccludeAmount => MetricKind::OccludeAmount,
        }
    }
}

/// Sunlight visibility and exposure statistics for tiled triangle meshes
#[derive(Parser, Debug)]
#[command(name = "sunlight3d", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cast sun rays for every sample, write records, then aggregate
    Compute {
        #[command(flatten)]
        run: RunArgs,

        /// Sun path CSV (`date,x,y,z`)
        #[arg(long, value_name = "FILE")]
        sun_path: PathBuf,

        /// First sun path label to compute, inclusive
        #[arg(long, value_name = "LABEL")]
        from: Option<String>,

        /// Last sun path label to compute, inclusive
        #[arg(long, value_name = "LABEL")]
        to: Option<String>,

        /// Stop after writing the visibility records
        #[arg(long)]
        skip_aggregation: bool,
    },
    /// Recompute daily and monthly metrics over existing records
    Aggregate {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Write every record as `id;value;...;` lines
    ExportCsv {
        /// Tileset directory (for the tile count)
        #[arg(long, value_name = "DIR")]
        tileset: PathBuf,

        /// Record store directory
        #[arg(long, value_name = "DIR")]
        records: PathBuf,

        /// Output CSV file
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Tileset directory containing tileset.json
    #[arg(long, value_name = "DIR")]
    tileset: PathBuf,

    /// Record store directory
    #[arg(long, value_name = "DIR")]
    records: PathBuf,

    /// Run configuration JSON
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Tiles kept loaded at once (0 = all)
    #[arg(long)]
    cache_capacity: Option<usize>,

    /// Evaluate triangles on a single thread
    #[arg(long)]
    sequential: bool,

    /// Metric to aggregate, repeatable (exposure is always computed)
    #[arg(long = "metric", value_enum)]
    metrics: Vec<CliMetric>,
}

impl RunArgs {
    /// File configuration with command line overrides applied.
    fn config(&self) -> Result<SunlightConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => SunlightConfig::new(),
        };
        if let Some(capacity) = self.cache_capacity {
            config.cache_capacity = capacity;
        }
        if self.sequential {
            config.parallel = false;
        }
        if !self.metrics.is_empty() {
            config.aggregators = self.metrics.iter().map(|&m| m.into()).collect();
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    sunlight3d::logging::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Compute {
            run,
            sun_path,
            from,
            to,
            skip_aggregation,
        } => {
            let source = CsvSunPath::new(&sun_path).with_window(from.as_deref(), to.as_deref());
            compute(&run, &source, skip_aggregation)
        }
        Command::Aggregate { run } => aggregate(&run),
        Command::ExportCsv {
            tileset,
            records,
            output,
        } => export(&tileset, &records, &output),
    }
}

fn compute(run: &RunArgs, source: &CsvSunPath, skip_aggregation: bool) -> Result<()> {
    let geometry = JsonGeometryStore::open(&run.tileset)?;
    let mut records = JsonRecordStore::new(&run.records);
    let pipeline = SunlightPipeline::new(&geometry, &BruteForceOracle, run.config()?);

    let samples = source.sun_samples()?;
    let summary = pipeline.compute_visibility_with_progress(&samples, &mut records, 10, |p| {
        info!(
            done = p.samples_done,
            total = p.num_samples,
            lit = p.lit,
            occluded = p.occluded,
            "Progress"
        );
    })?;
    println!(
        "{} samples x {} tiles: {} lit, {} occluded",
        summary.samples, summary.tiles, summary.lit, summary.occluded
    );

    if !skip_aggregation {
        let labels: Vec<&str> = samples.iter().map(|s| s.label.as_str()).collect();
        pipeline.aggregate(&mut records, &labels)?;
    }
    Ok(())
}

fn aggregate(run: &RunArgs) -> Result<()> {
    let geometry = JsonGeometryStore::open(&run.tileset)?;
    let mut records = JsonRecordStore::new(&run.records);
    let labels = records.labels()?;
    let pipeline = SunlightPipeline::new(&geometry, &BruteForceOracle, run.config()?);
    pipeline.aggregate(&mut records, &labels)
}

fn export(tileset: &Path, records: &Path, output: &Path) -> Result<()> {
    let geometry = JsonGeometryStore::open(tileset)?;
    let records = JsonRecordStore::new(records);
    let labels = records.labels()?;
    let lines = export_csv_file(&records, geometry.tile_count(), &labels, output)?;
    println!("{lines} lines written to {}", output.display());
    Ok(())
}
