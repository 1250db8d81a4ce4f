use anyhow::Result;
use sunlight3d::io::tileset::FeatureEntry;
use sunlight3d::io::{
    JsonGeometryStore, JsonRecordStore, TileContent, export_csv_file, read_sun_path,
    write_sun_path, write_tileset,
};
use sunlight3d::sim::pipeline::SunlightPipeline;
use sunlight3d::{
    BruteForceOracle, FeatureRecordStore, GeometryStore, MetricKind, Point, SunSample,
    SunlightConfig, Vector,
};
use tempfile::tempdir;

const GROUND: &str = "Tile-ground__Feature-g__Triangle-0";
const CANOPY: &str = "Tile-canopy__Feature-c__Triangle-0";

fn p(x: f64, y: f64, z: f64) -> Point {
    Point::new(x, y, z)
}

fn tiles() -> Vec<(String, TileContent)> {
    let ground = TileContent {
        features: vec![FeatureEntry {
            id: "g".to_string(),
            triangles: vec![[p(0., 0., 0.), p(1., 0., 0.), p(0., 1., 0.)]],
        }],
    };
    let canopy = TileContent {
        features: vec![FeatureEntry {
            id: "c".to_string(),
            triangles: vec![[p(-5., -5., 1.), p(10., -5., 1.), p(-5., 10., 1.)]],
        }],
    };
    vec![("ground".to_string(), ground), ("canopy".to_string(), canopy)]
}

fn sun_path() -> Vec<SunSample> {
    let overhead = Vector::new(0., 0., 1.);
    let low = Vector::new(-1., 0., 0.1);
    let below = Vector::new(0., 0., -1.);
    [
        ("2016-06-21:1200", overhead),
        ("2016-06-21:1900", low),
        ("2016-06-22:1200", overhead),
        ("2016-06-22:1900", low),
        ("2016-07-01:1200", below),
    ]
    .into_iter()
    .filter_map(|(label, dir)| SunSample::new(label, dir))
    .collect()
}

#[test]
fn test_compute_aggregate_export() -> Result<()> {
    let dir = tempdir()?;
    let tileset_dir = dir.path().join("tileset");
    let records_dir = dir.path().join("records");
    let sun_csv = dir.path().join("sun.csv");
    write_tileset(&tileset_dir, &tiles())?;
    write_sun_path(&sun_csv, &sun_path())?;

    let geometry = JsonGeometryStore::open(&tileset_dir)?;
    let mut records = JsonRecordStore::new(&records_dir);
    let mut config = SunlightConfig::new();
    config.aggregators = vec![MetricKind::OccludeAmount];
    let pipeline = SunlightPipeline::new(&geometry, &BruteForceOracle, config);

    let samples = read_sun_path(&sun_csv)?;
    let summary = pipeline.compute_visibility(&samples, &mut records)?;
    assert_eq!(summary.samples, 5);
    assert_eq!(summary.lit, 6);
    assert_eq!(summary.occluded, 4);

    let labels = records.labels()?;
    assert_eq!(labels.len(), 5);
    pipeline.aggregate(&mut records, &labels)?;

    let noon = &records.read_tile_records(0, "2016-06-21:1200")?[0];
    assert_eq!(noon.id.as_str(), GROUND);
    assert!(!noon.is_lighted()?);
    assert_eq!(noon.occulting_id()?, CANOPY);
    assert_eq!(noon.get_f64("dailyExposurePercent"), Some(50.));
    assert_eq!(noon.get_f64("monthlyExposurePercent"), Some(50.));

    let canopy_june = &records.read_tile_records(1, "2016-06-22:1900")?[0];
    assert_eq!(canopy_june.get_f64("dailyExposurePercent"), Some(100.));
    assert_eq!(canopy_june.get_f64("monthlyOccludeAmount"), Some(0.5));

    // sun below the horizon: everything shadows itself
    let canopy_july = &records.read_tile_records(1, "2016-07-01:1200")?[0];
    assert_eq!(canopy_july.occulting_id()?, CANOPY);
    assert_eq!(canopy_july.get_f64("monthlyExposurePercent"), Some(0.));
    assert_eq!(canopy_july.get_f64("monthlyOccludeAmount"), Some(0.));

    let csv = dir.path().join("out.csv");
    let lines = export_csv_file(&records, geometry.tile_count(), &labels, &csv)?;
    assert_eq!(lines, 10);
    let text = std::fs::read_to_string(&csv)?;
    assert_eq!(
        text.lines().next(),
        Some(format!("{GROUND};2016-06-21:1200;false;{CANOPY};50.0;0.0;50.0;0.0;").as_str())
    );
    Ok(())
}

#[test]
fn test_aggregation_rerun_leaves_files_unchanged() -> Result<()> {
    let dir = tempdir()?;
    let tileset_dir = dir.path().join("tileset");
    write_tileset(&tileset_dir, &tiles())?;
    let geometry = JsonGeometryStore::open(&tileset_dir)?;
    let mut records = JsonRecordStore::new(&dir.path().join("records"));
    let pipeline = SunlightPipeline::new(&geometry, &BruteForceOracle, SunlightConfig::new());

    let samples = sun_path();
    pipeline.run(&samples, &mut records)?;
    let path = records.tile_path(0, "2016-06-22:1200");
    let first = std::fs::read_to_string(&path)?;

    let labels = records.labels()?;
    pipeline.aggregate(&mut records, &labels)?;
    assert_eq!(std::fs::read_to_string(&path)?, first);
    Ok(())
}

#[test]
fn test_missing_tile_content_names_tile_and_timestamp() -> Result<()> {
    let dir = tempdir()?;
    let tileset_dir = dir.path().join("tileset");
    write_tileset(&tileset_dir, &tiles())?;
    std::fs::remove_file(tileset_dir.join("canopy.json"))?;

    let geometry = JsonGeometryStore::open(&tileset_dir)?;
    let mut records = JsonRecordStore::new(&dir.path().join("records"));
    let pipeline = SunlightPipeline::new(&geometry, &BruteForceOracle, SunlightConfig::new());

    let err = pipeline
        .compute_visibility(&sun_path(), &mut records)
        .unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("tile 1"), "{message}");
    assert!(message.contains("2016-06-21:1200"), "{message}");
    Ok(())
}
