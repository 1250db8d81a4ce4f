//! Sun path CSV: header `date,x,y,z`, one sample per row.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::Vector;
use crate::sim::sun::{SunSample, SunSampleSource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SunRow {
    date: String,
    x: f64,
    y: f64,
    z: f64,
}

pub fn read_sun_path(path: &Path) -> Result<Vec<SunSample>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut samples = Vec::new();
    for (line, row) in reader.deserialize::<SunRow>().enumerate() {
        let row = row.with_context(|| format!("Bad sun path row {} in {}", line + 1, path.display()))?;
        let sample = SunSample::new(&row.date, Vector::new(row.x, row.y, row.z))
            .ok_or_else(|| anyhow!("Zero sun direction at {} in {}", row.date, path.display()))?;
        samples.push(sample);
    }
    Ok(samples)
}

pub fn write_sun_path(path: &Path, samples: &[SunSample]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    for s in samples {
        writer.serialize(SunRow {
            date: s.label.clone(),
            x: s.direction.dx,
            y: s.direction.dy,
            z: s.direction.dz,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Sun samples read lazily from a CSV file, optionally restricted to an
/// inclusive label range.
#[derive(Debug, Clone)]
pub struct CsvSunPath {
    path: PathBuf,
    from: Option<String>,
    to: Option<String>,
}

impl CsvSunPath {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            from: None,
            to: None,
        }
    }

    /// Keeps samples with `from <= label <= to`; a missing bound is open.
    /// Labels compare as strings, so `to = "2016-06-21:2359"` ends a day.
    pub fn with_window(mut self, from: Option<&str>, to: Option<&str>) -> Self {
        self.from = from.map(str::to_string);
        self.to = to.map(str::to_string);
        self
    }

    fn in_window(&self, label: &str) -> bool {
        self.from.as_deref().is_none_or(|from| label >= from)
            && self.to.as_deref().is_none_or(|to| label <= to)
    }
}

impl SunSampleSource for CsvSunPath {
    fn sun_samples(&self) -> Result<Vec<SunSample>> {
        let samples: Vec<SunSample> = read_sun_path(&self.path)?
            .into_iter()
            .filter(|s| self.in_window(&s.label))
            .collect();
        if samples.is_empty() {
            warn!(path = %self.path.display(), from = ?self.from, to = ?self.to, "No sun samples in window");
        }
        Ok(samples)
    }
}
