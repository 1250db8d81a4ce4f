//! Flat CSV export of feature records: one header-less line per record,
//! `id;value;value;...;`, values in [`FeatureRecord::ordered_attributes`]
//! order.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::sim::features::FeatureRecord;
use crate::sim::records::FeatureRecordStore;

fn field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn write_records<W: Write>(writer: W, records: &[FeatureRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);
    for record in records {
        let mut row = vec![record.id.to_string()];
        row.extend(record.ordered_attributes().into_iter().map(|(_, v)| field(v)));
        // trailing delimiter
        row.push(String::new());
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Appends every record of every tile for each label, label-major.
/// Returns the number of lines written.
pub fn export_csv<R, W, L>(store: &R, tile_count: usize, labels: &[L], mut writer: W) -> Result<usize>
where
    R: FeatureRecordStore + ?Sized,
    W: Write,
    L: AsRef<str>,
{
    let mut lines = 0;
    for label in labels {
        let label = label.as_ref();
        for tile in 0..tile_count {
            let records = store
                .read_tile_records(tile, label)
                .with_context(|| format!("Failed to read records of tile {tile} at {label}"))?;
            write_records(&mut writer, &records)?;
            lines += records.len();
        }
    }
    Ok(lines)
}

pub fn export_csv_file<R, L>(store: &R, tile_count: usize, labels: &[L], path: &Path) -> Result<usize>
where
    R: FeatureRecordStore + ?Sized,
    L: AsRef<str>,
{
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let lines = export_csv(store, tile_count, labels, std::io::BufWriter::new(file))?;
    info!(lines, path = %path.display(), "CSV exported");
    Ok(lines)
}
