//! Feature records on disk: `<root>/<label>/<tile_index>.json`, with `:` in
//! the label replaced by `__` so it is a valid directory name everywhere.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::sim::features::FeatureRecord;
use crate::sim::records::FeatureRecordStore;

use super::tileset::{read_json, write_json};

#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    root: PathBuf,
}

impl JsonRecordStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn label_dir(&self, label: &str) -> PathBuf {
        self.root.join(label.replace(':', "__"))
    }

    pub fn tile_path(&self, tile_index: usize, label: &str) -> PathBuf {
        self.label_dir(label).join(format!("{tile_index}.json"))
    }

    /// Labels that have a record directory, sorted.
    pub fn labels(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read directory: {}", self.root.display()))?;
        let mut labels = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                labels.push(entry.file_name().to_string_lossy().replace("__", ":"));
            }
        }
        labels.sort();
        Ok(labels)
    }
}

impl FeatureRecordStore for JsonRecordStore {
    fn read_tile_records(&self, tile_index: usize, label: &str) -> Result<Vec<FeatureRecord>> {
        read_json(&self.tile_path(tile_index, label))
    }

    fn write_tile_records(
        &mut self,
        tile_index: usize,
        label: &str,
        records: &[FeatureRecord],
    ) -> Result<()> {
        let dir = self.label_dir(label);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        write_json(&self.tile_path(tile_index, label), records)
    }
}
