use std::collections::HashMap;

use anyhow::{Result, anyhow};

use super::features::FeatureRecord;

/// Persisted feature records, one ordered list per (tile, timestamp).
pub trait FeatureRecordStore {
    fn read_tile_records(&self, tile_index: usize, label: &str) -> Result<Vec<FeatureRecord>>;

    fn write_tile_records(
        &mut self,
        tile_index: usize,
        label: &str,
        records: &[FeatureRecord],
    ) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordStore {
    records: HashMap<(usize, String), Vec<FeatureRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored (tile, timestamp) record lists.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FeatureRecordStore for InMemoryRecordStore {
    fn read_tile_records(&self, tile_index: usize, label: &str) -> Result<Vec<FeatureRecord>> {
        self.records
            .get(&(tile_index, label.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("no records for tile {tile_index} at {label}"))
    }

    fn write_tile_records(
        &mut self,
        tile_index: usize,
        label: &str,
        records: &[FeatureRecord],
    ) -> Result<()> {
        self.records
            .insert((tile_index, label.to_string()), records.to_vec());
        Ok(())
    }
}
