use std::path::Path;

use anyhow::Result;

use crate::sim::config::SunlightConfig;

use super::tileset::read_json;

/// Reads a run configuration. Missing fields take their defaults.
pub fn read_config(path: &Path) -> Result<SunlightConfig> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::aggregation::MetricKind;
    use tempfile::tempdir;

    #[test]
    fn test_read_config() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"cache_capacity": 4, "parallel": false, "aggregators": ["occlude_percent"]}"#,
        )?;
        let config = read_config(&path)?;
        assert_eq!(config.cache_capacity, 4);
        assert!(!config.parallel);
        assert_eq!(config.ray_bias, 1e-6);
        assert_eq!(config.aggregators, vec![MetricKind::OccludePercent]);
        Ok(())
    }

    #[test]
    fn test_unknown_metric_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"aggregators": ["brightness"]}"#)?;
        assert!(read_config(&path).is_err());
        Ok(())
    }
}
