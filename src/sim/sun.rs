use anyhow::Result;

use crate::Vector;

/// One sun position: a sortable timestamp label and the unit direction from
/// the scene toward the sun.
#[derive(Debug, Clone, PartialEq)]
pub struct SunSample {
    /// Timestamp label, `YYYY-MM-DD:HHMM`.
    pub label: String,
    pub direction: Vector,
}

impl SunSample {
    /// Creates a sample, normalizing the direction. `None` for a zero vector.
    pub fn new(label: &str, direction: Vector) -> Option<Self> {
        Some(Self {
            label: label.to_string(),
            direction: direction.normalize()?,
        })
    }
}

/// Ordered supply of sun samples.
pub trait SunSampleSource {
    fn sun_samples(&self) -> Result<Vec<SunSample>>;
}

impl SunSampleSource for Vec<SunSample> {
    fn sun_samples(&self) -> Result<Vec<SunSample>> {
        Ok(self.clone())
    }
}
