use thiserror::Error;

/// Fatal conditions of a sunlight run.
///
/// Values travel inside [`anyhow::Error`]; callers that need the cause use
/// `err.downcast_ref::<SunlightError>()`.
#[derive(Debug, Error)]
pub enum SunlightError {
    #[error("tile {tile} could not be loaded at {timestamp}: {reason}")]
    Geometry {
        tile: usize,
        timestamp: String,
        reason: String,
    },

    #[error(
        "records of tile {tile} at {timestamp} do not match (expected {expected}, found {found}): {detail}"
    )]
    IndexMismatch {
        tile: usize,
        timestamp: String,
        expected: usize,
        found: usize,
        detail: String,
    },

    #[error("no hours recorded in {window}")]
    EmptyWindow { window: String },

    #[error("intersection test failed: {0}")]
    Intersection(String),

    #[error("invalid timestamp label: {0}")]
    InvalidLabel(String),

    #[error("feature {feature} has no usable '{key}' attribute")]
    MissingAttribute { feature: String, key: String },
}
