pub mod aggregation;
pub mod config;
pub mod features;
pub mod geometry;
pub mod pipeline;
pub mod records;
pub mod sun;
pub mod time;
pub mod visibility;
