//! File I/O for tilesets, feature records, sun paths and run configuration.

pub mod config;
pub mod export;
pub mod records;
pub mod sunpath;
pub mod tileset;

pub use config::read_config;
pub use export::{export_csv, export_csv_file};
pub use records::JsonRecordStore;
pub use sunpath::{CsvSunPath, read_sun_path, write_sun_path};
pub use tileset::{JsonGeometryStore, TileContent, write_tileset};
