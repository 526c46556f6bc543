//! MBTiles-backed tile persistence.

mod error;
mod mbtiles;

pub use error::StoreError;
pub use mbtiles::{MbtilesStore, StoreMetadata, StoreRegionTiles};
