//! Error types for the MBTiles store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by [`crate::store::MbtilesStore`] operations.
///
/// Absence of a tile is not an error; reads return `Ok(None)` so callers
/// can distinguish a miss from an I/O failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be opened or its schema could not be applied.
    #[error("failed to open MBTiles store {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A read query failed.
    #[error("MBTiles read failed: {0}")]
    Read(#[source] rusqlite::Error),

    /// A write or maintenance statement failed.
    #[error("MBTiles write failed: {0}")]
    Write(#[source] rusqlite::Error),
}
