//! Lookup-or-fetch tile cache.
//!
//! The single entry point for proxied tile requests: consult the
//! source's MBTiles store, on miss fetch from the remote origin, write
//! the result back (subject to disk-space admission), and account every
//! outcome in the per-source statistics.

mod admission;
mod stats;

pub use admission::{free_disk_space, CacheState, DISK_CHECK_INTERVAL, MIN_FREE_DISK_BYTES};
pub use stats::{CacheStatsMap, SourceStats, StatsSnapshot};

use crate::coord::Tile;
use crate::provider::{ChartSource, TileFetcher, TileHttpClient};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Where a served tile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOrigin {
    /// Found in the local cache store.
    Cache,
    /// Fetched from the remote origin.
    Remote,
    /// Not available anywhere.
    Miss,
}

/// Result of a cache lookup.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Option<Vec<u8>>,
    pub origin: TileOrigin,
}

/// The tile-fetch cache.
pub struct TileCache<C> {
    fetcher: TileFetcher<C>,
    stats: CacheStatsMap,
    state: Arc<CacheState>,
    cache_root: PathBuf,
}

impl<C: TileHttpClient> TileCache<C> {
    pub fn new(client: C, cache_root: PathBuf, state: Arc<CacheState>) -> Self {
        Self {
            fetcher: TileFetcher::new(client),
            stats: CacheStatsMap::new(),
            state,
            cache_root,
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn state(&self) -> &Arc<CacheState> {
        &self.state
    }

    /// Returns a tile from the cache or the remote origin.
    ///
    /// With `refetch` the cache read is skipped and a fresh copy is
    /// fetched and written. The store write is awaited to completion
    /// before the tile is returned, so a subsequent read observes it.
    pub async fn get_or_fetch(&self, source: &ChartSource, tile: &Tile, refetch: bool) -> Fetched {
        let stats = self.stats.for_source(&source.identifier);
        stats.record_request();

        let store = source.cache_store();

        if !refetch {
            if let Some(store) = store {
                match store.get_tile(tile) {
                    Ok(Some(bytes)) => {
                        stats.record_hit();
                        return Fetched {
                            bytes: Some(bytes),
                            origin: TileOrigin::Cache,
                        };
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(source = %source.identifier, tile = %tile, error = %e, "cache read failed");
                    }
                }
            }
        }

        match self.fetcher.fetch(source, tile).await {
            Some(bytes) => {
                if let Some(store) = store {
                    if self.state.admit_write(&self.cache_root) {
                        if let Err(e) = store.put_tile(tile, &bytes) {
                            warn!(source = %source.identifier, tile = %tile, error = %e, "cache write failed");
                        }
                    }
                }
                stats.record_miss();
                Fetched {
                    bytes: Some(bytes),
                    origin: TileOrigin::Remote,
                }
            }
            None => {
                stats.record_failure();
                Fetched {
                    bytes: None,
                    origin: TileOrigin::Miss,
                }
            }
        }
    }

    /// Copy-out snapshot of all per-source counters.
    pub fn statistics(&self) -> HashMap<String, StatsSnapshot> {
        self.stats.snapshot()
    }
}
