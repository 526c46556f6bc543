//! Seed execution: the worker pool that pre-populates the cache.

use super::job::{CacheJob, JobKind};
use crate::cache::{TileOrigin, DISK_CHECK_INTERVAL};
use crate::provider::TileHttpClient;
use crate::store::{MbtilesStore, StoreMetadata};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

impl<C: TileHttpClient + 'static> CacheJob<C> {
    /// Runs the seed to completion (or cancellation).
    ///
    /// Spawns the worker pool over a fresh tile sequence; each worker
    /// pulls the next tile under the shared mutex, drives it through the
    /// cache, and accounts the outcome. Delivery order is unordered.
    pub async fn seed_cache(self: Arc<Self>) {
        let token = match self.begin_run(JobKind::Seed) {
            Ok(token) => token,
            Err(e) => {
                warn!(job = self.id, error = %e, "seed not started");
                return;
            }
        };
        self.set_status("Seeding");
        info!(
            job = self.id,
            provider = %self.source.identifier,
            area = %self.area_description,
            total = self.estimated_total,
            "seeding started"
        );

        let tiles: Arc<Mutex<Box<dyn Iterator<Item = crate::coord::Tile> + Send>>> =
            Arc::new(Mutex::new((self.tiles)()));
        let pulled = Arc::new(AtomicU64::new(0));

        let mut workers = Vec::with_capacity(self.concurrency);
        for _ in 0..self.concurrency {
            let job = Arc::clone(&self);
            let tiles = Arc::clone(&tiles);
            let pulled = Arc::clone(&pulled);
            let token = token.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    if token.is_cancelled() {
                        break;
                    }

                    let tile = {
                        let mut iter = tiles.lock().unwrap();
                        iter.next()
                    };
                    let Some(tile) = tile else { break };

                    let n = pulled.fetch_add(1, Ordering::Relaxed) + 1;
                    if n % DISK_CHECK_INTERVAL == 0
                        && !job.cache.state().check_disk_space(job.cache.cache_root())
                    {
                        warn!(job = job.id, "disk space low, cancelling seed");
                        token.cancel();
                    }

                    let fetched = job
                        .cache
                        .get_or_fetch(&job.source, &tile, job.options.refetch)
                        .await;
                    match fetched.origin {
                        TileOrigin::Cache => {
                            job.counters.cached.fetch_add(1, Ordering::Relaxed);
                        }
                        TileOrigin::Remote => {
                            job.counters.downloaded.fetch_add(1, Ordering::Relaxed);
                        }
                        TileOrigin::Miss => {
                            job.counters.failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }

                    // The sampling estimate can run low; grow it so the
                    // progress fraction never settles above 1.
                    let done = job.counters.downloaded.load(Ordering::Relaxed)
                        + job.counters.cached.load(Ordering::Relaxed)
                        + job.counters.failed.load(Ordering::Relaxed);
                    job.counters.total.fetch_max(done, Ordering::Relaxed);
                }
            }));
        }

        for worker in workers {
            if let Err(e) = worker.await {
                warn!(job = self.id, error = %e, "seed worker panicked");
            }
        }

        if self.options.mbtiles && !token.is_cancelled() {
            self.set_status("Creating MBTiles");
            self.export_mbtiles().await;
        }

        if token.is_cancelled() {
            info!(job = self.id, "seeding cancelled");
            self.finish(None);
        } else {
            info!(
                job = self.id,
                downloaded = self.counters.downloaded.load(Ordering::Relaxed),
                cached = self.counters.cached.load(Ordering::Relaxed),
                failed = self.counters.failed.load(Ordering::Relaxed),
                "seeding completed"
            );
            self.finish(Some("Completed"));
        }
    }

    /// Copies every cached tile of the region into a standalone MBTiles
    /// export under `<cache_root>/mbtiles/`.
    async fn export_mbtiles(&self) {
        let Some(store) = self.source.cache_store() else {
            warn!(job = self.id, "export requested but source has no cache store");
            return;
        };

        let file_name = format!(
            "{}_{}.mbtiles",
            sanitize_file_stem(&self.area_description),
            self.source.identifier
        );
        let path = self.cache.cache_root().join("mbtiles").join(file_name);
        let meta = StoreMetadata::new(
            self.area_description.clone(),
            self.source.format.extension(),
            self.min_zoom,
            self.max_zoom,
        );

        let export = match MbtilesStore::open(&path, &meta) {
            Ok(export) => export,
            Err(e) => {
                warn!(job = self.id, error = %e, "failed to open export MBTiles");
                return;
            }
        };

        let source_store = Arc::clone(store);
        let tiles = (self.tiles)();
        let job_id = self.id;

        let result = tokio::task::spawn_blocking(move || {
            let mut copied = 0u64;
            for tile in tiles {
                match source_store.get_tile(&tile) {
                    Ok(Some(bytes)) => {
                        if let Err(e) = export.put_tile(&tile, &bytes) {
                            warn!(job = job_id, tile = %tile, error = %e, "export write failed");
                        } else {
                            copied += 1;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(job = job_id, tile = %tile, error = %e, "export read failed");
                    }
                }
            }
            if let Err(e) = export.checkpoint_truncate() {
                warn!(job = job_id, error = %e, "export checkpoint failed");
            }
            copied
        })
        .await;

        match result {
            Ok(copied) => {
                info!(job = self.id, copied, path = %path.display(), "MBTiles export written");
            }
            Err(e) => {
                warn!(job = self.id, error = %e, "MBTiles export task failed");
            }
        }

        debug!(job = self.id, "export finished");
    }
}

fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "region".to_string()
    } else {
        stem
    }
}
