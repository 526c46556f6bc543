//! Delete execution: removes cached tiles within a region.

use super::job::{CacheJob, JobKind, DELETE_CHUNK_SIZE};
use crate::provider::TileHttpClient;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

impl<C: TileHttpClient + 'static> CacheJob<C> {
    /// Runs the region delete: chunked `map` deletes, orphan purge, and
    /// an optional vacuum. Progress is visible through `deletedTiles`.
    pub async fn delete_cache(self: Arc<Self>) {
        let token = match self.begin_run(JobKind::Delete) {
            Ok(token) => token,
            Err(e) => {
                warn!(job = self.id, error = %e, "delete not started");
                return;
            }
        };

        let Some(store) = self.source.cache_store().cloned() else {
            warn!(
                job = self.id,
                provider = %self.source.identifier,
                "delete requested but source has no cache store"
            );
            self.finish(Some("Completed"));
            return;
        };

        self.set_status("Deleting tiles");
        info!(
            job = self.id,
            provider = %self.source.identifier,
            area = %self.area_description,
            "cache delete started"
        );

        let tiles =
            Arc::clone(&store).tiles_for_polygon(self.polygons.clone(), self.min_zoom, self.max_zoom);
        let job = Arc::clone(&self);
        let chunk_token = token.clone();
        let delete_store = Arc::clone(&store);

        let result = tokio::task::spawn_blocking(move || {
            delete_store.delete_tiles_in_chunks(tiles, DELETE_CHUNK_SIZE, |total| {
                job.counters.deleted.store(total, Ordering::Relaxed);
                !chunk_token.is_cancelled()
            })
        })
        .await;

        match result {
            Ok(Ok(deleted)) => {
                debug!(job = self.id, deleted, "tile rows deleted");
            }
            Ok(Err(e)) => {
                warn!(job = self.id, error = %e, "tile delete failed");
                self.finish(None);
                return;
            }
            Err(e) => {
                warn!(job = self.id, error = %e, "delete task failed");
                self.finish(None);
                return;
            }
        }

        if token.is_cancelled() {
            info!(job = self.id, "delete cancelled");
            self.finish(None);
            return;
        }

        self.set_status("Purging orphaned images");
        let purge_store = Arc::clone(&store);
        let job_id = self.id;
        let result = tokio::task::spawn_blocking(move || {
            purge_store.purge_orphan_images(DELETE_CHUNK_SIZE, |last, cumulative| {
                debug!(job = job_id, last, cumulative, "orphan purge progress");
            })
        })
        .await;

        match result {
            Ok(Ok(purged)) => {
                debug!(job = self.id, purged, "orphan images purged");
            }
            Ok(Err(e)) => warn!(job = self.id, error = %e, "orphan purge failed"),
            Err(e) => warn!(job = self.id, error = %e, "purge task failed"),
        }

        if self.options.vacuum {
            self.set_status("Vacuuming MBTiles database");
            let vacuum_store = Arc::clone(&store);
            match tokio::task::spawn_blocking(move || vacuum_store.vacuum()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(job = self.id, error = %e, "vacuum failed"),
                Err(e) => warn!(job = self.id, error = %e, "vacuum task failed"),
            }
        }

        info!(
            job = self.id,
            deleted = self.counters.deleted.load(Ordering::Relaxed),
            "cache delete completed"
        );
        self.finish(Some("Completed"));
    }
}
