//! The surface the core exposes to the host server's routing layer.
//!
//! Routing, authentication, and response encoding stay outside the core;
//! handlers resolve a provider id and call into [`ChartTileService`],
//! mapping [`ApiError::status_code`] onto the response.

mod types;

pub use types::{
    ApiError, CacheAction, CacheRequest, JobControlAction, ServedTile, TILE_CACHE_CONTROL,
};

use crate::cache::{CacheState, StatsSnapshot, TileCache};
use crate::coord::{BBox, Tile, MAX_ZOOM};
use crate::jobs::{JobInfo, JobRegistry, JobSpec, JobState, RegionSpec};
use crate::provider::{ChartSource, TileHttpClient};
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Zoom bounds accepted for cache jobs.
const JOB_MIN_ZOOM: u8 = 1;

/// Facade over the provider registry, tile cache, and job registry.
pub struct ChartTileService<C> {
    sources: DashMap<String, Arc<ChartSource>>,
    cache: Arc<TileCache<C>>,
    registry: JobRegistry<C>,
}

impl<C: TileHttpClient + 'static> ChartTileService<C> {
    /// Service with default admission state and worker pool size.
    pub fn new(client: C, cache_root: PathBuf) -> Self {
        Self::with_state(client, cache_root, Arc::new(CacheState::new()))
    }

    pub fn with_state(client: C, cache_root: PathBuf, state: Arc<CacheState>) -> Self {
        let cache = Arc::new(TileCache::new(client, cache_root, state));
        let registry = JobRegistry::new(Arc::clone(&cache));
        Self {
            sources: DashMap::new(),
            cache,
            registry,
        }
    }

    pub fn cache(&self) -> &Arc<TileCache<C>> {
        &self.cache
    }

    pub fn registry(&self) -> &JobRegistry<C> {
        &self.registry
    }

    /// Registers (or replaces) a discovered chart source.
    pub fn register_source(&self, source: Arc<ChartSource>) {
        info!(
            provider = %source.identifier,
            kind = %source.kind,
            cached = source.is_cached(),
            "chart source registered"
        );
        self.sources.insert(source.identifier.clone(), source);
    }

    pub fn source(&self, identifier: &str) -> Option<Arc<ChartSource>> {
        self.sources
            .get(identifier)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Serves one tile: local charts read their store, online charts go
    /// through the lookup-or-fetch cache.
    pub async fn get_tile(
        &self,
        identifier: &str,
        zoom: u8,
        x: u32,
        y: u32,
    ) -> Result<ServedTile, ApiError> {
        let source = self
            .source(identifier)
            .ok_or_else(|| ApiError::UnknownProvider(identifier.to_string()))?;

        if zoom > MAX_ZOOM || x >= (1u32 << zoom) || y >= (1u32 << zoom) {
            return Err(ApiError::TileAbsent);
        }
        let tile = Tile::new(zoom, x, y);

        let bytes = if source.is_online() {
            self.cache
                .get_or_fetch(&source, &tile, false)
                .await
                .bytes
                .ok_or(ApiError::RemoteFetchFailure)?
        } else if let Some(store) = source.store.as_ref() {
            store.get_tile(&tile)?.ok_or(ApiError::TileAbsent)?
        } else {
            return Err(ApiError::TileAbsent);
        };

        Ok(ServedTile {
            bytes,
            content_type: source.format.content_type(),
            cache_control: TILE_CACHE_CONTROL,
        })
    }

    /// Creates a seed or delete job from a cache request and starts it.
    ///
    /// Returns the job's first snapshot; progress is polled through
    /// [`ChartTileService::list_jobs`].
    pub fn create_cache_job(
        &self,
        identifier: &str,
        request: CacheRequest,
    ) -> Result<JobInfo, ApiError> {
        let source = self
            .source(identifier)
            .ok_or_else(|| ApiError::UnknownProvider(identifier.to_string()))?;

        if !source.is_cached() {
            return Err(ApiError::InvalidParameters(format!(
                "provider '{}' does not cache tiles",
                identifier
            )));
        }

        let Some(max_zoom) = request.max_zoom else {
            return Err(ApiError::InvalidParameters("maxZoom is required".to_string()));
        };
        let min_zoom = request.min_zoom.unwrap_or(JOB_MIN_ZOOM);
        for zoom in [min_zoom, max_zoom] {
            if !(JOB_MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
                return Err(ApiError::InvalidParameters(format!(
                    "zoom {} outside [{}, {}]",
                    zoom, JOB_MIN_ZOOM, MAX_ZOOM
                )));
            }
        }

        let region = if let Some(feature) = request.feature {
            RegionSpec::Feature(feature)
        } else if let Some([min_lon, min_lat, max_lon, max_lat]) = request.bbox {
            RegionSpec::Bbox(BBox::new(min_lon, min_lat, max_lon, max_lat))
        } else {
            return Err(ApiError::InvalidArea(
                "request carries neither feature nor bbox".to_string(),
            ));
        };

        let job = self.registry.create(JobSpec {
            source,
            options: request.options,
            min_zoom,
            max_zoom,
            region,
        })?;

        match request.action {
            CacheAction::Seed => {
                tokio::spawn(Arc::clone(&job).seed_cache());
            }
            CacheAction::Delete => {
                tokio::spawn(Arc::clone(&job).delete_cache());
            }
        }
        Ok(job.info())
    }

    /// Controls a job: re-start a seed, run a delete, stop, or remove.
    pub fn control_job(&self, id: u64, action: JobControlAction) -> Result<JobInfo, ApiError> {
        let job = self.registry.by_id(id).ok_or(ApiError::UnknownJob(id))?;

        match action {
            JobControlAction::Start => {
                if job.state() == JobState::Running {
                    return Err(ApiError::JobBusy(id));
                }
                tokio::spawn(Arc::clone(&job).seed_cache());
            }
            JobControlAction::Delete => {
                if job.state() == JobState::Running {
                    return Err(ApiError::JobBusy(id));
                }
                tokio::spawn(Arc::clone(&job).delete_cache());
            }
            JobControlAction::Stop => job.cancel(),
            JobControlAction::Remove => self.registry.remove(id)?,
        }
        Ok(job.info())
    }

    pub fn list_jobs(&self) -> Vec<JobInfo> {
        self.registry.list()
    }

    pub fn job_info(&self, id: u64) -> Result<JobInfo, ApiError> {
        self.registry
            .by_id(id)
            .map(|job| job.info())
            .ok_or(ApiError::UnknownJob(id))
    }

    /// Per-provider cache statistics snapshot.
    pub fn statistics(&self) -> HashMap<String, StatsSnapshot> {
        self.cache.statistics()
    }
}
