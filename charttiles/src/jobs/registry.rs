//! Process-wide registry of cache jobs.

use super::job::{
    CacheJob, JobCounters, JobError, JobInfo, JobKind, JobOptions, JobState, TileFactory,
    DEFAULT_SEED_CONCURRENCY,
};
use crate::cache::TileCache;
use crate::coord::{BBox, Tile};
use crate::provider::{ChartSource, TileHttpClient};
use crate::region::{
    bbox_range_count, bbox_tiles, estimate_polygon_range, polygon_tiles, refine_count,
    split_antimeridian, tile_pyramid, Feature, Polygon, REFINE_CAP, REFINE_THRESHOLD,
};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The geographic area a job covers.
#[derive(Debug, Clone)]
pub enum RegionSpec {
    /// A GeoJSON feature with polygonal geometry.
    Feature(Feature),
    /// A plain bbox; `min_lon > max_lon` crosses the antimeridian.
    Bbox(BBox),
    /// A single parent tile whose subtree is covered.
    Tile(Tile),
}

/// Everything needed to create a job.
pub struct JobSpec {
    pub source: Arc<ChartSource>,
    pub options: JobOptions,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub region: RegionSpec,
}

/// Process-wide mapping of job id to job. Ids are monotonic from 1 and
/// never reused; jobs persist across start/stop until removed.
pub struct JobRegistry<C> {
    jobs: DashMap<u64, Arc<CacheJob<C>>>,
    next_id: AtomicU64,
    cache: Arc<TileCache<C>>,
    concurrency: usize,
}

impl<C: TileHttpClient + 'static> JobRegistry<C> {
    pub fn new(cache: Arc<TileCache<C>>) -> Self {
        Self::with_concurrency(cache, DEFAULT_SEED_CONCURRENCY)
    }

    pub fn with_concurrency(cache: Arc<TileCache<C>>, concurrency: usize) -> Self {
        Self {
            jobs: DashMap::new(),
            next_id: AtomicU64::new(1),
            cache,
            concurrency,
        }
    }

    /// Creates a job in the `stopped` state and registers it.
    ///
    /// The region is normalized and antimeridian-split here; the tile
    /// total is estimated, and refined by a real count for small regions
    /// where an accurate progress bar matters most.
    pub fn create(&self, spec: JobSpec) -> Result<Arc<CacheJob<C>>, JobError> {
        if spec.min_zoom > spec.max_zoom {
            return Err(JobError::InvalidParameters(format!(
                "minZoom {} exceeds maxZoom {}",
                spec.min_zoom, spec.max_zoom
            )));
        }

        let (polygons, area_description, tiles, estimate) = match &spec.region {
            RegionSpec::Feature(feature) => {
                let raw = feature.polygons();
                if raw.is_empty() {
                    return Err(JobError::InvalidArea(
                        "feature has no polygon geometry".to_string(),
                    ));
                }
                let polygons: Vec<Polygon> =
                    raw.iter().flat_map(split_antimeridian).collect();
                let description = feature
                    .name()
                    .unwrap_or_else(|| "polygon region".to_string());
                let estimate =
                    estimate_polygon_range(&polygons, spec.min_zoom, spec.max_zoom);

                let factory_polygons = polygons.clone();
                let (min_zoom, max_zoom) = (spec.min_zoom, spec.max_zoom);
                let tiles: TileFactory = Box::new(move || {
                    Box::new(polygon_tiles(factory_polygons.clone(), min_zoom, max_zoom))
                });
                (polygons, description, tiles, estimate)
            }
            RegionSpec::Bbox(bbox) => {
                let polygons: Vec<Polygon> = bbox
                    .split_antimeridian()
                    .iter()
                    .map(Polygon::from_bbox)
                    .collect();
                let description = format!(
                    "{:.4},{:.4},{:.4},{:.4}",
                    bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat
                );
                let estimate = bbox_range_count(bbox, spec.min_zoom, spec.max_zoom);

                let bbox = *bbox;
                let (min_zoom, max_zoom) = (spec.min_zoom, spec.max_zoom);
                let tiles: TileFactory =
                    Box::new(move || Box::new(bbox_tiles(bbox, min_zoom, max_zoom)));
                (polygons, description, tiles, estimate)
            }
            RegionSpec::Tile(parent) => {
                let polygons = vec![Polygon::from_bbox(&crate::coord::tile_to_bbox(parent))];
                let description = format!("tile {}", parent);
                let estimate: u64 = (spec.min_zoom.max(parent.zoom)..=spec.max_zoom)
                    .map(|zoom| 1u64 << (2 * (zoom - parent.zoom) as u32))
                    .sum();

                let parent = *parent;
                let (min_zoom, max_zoom) = (spec.min_zoom, spec.max_zoom);
                let tiles: TileFactory =
                    Box::new(move || Box::new(tile_pyramid(parent, min_zoom, max_zoom)));
                (polygons, description, tiles, estimate)
            }
        };

        // A low estimate on a small region produces a progress bar that
        // overruns; count for real when it is cheap enough.
        let estimate = if estimate < REFINE_THRESHOLD {
            refine_count(tiles(), REFINE_CAP).unwrap_or(estimate)
        } else {
            estimate
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = Arc::new(CacheJob {
            id,
            source: Arc::clone(&spec.source),
            area_description,
            options: spec.options,
            kind: AtomicU8::new(JobKind::None as u8),
            state: AtomicU8::new(JobState::Stopped as u8),
            status: Mutex::new("Idle".to_string()),
            polygons,
            min_zoom: spec.min_zoom,
            max_zoom: spec.max_zoom,
            tiles,
            counters: JobCounters::default(),
            estimated_total: estimate,
            cancel: Mutex::new(CancellationToken::new()),
            cache: Arc::clone(&self.cache),
            concurrency: self.concurrency,
        });
        job.counters.total.store(estimate, Ordering::Relaxed);

        debug!(
            job = id,
            provider = %job.source.identifier,
            area = %job.area_description,
            estimate,
            "job created"
        );
        self.jobs.insert(id, Arc::clone(&job));
        Ok(job)
    }

    pub fn by_id(&self, id: u64) -> Option<Arc<CacheJob<C>>> {
        self.jobs.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of every registered job, ordered by id.
    pub fn list(&self) -> Vec<JobInfo> {
        let mut infos: Vec<JobInfo> = self.jobs.iter().map(|entry| entry.value().info()).collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// Removes a stopped job. Refuses while the job is running.
    pub fn remove(&self, id: u64) -> Result<(), JobError> {
        if self
            .jobs
            .remove_if(&id, |_, job| job.state() == JobState::Stopped)
            .is_some()
        {
            return Ok(());
        }
        if self.jobs.contains_key(&id) {
            Err(JobError::Busy(id))
        } else {
            Err(JobError::UnknownJob(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheState;
    use crate::provider::{MockTileClient, SourceKind, TileFormat};
    use crate::store::{MbtilesStore, StoreMetadata};
    use tempfile::TempDir;

    pub(crate) fn cached_source(dir: &TempDir) -> Arc<ChartSource> {
        let meta = StoreMetadata::new("osm", "png", 1, 18);
        let store = MbtilesStore::open(dir.path().join("osm.mbtiles"), &meta).unwrap();
        Arc::new(ChartSource {
            identifier: "osm".to_string(),
            name: "OpenStreetMap".to_string(),
            kind: SourceKind::OnlineProxied,
            format: TileFormat::Png,
            min_zoom: 1,
            max_zoom: 18,
            url_template: Some("http://o.example/{z}/{x}/{y}.png".to_string()),
            headers: Vec::new(),
            store: Some(Arc::new(store)),
        })
    }

    pub(crate) fn registry_with(
        client: MockTileClient,
        dir: &TempDir,
        concurrency: usize,
    ) -> JobRegistry<MockTileClient> {
        let cache = Arc::new(TileCache::new(
            client,
            dir.path().to_path_buf(),
            Arc::new(CacheState::with_probe(Box::new(|_| Ok(u64::MAX)))),
        ));
        JobRegistry::with_concurrency(cache, concurrency)
    }

    fn bbox_spec(source: Arc<ChartSource>, bbox: BBox, min_zoom: u8, max_zoom: u8) -> JobSpec {
        JobSpec {
            source,
            options: JobOptions::default(),
            min_zoom,
            max_zoom,
            region: RegionSpec::Bbox(bbox),
        }
    }

    #[test]
    fn test_ids_are_monotonic_from_one() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(MockTileClient::ok(b"t"), &dir, 4);
        let source = cached_source(&dir);

        let bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
        let a = registry.create(bbox_spec(Arc::clone(&source), bbox, 1, 3)).unwrap();
        let b = registry.create(bbox_spec(source, bbox, 1, 3)).unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn test_small_bbox_estimate_is_exact() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(MockTileClient::ok(b"t"), &dir, 4);
        let source = cached_source(&dir);

        let bbox = BBox::new(0.0, 0.0, 20.0, 20.0);
        let job = registry.create(bbox_spec(source, bbox, 1, 4)).unwrap();

        let exact = bbox_tiles(bbox, 1, 4).count() as u64;
        assert_eq!(job.info().total_tiles, exact);
    }

    #[test]
    fn test_created_job_is_stopped_and_idle() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(MockTileClient::ok(b"t"), &dir, 4);
        let source = cached_source(&dir);

        let job = registry
            .create(bbox_spec(source, BBox::new(0.0, 0.0, 10.0, 10.0), 1, 3))
            .unwrap();

        let info = job.info();
        assert_eq!(info.state, "stopped");
        assert_eq!(info.kind, "none");
        assert_eq!(info.status, "Idle");
        assert_eq!(info.progress, 0.0);
    }

    #[test]
    fn test_feature_without_polygon_is_invalid_area() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(MockTileClient::ok(b"t"), &dir, 4);
        let source = cached_source(&dir);

        let feature: Feature = serde_json::from_value(serde_json::json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [0.0, 0.0] }
        }))
        .unwrap();

        let err = registry
            .create(JobSpec {
                source,
                options: JobOptions::default(),
                min_zoom: 1,
                max_zoom: 3,
                region: RegionSpec::Feature(feature),
            })
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidArea(_)));
    }

    #[test]
    fn test_zoom_order_is_validated() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(MockTileClient::ok(b"t"), &dir, 4);
        let source = cached_source(&dir);

        let err = registry
            .create(bbox_spec(source, BBox::new(0.0, 0.0, 10.0, 10.0), 8, 3))
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidParameters(_)));
    }

    #[test]
    fn test_remove_stopped_job() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(MockTileClient::ok(b"t"), &dir, 4);
        let source = cached_source(&dir);

        let job = registry
            .create(bbox_spec(source, BBox::new(0.0, 0.0, 10.0, 10.0), 1, 3))
            .unwrap();

        registry.remove(job.id).unwrap();
        assert!(registry.by_id(job.id).is_none());
        assert_eq!(registry.remove(job.id), Err(JobError::UnknownJob(job.id)));
    }

    #[test]
    fn test_remove_running_job_is_busy() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(MockTileClient::ok(b"t"), &dir, 4);
        let source = cached_source(&dir);

        let job = registry
            .create(bbox_spec(source, BBox::new(0.0, 0.0, 10.0, 10.0), 1, 3))
            .unwrap();
        job.begin_run(JobKind::Seed).unwrap();

        assert_eq!(registry.remove(job.id), Err(JobError::Busy(job.id)));
        job.finish(None);
        assert!(registry.remove(job.id).is_ok());
    }

    #[test]
    fn test_tile_region_estimate() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(MockTileClient::ok(b"t"), &dir, 4);
        let source = cached_source(&dir);

        let job = registry
            .create(JobSpec {
                source,
                options: JobOptions::default(),
                min_zoom: 1,
                max_zoom: 4,
                region: RegionSpec::Tile(Tile::new(2, 1, 1)),
            })
            .unwrap();

        // 1 + 4 + 16 tiles of the subtree
        assert_eq!(job.info().total_tiles, 21);
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(MockTileClient::ok(b"t"), &dir, 4);
        let source = cached_source(&dir);

        for _ in 0..3 {
            registry
                .create(bbox_spec(
                    Arc::clone(&source),
                    BBox::new(0.0, 0.0, 10.0, 10.0),
                    1,
                    2,
                ))
                .unwrap();
        }

        let ids: Vec<u64> = registry.list().iter().map(|info| info.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
