//! End-to-end lifecycle: configure, serve, seed, then delete a region.

use charttiles::api::{CacheRequest, ChartTileService, JobControlAction};
use charttiles::cache::CacheState;
use charttiles::config::ChartConfig;
use charttiles::provider::{ProviderError, TileHttpClient};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

/// Deterministic origin: every tile is its URL as bytes.
struct EchoOrigin;

impl TileHttpClient for EchoOrigin {
    async fn get_with_headers(
        &self,
        url: &str,
        _headers: &[(String, String)],
    ) -> Result<Vec<u8>, ProviderError> {
        Ok(url.as_bytes().to_vec())
    }
}

fn test_config(dir: &TempDir) -> ChartConfig {
    let raw = json!({
        "cachePath": dir.path().to_str().unwrap(),
        "sources": [
            {
                "identifier": "noaa",
                "name": "NOAA RNC",
                "kind": "online-proxied",
                "format": "png",
                "minZoom": 1,
                "maxZoom": 16,
                "url": "http://charts.example/{z}/{x}/{y}.png"
            }
        ]
    });
    serde_json::from_value(raw).unwrap()
}

fn build_service(dir: &TempDir) -> ChartTileService<EchoOrigin> {
    let config = test_config(dir);
    let service = ChartTileService::with_state(
        EchoOrigin,
        config.cache_path.clone(),
        Arc::new(CacheState::with_probe(Box::new(|_| Ok(u64::MAX)))),
    );
    for source in config.build_sources().unwrap() {
        service.register_source(source);
    }
    service
}

async fn wait_for_stop(service: &ChartTileService<EchoOrigin>, job_id: u64) {
    for _ in 0..500 {
        if service.job_info(job_id).unwrap().state == "stopped" {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("job {} did not stop", job_id);
}

#[tokio::test]
async fn serve_seed_delete_roundtrip() {
    let dir = TempDir::new().unwrap();
    let service = build_service(&dir);

    // Serve a single tile through the proxy: miss then hit
    let first = service.get_tile("noaa", 6, 33, 21).await.unwrap();
    assert_eq!(first.bytes, b"http://charts.example/6/33/21.png".to_vec());
    let second = service.get_tile("noaa", 6, 33, 21).await.unwrap();
    assert_eq!(second.bytes, first.bytes);

    let stats = service.statistics()["noaa"];
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);

    // Seed a small bbox
    let request: CacheRequest = serde_json::from_value(json!({
        "bbox": [0.0, 0.0, 15.0, 15.0],
        "minZoom": 2,
        "maxZoom": 5,
        "action": "seed",
        "options": {}
    }))
    .unwrap();
    let created = service.create_cache_job("noaa", request).unwrap();
    wait_for_stop(&service, created.id).await;

    let seeded = service.job_info(created.id).unwrap();
    assert_eq!(seeded.status, "Completed");
    assert_eq!(seeded.failed_tiles, 0);
    assert!(seeded.downloaded_tiles > 0);
    assert!(
        seeded.downloaded_tiles + seeded.cached_tiles + seeded.failed_tiles
            >= seeded.total_tiles
    );

    // Delete the same region with vacuum
    let request: CacheRequest = serde_json::from_value(json!({
        "bbox": [0.0, 0.0, 15.0, 15.0],
        "minZoom": 2,
        "maxZoom": 5,
        "action": "delete",
        "options": { "vacuum": true }
    }))
    .unwrap();
    let deleted = service.create_cache_job("noaa", request).unwrap();
    wait_for_stop(&service, deleted.id).await;

    let done = service.job_info(deleted.id).unwrap();
    assert_eq!(done.status, "Completed");
    assert!(done.deleted_tiles >= seeded.downloaded_tiles);

    // Both jobs remain listed until removed
    assert_eq!(service.list_jobs().len(), 2);
    service
        .control_job(created.id, JobControlAction::Remove)
        .unwrap();
    service
        .control_job(deleted.id, JobControlAction::Remove)
        .unwrap();
    assert!(service.list_jobs().is_empty());

    // The deleted region misses the cache again (remote re-fetch works)
    let again = service.get_tile("noaa", 4, 8, 7).await.unwrap();
    assert_eq!(again.bytes, b"http://charts.example/4/8/7.png".to_vec());
}
