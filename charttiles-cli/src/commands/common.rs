//! Shared setup for CLI commands.

use crate::error::CliError;
use charttiles::api::ChartTileService;
use charttiles::config::ChartConfig;
use charttiles::coord::BBox;
use charttiles::jobs::{CacheJob, JobState, RegionSpec};
use charttiles::provider::{ChartSource, ReqwestTileClient};
use charttiles::region::features_from_json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Loads the config and builds a service with every source registered.
pub fn build_service(
    config_path: &Path,
) -> Result<(ChartConfig, ChartTileService<ReqwestTileClient>), CliError> {
    let config = ChartConfig::load(config_path).map_err(|e| CliError::Config(e.to_string()))?;

    let client = ReqwestTileClient::new().map_err(|e| CliError::Config(e.to_string()))?;
    let service = ChartTileService::new(client, config.cache_path.clone());
    for source in config
        .build_sources()
        .map_err(|e| CliError::Config(e.to_string()))?
    {
        service.register_source(source);
    }
    Ok((config, service))
}

/// Resolves a provider id, with a helpful message when unknown.
pub fn resolve_source(
    service: &ChartTileService<ReqwestTileClient>,
    identifier: &str,
) -> Result<Arc<ChartSource>, CliError> {
    service.source(identifier).ok_or_else(|| {
        CliError::Arguments(format!("unknown provider '{}' (check the config)", identifier))
    })
}

/// Parses `minLon,minLat,maxLon,maxLat`.
pub fn parse_bbox(raw: &str) -> Result<BBox, CliError> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| CliError::Arguments(format!("bad bbox '{}': {}", raw, e)))?;
    if parts.len() != 4 {
        return Err(CliError::Arguments(format!(
            "bbox '{}' must have four comma-separated numbers",
            raw
        )));
    }
    Ok(BBox::new(parts[0], parts[1], parts[2], parts[3]))
}

/// Builds the region from `--bbox` / `--region` options.
pub fn parse_region(
    bbox: Option<&str>,
    region_file: Option<&Path>,
) -> Result<RegionSpec, CliError> {
    if let Some(raw) = bbox {
        return Ok(RegionSpec::Bbox(parse_bbox(raw)?));
    }
    if let Some(path) = region_file {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CliError::Arguments(format!("cannot read {}: {}", path.display(), e)))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| CliError::Arguments(format!("bad GeoJSON in {}: {}", path.display(), e)))?;
        let feature = features_from_json(&value)
            .into_iter()
            .next()
            .ok_or_else(|| {
                CliError::Arguments(format!("{} contains no usable feature", path.display()))
            })?;
        return Ok(RegionSpec::Feature(feature));
    }
    Err(CliError::Arguments(
        "one of --bbox or --region is required".to_string(),
    ))
}

/// Prints live progress until the job stops.
pub async fn watch_job(job: &Arc<CacheJob<ReqwestTileClient>>) {
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let info = job.info();
        println!(
            "{}: {:.1}% ({} downloaded, {} cached, {} failed, {} deleted of {})",
            info.status,
            info.progress * 100.0,
            info.downloaded_tiles,
            info.cached_tiles,
            info.failed_tiles,
            info.deleted_tiles,
            info.total_tiles,
        );
        if job.state() == JobState::Stopped {
            break;
        }
    }
}
