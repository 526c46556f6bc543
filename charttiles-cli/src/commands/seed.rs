//! `charttiles seed` - pre-populate the cache for a region.

use super::common::{build_service, parse_region, resolve_source, watch_job};
use crate::error::CliError;
use charttiles::jobs::{JobOptions, JobSpec};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct SeedArgs {
    /// Provider identifier from the config
    pub provider: String,

    /// Region bbox as minLon,minLat,maxLon,maxLat
    #[arg(long, conflicts_with = "region")]
    pub bbox: Option<String>,

    /// Path to a GeoJSON file with the region polygon
    #[arg(long)]
    pub region: Option<PathBuf>,

    /// Lowest zoom level to seed
    #[arg(long, default_value_t = 1)]
    pub min_zoom: u8,

    /// Highest zoom level to seed
    #[arg(long)]
    pub max_zoom: u8,

    /// Fetch tiles again even when already cached
    #[arg(long)]
    pub refetch: bool,

    /// Export the seeded region to a standalone MBTiles file
    #[arg(long)]
    pub mbtiles: bool,
}

pub async fn run(config_path: PathBuf, args: SeedArgs) -> Result<(), CliError> {
    let (_config, service) = build_service(&config_path)?;
    let source = resolve_source(&service, &args.provider)?;
    if !source.is_cached() {
        return Err(CliError::Arguments(format!(
            "provider '{}' is not an online-proxied source with a cache",
            args.provider
        )));
    }

    let region = parse_region(args.bbox.as_deref(), args.region.as_deref())?;
    let job = service
        .registry()
        .create(JobSpec {
            source,
            options: JobOptions {
                refetch: args.refetch,
                mbtiles: args.mbtiles,
                vacuum: false,
            },
            min_zoom: args.min_zoom,
            max_zoom: args.max_zoom,
            region,
        })
        .map_err(|e| CliError::Job(e.to_string()))?;

    println!(
        "Seeding '{}' over {} (zoom {}-{}), about {} tiles",
        args.provider,
        job.area_description,
        args.min_zoom,
        args.max_zoom,
        job.info().total_tiles
    );

    let run = tokio::spawn(Arc::clone(&job).seed_cache());
    watch_job(&job).await;
    run.await
        .map_err(|e| CliError::Job(format!("seed task failed: {}", e)))?;

    let info = job.info();
    println!(
        "Done: {} downloaded, {} already cached, {} failed",
        info.downloaded_tiles, info.cached_tiles, info.failed_tiles
    );
    Ok(())
}
