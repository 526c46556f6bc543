//! `charttiles delete` - remove cached tiles within a region.

use super::common::{build_service, parse_region, resolve_source, watch_job};
use crate::error::CliError;
use charttiles::jobs::{JobOptions, JobSpec};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Provider identifier from the config
    pub provider: String,

    /// Region bbox as minLon,minLat,maxLon,maxLat
    #[arg(long, conflicts_with = "region")]
    pub bbox: Option<String>,

    /// Path to a GeoJSON file with the region polygon
    #[arg(long)]
    pub region: Option<PathBuf>,

    /// Lowest zoom level to delete
    #[arg(long, default_value_t = 1)]
    pub min_zoom: u8,

    /// Highest zoom level to delete
    #[arg(long)]
    pub max_zoom: u8,

    /// Vacuum the store afterwards to reclaim disk space
    #[arg(long)]
    pub vacuum: bool,
}

pub async fn run(config_path: PathBuf, args: DeleteArgs) -> Result<(), CliError> {
    let (_config, service) = build_service(&config_path)?;
    let source = resolve_source(&service, &args.provider)?;
    if source.cache_store().is_none() {
        return Err(CliError::Arguments(format!(
            "provider '{}' has no cache to delete from",
            args.provider
        )));
    }

    let region = parse_region(args.bbox.as_deref(), args.region.as_deref())?;
    let job = service
        .registry()
        .create(JobSpec {
            source,
            options: JobOptions {
                refetch: false,
                mbtiles: false,
                vacuum: args.vacuum,
            },
            min_zoom: args.min_zoom,
            max_zoom: args.max_zoom,
            region,
        })
        .map_err(|e| CliError::Job(e.to_string()))?;

    println!(
        "Deleting cached tiles of '{}' over {} (zoom {}-{})",
        args.provider, job.area_description, args.min_zoom, args.max_zoom
    );

    let run = tokio::spawn(Arc::clone(&job).delete_cache());
    watch_job(&job).await;
    run.await
        .map_err(|e| CliError::Job(format!("delete task failed: {}", e)))?;

    println!("Done: {} tile rows deleted", job.info().deleted_tiles);
    Ok(())
}
