//! `charttiles stats` - show per-source cache contents.

use super::common::build_service;
use crate::error::CliError;
use std::path::PathBuf;

pub fn run(config_path: PathBuf) -> Result<(), CliError> {
    let (config, service) = build_service(&config_path)?;
    println!("Cache root: {}", config.cache_path.display());
    println!();

    for cfg in &config.sources {
        let Some(source) = service.source(&cfg.identifier) else {
            continue;
        };
        println!("{} ({})", source.identifier, source.kind);

        match source.store.as_ref() {
            Some(store) => {
                let tiles = store.tile_count().map_err(|e| CliError::Job(e.to_string()))?;
                let images = store
                    .image_count()
                    .map_err(|e| CliError::Job(e.to_string()))?;
                let size = std::fs::metadata(store.path()).map(|m| m.len()).unwrap_or(0);
                println!("  Store:  {}", store.path().display());
                println!("  Tiles:  {}", tiles);
                println!("  Images: {}", images);
                println!("  Size:   {:.2} MB", size as f64 / (1024.0 * 1024.0));
            }
            None => println!("  (no local cache)"),
        }
        println!();
    }
    Ok(())
}
