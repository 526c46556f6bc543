//! Configuration ingestion.
//!
//! The host navigation server hands the core a JSON document naming the
//! cache root and the configured chart sources. Building the source set
//! opens one cache MBTiles per proxied source under the cache root.

use crate::provider::{ChartSource, SourceKind, TileFormat};
use crate::store::{MbtilesStore, StoreError, StoreMetadata};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    /// Directory holding cache MBTiles files and exports.
    pub cache_path: PathBuf,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// One configured chart source.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: SourceKind,
    #[serde(default)]
    pub format: Option<TileFormat>,
    #[serde(default)]
    pub min_zoom: Option<u8>,
    #[serde(default)]
    pub max_zoom: Option<u8>,
    /// URL template for online sources.
    #[serde(default)]
    pub url: Option<String>,
    /// Headers as `"Name: Value"` strings.
    #[serde(default)]
    pub headers: Vec<String>,
}

impl ChartConfig {
    /// Loads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Builds the chart sources, opening a cache store for each proxied
    /// one at `<cachePath>/<identifier>.mbtiles`.
    pub fn build_sources(&self) -> Result<Vec<Arc<ChartSource>>, ConfigError> {
        let mut sources = Vec::with_capacity(self.sources.len());
        for cfg in &self.sources {
            let name = cfg.name.clone().unwrap_or_else(|| cfg.identifier.clone());
            let format = cfg.format.unwrap_or(TileFormat::Png);
            let min_zoom = cfg.min_zoom.unwrap_or(1);
            let max_zoom = cfg.max_zoom.unwrap_or(24);

            let store = if cfg.kind == SourceKind::OnlineProxied {
                let meta =
                    StoreMetadata::new(name.clone(), format.extension(), min_zoom, max_zoom);
                let path = self.cache_path.join(format!("{}.mbtiles", cfg.identifier));
                Some(Arc::new(MbtilesStore::open(path, &meta)?))
            } else {
                None
            };

            sources.push(Arc::new(ChartSource {
                identifier: cfg.identifier.clone(),
                name,
                kind: cfg.kind,
                format,
                min_zoom,
                max_zoom,
                url_template: cfg.url.clone(),
                headers: parse_headers(&cfg.identifier, &cfg.headers),
                store,
            }));
        }
        Ok(sources)
    }
}

/// Parses `"Name: Value"` header strings, skipping malformed entries.
fn parse_headers(identifier: &str, raw: &[String]) -> Vec<(String, String)> {
    raw.iter()
        .filter_map(|line| match line.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                Some((name.trim().to_string(), value.trim().to_string()))
            }
            _ => {
                warn!(provider = identifier, header = line, "ignoring malformed header");
                None
            }
        })
        .collect()
}
