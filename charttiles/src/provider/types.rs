//! Chart source descriptors consumed by the cache and job engine.

use crate::store::MbtilesStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How a configured chart source delivers its tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// A local MBTiles file discovered on disk.
    MbtilesFile,
    /// A local directory of pre-rendered tiles.
    TileDirectory,
    /// A remote origin fetched on demand and cached locally.
    OnlineProxied,
    /// A remote origin proxied without caching.
    OnlinePassthrough,
    /// A Mapbox-style JSON style document; carries no raster tiles.
    StyleJson,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MbtilesFile => "mbtiles-file",
            Self::TileDirectory => "tile-directory",
            Self::OnlineProxied => "online-proxied",
            Self::OnlinePassthrough => "online-passthrough",
            Self::StyleJson => "style-json",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tile media format of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileFormat {
    Png,
    Jpg,
    Pbf,
}

impl TileFormat {
    /// File extension used in URLs and MBTiles metadata.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Pbf => "pbf",
        }
    }

    /// HTTP Content-Type served to plotters.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
            Self::Pbf => "application/x-protobuf",
        }
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// A configured chart source.
///
/// Discovery (file scanning, metadata parsing) happens outside the core;
/// this is the descriptor handed in, including the opened cache store for
/// proxied sources.
#[derive(Debug, Clone)]
pub struct ChartSource {
    /// Stable identifier used in URLs and statistics.
    pub identifier: String,
    /// Human-readable name.
    pub name: String,
    pub kind: SourceKind,
    pub format: TileFormat,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// URL template with `{z}`, `{z-2}`, `{x}`, `{y}`, `{-y}` placeholders
    /// (online sources only).
    pub url_template: Option<String>,
    /// Extra headers sent upstream.
    pub headers: Vec<(String, String)>,
    /// Cache store; present for proxied sources and locally discovered
    /// MBTiles charts.
    pub store: Option<Arc<MbtilesStore>>,
}

impl ChartSource {
    /// A source participates in caching iff it is proxied and has a store.
    pub fn is_cached(&self) -> bool {
        self.kind == SourceKind::OnlineProxied && self.store.is_some()
    }

    /// True for sources fetched from a remote origin.
    pub fn is_online(&self) -> bool {
        matches!(
            self.kind,
            SourceKind::OnlineProxied | SourceKind::OnlinePassthrough
        )
    }

    /// The store tiles are cached into, when caching applies.
    pub fn cache_store(&self) -> Option<&Arc<MbtilesStore>> {
        if self.is_cached() {
            self.store.as_ref()
        } else {
            None
        }
    }
}
