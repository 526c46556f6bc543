//! Remote tile fetcher.
//!
//! Builds the tile URL from the source's template and performs the GET
//! with its headers. Every failure mode (non-success status, timeout,
//! network error, empty body) collapses to `None`; fetch failures are
//! counted by the caller, never propagated as errors.

use super::http::TileHttpClient;
use super::template::render_tile_url;
use super::types::ChartSource;
use crate::coord::Tile;
use tracing::{debug, warn};

/// Fetches tiles from remote origins. Does not cache.
pub struct TileFetcher<C> {
    client: C,
}

impl<C: TileHttpClient> TileFetcher<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Fetches one tile, returning `None` on any failure.
    pub async fn fetch(&self, source: &ChartSource, tile: &Tile) -> Option<Vec<u8>> {
        let Some(template) = source.url_template.as_deref() else {
            warn!(
                source = %source.identifier,
                "online source has no URL template"
            );
            return None;
        };

        let url = render_tile_url(template, tile);
        match self.client.get_with_headers(&url, &source.headers).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!(source = %source.identifier, tile = %tile, error = %e, "tile fetch failed");
                None
            }
        }
    }
}
