//! Chart sources and remote tile fetching.

mod fetch;
mod http;
mod template;
mod types;

pub use fetch::TileFetcher;
pub use http::{ProviderError, ReqwestTileClient, TileHttpClient, DEFAULT_FETCH_TIMEOUT_SECS};
pub use template::render_tile_url;
pub use types::{ChartSource, SourceKind, TileFormat};

#[cfg(test)]
pub use http::tests::MockTileClient;
