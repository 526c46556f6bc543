//! charttiles - chart tile caching and seeding for marine navigation
//! servers.
//!
//! The core of a chart tile provider: a lookup-or-fetch cache over
//! MBTiles for proxied online sources, a job engine that seeds or
//! deletes user-selected regions with a bounded worker pool, and the
//! Web-Mercator geometry that turns regions into tile sets.
//!
//! # High-Level API
//!
//! The routing layer of the host server talks to the core through the
//! [`api::ChartTileService`] facade:
//!
//! ```ignore
//! use charttiles::api::ChartTileService;
//! use charttiles::config::ChartConfig;
//! use charttiles::provider::ReqwestTileClient;
//!
//! let config = ChartConfig::load("charttiles.json")?;
//! let service = ChartTileService::new(ReqwestTileClient::new()?, config.cache_path.clone());
//! for source in config.build_sources()? {
//!     service.register_source(source);
//! }
//!
//! let tile = service.get_tile("osm", 3, 2, 5).await?;
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod coord;
pub mod jobs;
pub mod logging;
pub mod provider;
pub mod region;
pub mod store;

/// Version of the charttiles library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
