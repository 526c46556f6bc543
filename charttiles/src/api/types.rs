//! Request/response types and the error taxonomy exposed to the
//! routing layer.

use crate::jobs::{JobError, JobOptions};
use crate::region::Feature;
use crate::store::StoreError;
use serde::Deserialize;
use thiserror::Error;

/// Cache-Control served with every tile (90 days).
pub const TILE_CACHE_CONTROL: &str = "public, max-age=7776000";

/// Structured errors the routing layer maps onto HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown chart provider '{0}'")]
    UnknownProvider(String),
    #[error("tile not available")]
    TileAbsent,
    #[error("remote tile fetch failed")]
    RemoteFetchFailure,
    #[error("invalid area: {0}")]
    InvalidArea(String),
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("unknown job {0}")]
    UnknownJob(u64),
    #[error("job {0} is running")]
    JobBusy(u64),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// The HTTP status code this error surfaces as.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownProvider(_) | Self::TileAbsent | Self::UnknownJob(_) => 404,
            Self::InvalidArea(_) | Self::InvalidParameters(_) => 400,
            Self::JobBusy(_) => 409,
            Self::RemoteFetchFailure => 502,
            Self::Store(_) => 500,
        }
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::InvalidArea(msg) => Self::InvalidArea(msg),
            JobError::InvalidParameters(msg) => Self::InvalidParameters(msg),
            JobError::Busy(id) => Self::JobBusy(id),
            JobError::UnknownJob(id) => Self::UnknownJob(id),
        }
    }
}

/// A tile ready to serve, with its response headers.
#[derive(Debug, Clone)]
pub struct ServedTile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub cache_control: &'static str,
}

/// What a cache request does to the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheAction {
    Seed,
    Delete,
}

/// Body of `POST /chart-tiles/cache/{id}`.
///
/// Exactly one of `feature` and `bbox` describes the region; `maxZoom`
/// is required and validated against [1, 24].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRequest {
    #[serde(default)]
    pub feature: Option<Feature>,
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub min_zoom: Option<u8>,
    #[serde(default)]
    pub max_zoom: Option<u8>,
    pub action: CacheAction,
    #[serde(default)]
    pub options: JobOptions,
}

/// Body of `POST /chart-tiles/cache/jobs/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobControlAction {
    Start,
    Stop,
    Delete,
    Remove,
}
